use strum::{EnumIter, IntoEnumIterator};

use crate::coord::Point;
use crate::internal_error;


// Unit step vectors: four straight, four diagonal and eight knight jumps.
// "No direction" is represented as `None` by the functions below.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter)]
pub enum Direction {
    North,
    East,
    South,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
    EastNorthEast,
    NorthNorthEast,
    EastSouthEast,
    SouthSouthEast,
    WestSouthWest,
    SouthSouthWest,
    WestNorthWest,
    NorthNorthWest,
}

pub const STRAIGHT: [Direction; 4] =
    [Direction::North, Direction::East, Direction::South, Direction::West];

pub const DIAGONAL: [Direction; 4] =
    [Direction::NorthEast, Direction::SouthEast, Direction::SouthWest, Direction::NorthWest];

pub const ALL_ROUND: [Direction; 8] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
    Direction::NorthEast,
    Direction::SouthEast,
    Direction::SouthWest,
    Direction::NorthWest,
];

pub const KNIGHT_JUMPS: [Direction; 8] = [
    Direction::EastNorthEast,
    Direction::NorthNorthEast,
    Direction::EastSouthEast,
    Direction::SouthSouthEast,
    Direction::WestSouthWest,
    Direction::SouthSouthWest,
    Direction::WestNorthWest,
    Direction::NorthNorthWest,
];

impl Direction {
    pub const fn offset(self) -> (i8, i8) {
        use Direction::*;
        match self {
            North => (0, 1),
            East => (1, 0),
            South => (0, -1),
            West => (-1, 0),
            NorthEast => (1, 1),
            SouthEast => (1, -1),
            SouthWest => (-1, -1),
            NorthWest => (-1, 1),
            EastNorthEast => (2, 1),
            NorthNorthEast => (1, 2),
            EastSouthEast => (2, -1),
            SouthSouthEast => (1, -2),
            WestSouthWest => (-2, -1),
            SouthSouthWest => (-1, -2),
            WestNorthWest => (-2, 1),
            NorthNorthWest => (-1, 2),
        }
    }

    pub fn from_offset(offset: (i8, i8)) -> Option<Self> {
        Direction::iter().find(|dir| dir.offset() == offset)
    }

    // Unit direction from `from` toward `to`, provided the displacement is a non-zero
    // integer multiple of one of the sixteen vectors.
    pub fn offset_of(from: Point, to: Point) -> Option<Self> {
        let (dx, dy) = to - from;
        let length = gcd(dx, dy);
        if length == 0 {
            return None;
        }
        Self::from_offset((dx / length, dy / length))
    }

    // How many unit steps separate `from` and `to`; 0 when there is no direction.
    pub fn move_distance(from: Point, to: Point) -> i8 {
        if Self::offset_of(from, to).is_none() {
            return 0;
        }
        let (dx, dy) = to - from;
        gcd(dx, dy)
    }

    pub fn is_diagonal(self) -> bool {
        let (dx, dy) = self.offset();
        dx.abs() == dy.abs()
    }

    pub fn is_straight(self) -> bool {
        let (dx, dy) = self.offset();
        dx == 0 || dy == 0
    }

    pub fn is_knight_jump(self) -> bool { !self.is_straight() && !self.is_diagonal() }

    pub fn opposite(self) -> Self {
        let (dx, dy) = self.offset();
        Self::from_offset((-dx, -dy))
            .unwrap_or_else(|| internal_error!("{self:?} has no opposite"))
    }
}

// Non-negative greatest common divisor; gcd(0, 0) == 0.
pub fn gcd(a: i8, b: i8) -> i8 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}


#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i8, y: i8) -> Point { Point::new(x, y) }

    #[test]
    fn offset_of_multiples() {
        assert_eq!(Direction::offset_of(p(0, 0), p(0, 7)), Some(Direction::North));
        assert_eq!(Direction::offset_of(p(7, 7), p(2, 2)), Some(Direction::SouthWest));
        assert_eq!(Direction::offset_of(p(1, 1), p(5, 3)), Some(Direction::EastNorthEast));
        assert_eq!(Direction::move_distance(p(1, 1), p(5, 3)), 2);
        assert_eq!(Direction::offset_of(p(0, 0), p(3, 1)), None);
        assert_eq!(Direction::offset_of(p(4, 4), p(4, 4)), None);
        assert_eq!(Direction::move_distance(p(4, 4), p(4, 4)), 0);
    }

    #[test]
    fn distance_is_zero_iff_no_direction() {
        for from in Point::all() {
            for to in Point::all() {
                if from == to {
                    continue;
                }
                let dir = Direction::offset_of(from, to);
                assert_eq!(Direction::move_distance(from, to) == 0, dir.is_none(), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn opposite_is_involution() {
        for dir in Direction::iter() {
            assert_ne!(dir.opposite(), dir);
            assert_eq!(dir.opposite().opposite(), dir);
        }
        assert_eq!(Direction::EastNorthEast.opposite(), Direction::WestSouthWest);
    }

    #[test]
    fn classification() {
        assert_eq!(Direction::iter().filter(|d| d.is_straight()).count(), 4);
        assert_eq!(Direction::iter().filter(|d| d.is_diagonal()).count(), 4);
        assert_eq!(Direction::iter().filter(|d| d.is_knight_jump()).count(), 8);
    }
}
