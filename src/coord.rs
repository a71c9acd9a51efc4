use std::fmt;
use std::ops;

use itertools::Itertools;

use crate::direction::Direction;
use crate::force::Force;


pub const BOARD_SIZE: i8 = 8;


// A board cell. `x` is the file (0 = a), `y` is the rank (0 = white's first rank).
// Coordinates outside of the board are representable on purpose: rays are walked
// until they leave the board.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i8,
    pub y: i8,
}

impl Point {
    pub const fn new(x: i8, y: i8) -> Self { Self { x, y } }

    // Parses "e2"-style notation. Panics on malformed input: meant for tests and tooling.
    #[track_caller]
    pub fn from_algebraic(s: &str) -> Self {
        Self::try_from_algebraic(s).unwrap_or_else(|| panic!("Invalid square: {s:?}"))
    }

    pub fn try_from_algebraic(s: &str) -> Option<Self> {
        let (file, rank) = s.chars().collect_tuple()?;
        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return None;
        }
        Some(Point::new((file as u8 - b'a') as i8, (rank as u8 - b'1') as i8))
    }

    pub fn to_algebraic(self) -> String {
        assert!(self.is_in_board(), "{self:?} has no algebraic name");
        format!("{}{}", (b'a' + self.x as u8) as char, (b'1' + self.y as u8) as char)
    }

    pub fn is_in_board(self) -> bool {
        (0..BOARD_SIZE).contains(&self.x) && (0..BOARD_SIZE).contains(&self.y)
    }

    pub fn with_added(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Point::new(self.x + dx, self.y + dy)
    }

    // Whether the square is dark (a1 is dark). Used to compare bishops.
    pub fn is_dark(self) -> bool { (self.x + self.y) % 2 == 0 }

    // The farthest rank from `force`'s point of view.
    pub fn is_last_rank_for(self, force: Force) -> bool {
        match force {
            Force::White => self.y == BOARD_SIZE - 1,
            Force::Black => self.y == 0,
        }
    }

    pub fn all() -> impl Iterator<Item = Point> {
        (0..BOARD_SIZE).cartesian_product(0..BOARD_SIZE).map(|(x, y)| Point::new(x, y))
    }
}

impl ops::Sub for Point {
    type Output = (i8, i8);
    fn sub(self, other: Self) -> Self::Output { (self.x - other.x, self.y - other.y) }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_in_board() {
            write!(f, "Point({})", self.to_algebraic())
        } else {
            write!(f, "Point({}, {})", self.x, self.y)
        }
    }
}
