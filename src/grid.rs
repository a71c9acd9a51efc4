use std::{fmt, ops};

use ndarray::{Array, Array2};

use crate::coord::{BOARD_SIZE, Point};
use crate::piece::PieceOnBoard;


#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GridItem<T> {
    Piece(T),
    Empty,
    OutOfBounds,
}

// Cells are indexed as `[x, y]`. Indexing outside of the board is a contract violation
// and panics; use `get` for checked access.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    data: Array2<Option<PieceOnBoard>>,
}

impl Grid {
    pub fn new() -> Self {
        Grid {
            data: Array::from_elem((BOARD_SIZE as usize, BOARD_SIZE as usize), None),
        }
    }

    pub fn get(&self, pos: Point) -> GridItem<&PieceOnBoard> {
        let Some(index) = point_to_index(pos) else {
            return GridItem::OutOfBounds;
        };
        match &self.data[index] {
            None => GridItem::Empty,
            Some(piece) => GridItem::Piece(piece),
        }
    }

    pub fn clear(&mut self) { self.data.fill(None); }

    pub fn pieces(&self) -> impl Iterator<Item = (Point, &PieceOnBoard)> {
        Point::all().filter_map(|pos| self[pos].as_ref().map(|piece| (pos, piece)))
    }
}

impl ops::Index<Point> for Grid {
    type Output = Option<PieceOnBoard>;
    #[track_caller]
    fn index(&self, pos: Point) -> &Self::Output {
        let index = point_to_index(pos).unwrap_or_else(|| panic!("{}", out_of_bound_message(pos)));
        &self.data[index]
    }
}

impl ops::IndexMut<Point> for Grid {
    #[track_caller]
    fn index_mut(&mut self, pos: Point) -> &mut Self::Output {
        let index = point_to_index(pos).unwrap_or_else(|| panic!("{}", out_of_bound_message(pos)));
        &mut self.data[index]
    }
}

fn point_to_index(pos: Point) -> Option<[usize; 2]> {
    pos.is_in_board().then(|| [pos.x as usize, pos.y as usize])
}

fn out_of_bound_message(pos: Point) -> String {
    format!(
        "Point ({}, {}) is out of bound for {BOARD_SIZE}x{BOARD_SIZE} board",
        pos.x, pos.y
    )
}

fn debug_format_piece(piece: &PieceOnBoard) -> String {
    let mut s = format!("[{}]-{:?}-{:?}", piece.id.0, piece.force, piece.kind);
    if piece.has_moved {
        s.push_str("-moved");
    }
    s
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Grid ")?;
        f.debug_map()
            .entries(self.pieces().map(|(pos, piece)| (pos.to_algebraic(), debug_format_piece(piece))))
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::force::Force;
    use crate::piece::{PieceId, PieceKind};

    #[test]
    fn checked_and_unchecked_access() {
        let mut piece_id = PieceId::new();
        let mut g = Grid::new();
        let queen = PieceOnBoard::new(piece_id.inc(), PieceKind::Queen, Force::White);
        g[Point::from_algebraic("d1")] = Some(queen);
        assert_eq!(g.get(Point::from_algebraic("d1")), GridItem::Piece(&queen));
        assert_eq!(g.get(Point::from_algebraic("d2")), GridItem::Empty);
        assert_eq!(g.get(Point::new(8, 0)), GridItem::OutOfBounds);
        assert_eq!(g.get(Point::new(-1, 3)), GridItem::OutOfBounds);
        assert_eq!(g.pieces().count(), 1);
        g.clear();
        assert_eq!(g.pieces().count(), 0);
    }

    #[test]
    #[should_panic(expected = "out of bound")]
    fn out_of_bound_index_panics() {
        let g = Grid::new();
        let _ = &g[Point::new(3, 8)];
    }
}
