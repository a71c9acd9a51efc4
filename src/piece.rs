use derive_new::new;
use enum_map::Enum;
use strum::{Display, EnumIter, EnumString, FromRepr};

use crate::direction::{ALL_ROUND, DIAGONAL, Direction, KNIGHT_JUMPS, STRAIGHT};
use crate::force::Force;


// The discriminant doubles as the piece index in `PROMOTION` messages.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, Enum, EnumIter, FromRepr, Display, EnumString,
)]
#[repr(u8)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PieceId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug, new)]
pub struct PieceOnBoard {
    pub id: PieceId,
    pub kind: PieceKind,
    pub force: Force,
    #[new(value = "false")]
    pub has_moved: bool,
}

pub const PROMOTION_TARGETS: [PieceKind; 4] =
    [PieceKind::Queen, PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight];

const MAX_SLIDE: i8 = 7;

impl PieceId {
    pub fn new() -> Self { PieceId(0) }
    pub fn inc(&mut self) -> Self {
        let id = *self;
        self.0 += 1;
        id
    }
}

impl PieceKind {
    pub fn to_wire(self) -> u8 { self as u8 }
    pub fn from_wire(index: u8) -> Option<Self> { Self::from_repr(index) }

    pub fn is_promotion_target(self) -> bool { PROMOTION_TARGETS.contains(&self) }

    // Pieces that can pin: only they may stand on a line behind another piece.
    pub fn is_slider(self) -> bool {
        matches!(self, PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen)
    }

    pub fn can_castle(self) -> bool { matches!(self, PieceKind::King | PieceKind::Rook) }
    pub fn can_promote(self) -> bool { self == PieceKind::Pawn }
    pub fn has_special_first_move(self) -> bool {
        matches!(self, PieceKind::Pawn | PieceKind::King)
    }

    pub fn directions(self, force: Force) -> &'static [Direction] {
        use Direction::*;
        match (self, force) {
            (PieceKind::Pawn, Force::White) => &[North, NorthEast, NorthWest],
            (PieceKind::Pawn, Force::Black) => &[South, SouthEast, SouthWest],
            (PieceKind::Knight, _) => &KNIGHT_JUMPS,
            (PieceKind::Bishop, _) => &DIAGONAL,
            (PieceKind::Rook, _) => &STRAIGHT,
            (PieceKind::Queen, _) | (PieceKind::King, _) => &ALL_ROUND,
        }
    }

    // Longest regular step along any of `directions`. First moves, castling and the pawn's
    // diagonal restriction are handled separately.
    pub fn max_distance(self) -> i8 {
        match self {
            PieceKind::Pawn | PieceKind::Knight | PieceKind::King => 1,
            PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => MAX_SLIDE,
        }
    }

    pub fn from_algebraic_char(notation: char) -> Option<Self> {
        match notation.to_ascii_uppercase() {
            'P' => Some(PieceKind::Pawn),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }
}

impl PieceOnBoard {
    pub fn directions(&self) -> &'static [Direction] { self.kind.directions(self.force) }

    // A pawn that has not moved yet may step two squares.
    pub fn max_distance(&self) -> i8 {
        match self.kind {
            PieceKind::Pawn if self.has_special_first_move() => 2,
            kind => kind.max_distance(),
        }
    }

    pub fn has_special_first_move(&self) -> bool {
        self.kind.has_special_first_move() && !self.has_moved
    }

    pub fn can_castle(&self) -> bool { self.kind.can_castle() && !self.has_moved }
}

pub fn piece_to_pictogram(piece_kind: PieceKind, force: Force) -> char {
    use self::Force::*;
    use self::PieceKind::*;
    match (force, piece_kind) {
        (White, Pawn) => '♙',
        (White, Knight) => '♘',
        (White, Bishop) => '♗',
        (White, Rook) => '♖',
        (White, Queen) => '♕',
        (White, King) => '♔',
        (Black, Pawn) => '♟',
        (Black, Knight) => '♞',
        (Black, Bishop) => '♝',
        (Black, Rook) => '♜',
        (Black, Queen) => '♛',
        (Black, King) => '♚',
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_move_flags_expire_after_moving() {
        let mut piece_id = PieceId::new();
        let mut pawn = PieceOnBoard::new(piece_id.inc(), PieceKind::Pawn, Force::White);
        let mut rook = PieceOnBoard::new(piece_id.inc(), PieceKind::Rook, Force::Black);
        let queen = PieceOnBoard::new(piece_id.inc(), PieceKind::Queen, Force::White);
        assert_eq!(pawn.max_distance(), 2);
        assert!(!pawn.can_castle());
        assert!(rook.can_castle());
        assert!(!queen.can_castle());
        assert!(!queen.has_special_first_move());
        pawn.has_moved = true;
        rook.has_moved = true;
        assert_eq!(pawn.max_distance(), 1);
        assert!(!rook.can_castle());
    }
}
