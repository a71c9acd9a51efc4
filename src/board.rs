use std::collections::HashSet;

use enum_map::{EnumMap, enum_map};
use strum::IntoEnumIterator;

use crate::coord::{BOARD_SIZE, Point};
use crate::force::Force;
use crate::grid::{Grid, GridItem};
use crate::{internal_error, internal_error_message};
use crate::piece::{PieceId, PieceKind, PieceOnBoard};


const BACK_RANK: [PieceKind; BOARD_SIZE as usize] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

fn home_rank(force: Force) -> i8 {
    match force {
        Force::White => 0,
        Force::Black => BOARD_SIZE - 1,
    }
}

fn pawn_rank(force: Force) -> i8 { home_rank(force) + force.forward() }


// Position only: where the pieces are plus the bits of history the rules need
// (last move, castling wiring, promotable pawns, current checks). Knows nothing
// about turn order.
#[derive(Clone, Debug)]
pub struct Board {
    grid: Grid,
    next_piece_id: PieceId,
    kings: EnumMap<Force, Option<Point>>,
    castling_rooks: EnumMap<Force, Vec<PieceId>>,
    checks: EnumMap<Force, Vec<Point>>,
    last_move: Option<(Point, Point)>,
    promotable: HashSet<PieceId>,
}

impl Board {
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.reset();
        board
    }

    pub fn empty() -> Self {
        Board {
            grid: Grid::new(),
            next_piece_id: PieceId::new(),
            kings: enum_map! { _ => None },
            castling_rooks: enum_map! { _ => Vec::new() },
            checks: enum_map! { _ => Vec::new() },
            last_move: None,
            promotable: HashSet::new(),
        }
    }

    pub fn clear(&mut self) {
        self.grid.clear();
        self.kings = enum_map! { _ => None };
        self.castling_rooks = enum_map! { _ => Vec::new() };
        self.checks = enum_map! { _ => Vec::new() };
        self.last_move = None;
        self.promotable.clear();
    }

    // Standard opening position with both rook pairs wired for castling.
    pub fn reset(&mut self) {
        self.clear();
        for force in Force::iter() {
            let home = home_rank(force);
            for (x, &kind) in BACK_RANK.iter().enumerate() {
                self.place(kind, force, Point::new(x as i8, home));
            }
            self.allow_castling(Point::new(0, home));
            self.allow_castling(Point::new(BOARD_SIZE - 1, home));
            for x in 0..BOARD_SIZE {
                self.place(PieceKind::Pawn, force, Point::new(x, pawn_rank(force)));
            }
        }
    }

    // Puts a fresh piece on an empty square. Pawns become promotable; a pawn outside of
    // its starting rank counts as moved, so it cannot double-step.
    pub fn place(&mut self, kind: PieceKind, force: Force, pos: Point) -> PieceId {
        let id = self.next_piece_id.inc();
        let mut piece = PieceOnBoard::new(id, kind, force);
        if kind == PieceKind::Pawn {
            piece.has_moved = pos.y != pawn_rank(force);
            self.promotable.insert(id);
        }
        self.add_piece(piece, pos);
        id
    }

    // Registers the unmoved rook at `rook_pos` as a castling partner of its king.
    #[track_caller]
    pub fn allow_castling(&mut self, rook_pos: Point) {
        let rook = self.grid[rook_pos]
            .filter(|p| p.kind == PieceKind::Rook)
            .unwrap_or_else(|| internal_error!("no rook at {rook_pos:?}"));
        let rooks = &mut self.castling_rooks[rook.force];
        if !rooks.contains(&rook.id) {
            rooks.push(rook.id);
        }
    }

    pub fn grid(&self) -> &Grid { &self.grid }

    // Returns the piece at `pos`. Panics if `pos` is outside of the board.
    #[track_caller]
    pub fn get_piece(&self, pos: Point) -> Option<PieceOnBoard> { self.grid[pos] }

    pub fn is_occupied(&self, pos: Point) -> bool {
        matches!(self.grid.get(pos), GridItem::Piece(_))
    }

    #[track_caller]
    pub fn add_piece(&mut self, piece: PieceOnBoard, pos: Point) {
        assert!(
            self.grid[pos].is_none(),
            "{}",
            internal_error_message!("{pos:?} is occupied")
        );
        if piece.kind == PieceKind::King {
            assert!(
                self.kings[piece.force].is_none(),
                "{}",
                internal_error_message!("second {} king", piece.force)
            );
            self.kings[piece.force] = Some(pos);
        }
        self.grid[pos] = Some(piece);
    }

    #[track_caller]
    pub fn remove_piece(&mut self, pos: Point) -> PieceOnBoard {
        let piece = self.grid[pos]
            .take()
            .unwrap_or_else(|| internal_error!("no piece at {pos:?}"));
        if piece.kind == PieceKind::King {
            self.kings[piece.force] = None;
        }
        self.promotable.remove(&piece.id);
        self.castling_rooks[piece.force].retain(|&id| id != piece.id);
        piece
    }

    // Moves a piece, capturing whatever stands on `to`. Returns the captured piece.
    // Does not touch the last move: callers record it.
    #[track_caller]
    pub fn relocate(&mut self, from: Point, to: Point) -> Option<PieceOnBoard> {
        let captured = self.grid[to].is_some().then(|| self.remove_piece(to));
        let mut piece = self.remove_piece(from);
        let promotable = piece.kind == PieceKind::Pawn;
        piece.has_moved = true;
        self.add_piece(piece, to);
        if promotable {
            self.promotable.insert(piece.id);
        }
        captured
    }

    // Replaces the pawn at `pos` with a new piece of `kind`.
    #[track_caller]
    pub fn promote(&mut self, pos: Point, kind: PieceKind) -> PieceId {
        let pawn = self.remove_piece(pos);
        let id = self.next_piece_id.inc();
        let mut piece = PieceOnBoard::new(id, kind, pawn.force);
        piece.has_moved = true;
        self.add_piece(piece, pos);
        id
    }

    pub fn last_move(&self) -> Option<(Point, Point)> { self.last_move }
    pub fn set_last_move(&mut self, from: Point, to: Point) { self.last_move = Some((from, to)); }

    #[track_caller]
    pub fn king_pos(&self, force: Force) -> Point {
        self.kings[force]
            .unwrap_or_else(|| internal_error!("no {force} king"))
    }
    pub fn has_king(&self, force: Force) -> bool { self.kings[force].is_some() }

    pub fn all_pieces(&self, force: Force) -> Vec<(Point, PieceOnBoard)> {
        self.grid
            .pieces()
            .filter(|(_, piece)| piece.force == force)
            .map(|(pos, piece)| (pos, *piece))
            .collect()
    }

    pub fn is_promotable(&self, id: PieceId) -> bool { self.promotable.contains(&id) }
    pub fn is_castling_rook(&self, force: Force, id: PieceId) -> bool {
        self.castling_rooks[force].contains(&id)
    }

    // Positions of the pieces currently giving check to `force`'s king.
    pub fn checks(&self, force: Force) -> &[Point] { &self.checks[force] }
    pub fn is_in_check(&self, force: Force) -> bool { !self.checks[force].is_empty() }
    pub fn set_checks(&mut self, force: Force, checkers: Vec<Point>) { self.checks[force] = checkers; }
    pub fn clear_checks(&mut self, force: Force) { self.checks[force].clear(); }
}
