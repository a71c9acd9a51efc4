use std::collections::HashMap;

use crate::board::Board;
use crate::coord::Point;
use crate::direction::Direction;
use crate::force::Force;
use crate::internal_error_message;
use crate::movement::{self, castling, en_passant_capture, is_attacking, path_is_clear};
use crate::piece::{PieceId, PieceKind};


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameStatus {
    Active,
    Checkmate { winner: Force },
    Stalemate,
    InsufficientMaterial,
}

// Result of evaluating the position after a completed move, from the point of view of
// the side that is to reply.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Evaluation {
    Normal,
    Check,
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    Done(Evaluation),
    // The pawn reached its last rank on the given square. The move is complete only
    // after `ChessGame::promote`.
    PromotionRequired(Point),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveError {
    OutOfBoard,
    PieceMissing,
    NullMove,
    WrongTurnOrder,
    IllegalMove,
    MustResolveCheck,
    PromotionPending,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PromotionError {
    NotPending,
    WrongSquare,
    BadPieceKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    AwaitingMove,
    AwaitingPromotion(Point),
    Over,
}

// Squares touched by the last move: where pieces left from and where they landed.
#[derive(Clone, Debug)]
struct MoveFootprint {
    vacated: Vec<Point>,
    occupied: Vec<Point>,
}

impl Evaluation {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Evaluation::Checkmate | Evaluation::Stalemate | Evaluation::InsufficientMaterial
        )
    }
}

#[derive(Clone, Debug)]
pub struct ChessGame {
    board: Board,
    active_force: Force,
    status: GameStatus,
    phase: Phase,
    // Legal replies per piece while the active king is in check. Empty otherwise.
    mandatory_moves: HashMap<PieceId, Vec<Point>>,
    pending: Option<MoveFootprint>,
}

impl ChessGame {
    pub fn new() -> Self { Self::from_board(Board::new(), Force::White) }

    // Starts from an arbitrary position. Checks against `active_force` are detected and
    // the position is evaluated right away, so a game may begin already finished.
    #[track_caller]
    pub fn from_board(board: Board, active_force: Force) -> Self {
        assert!(
            board.has_king(Force::White) && board.has_king(Force::Black),
            "{}",
            internal_error_message!("both kings are required")
        );
        let mut game = ChessGame {
            board,
            active_force,
            status: GameStatus::Active,
            phase: Phase::AwaitingMove,
            mandatory_moves: HashMap::new(),
            pending: None,
        };
        let king = game.board.king_pos(active_force);
        let checkers = game
            .board
            .all_pieces(active_force.opponent())
            .into_iter()
            .filter(|(pos, _)| is_attacking(&game.board, *pos, king))
            .map(|(pos, _)| pos)
            .collect();
        game.settle(active_force, checkers);
        game
    }

    pub fn reset(&mut self) { *self = Self::new(); }

    pub fn board(&self) -> &Board { &self.board }
    pub fn active_force(&self) -> Force { self.active_force }
    pub fn status(&self) -> GameStatus { self.status }
    pub fn is_active(&self) -> bool { self.status == GameStatus::Active }
    pub fn is_in_check(&self, force: Force) -> bool { self.board.is_in_check(force) }
    pub fn is_checkmate(&self) -> bool { matches!(self.status, GameStatus::Checkmate { .. }) }
    pub fn is_stalemate(&self) -> bool { self.status == GameStatus::Stalemate }
    pub fn is_insufficient_material(&self) -> bool {
        self.status == GameStatus::InsufficientMaterial
    }
    pub fn pending_promotion(&self) -> Option<Point> {
        match self.phase {
            Phase::AwaitingPromotion(pos) => Some(pos),
            _ => None,
        }
    }

    // Where the piece at `from` may go right now. Empty unless it is that piece's turn.
    pub fn legal_destinations(&self, from: Point) -> Vec<Point> {
        if self.phase != Phase::AwaitingMove || !from.is_in_board() {
            return Vec::new();
        }
        let Some(piece) = self.board.get_piece(from) else {
            return Vec::new();
        };
        if piece.force != self.active_force {
            return Vec::new();
        }
        if self.board.is_in_check(self.active_force) {
            return self.mandatory_moves.get(&piece.id).cloned().unwrap_or_default();
        }
        movement::legal_destinations(&self.board, from)
    }

    pub fn try_move(&mut self, from: Point, to: Point) -> Result<MoveOutcome, MoveError> {
        match self.phase {
            Phase::Over => return Err(MoveError::GameOver),
            Phase::AwaitingPromotion(_) => return Err(MoveError::PromotionPending),
            Phase::AwaitingMove => {}
        }
        if !from.is_in_board() || !to.is_in_board() {
            return Err(MoveError::OutOfBoard);
        }
        if from == to {
            return Err(MoveError::NullMove);
        }
        let piece = self.board.get_piece(from).ok_or(MoveError::PieceMissing)?;
        if piece.force != self.active_force {
            return Err(MoveError::WrongTurnOrder);
        }
        if !movement::can_move_to(&self.board, from, to) {
            return Err(MoveError::IllegalMove);
        }
        if self.board.is_in_check(self.active_force)
            && !self.mandatory_moves.get(&piece.id).is_some_and(|moves| moves.contains(&to))
        {
            return Err(MoveError::MustResolveCheck);
        }

        let mut footprint = MoveFootprint { vacated: vec![from], occupied: vec![to] };
        let mut special_last_move = None;
        match piece.kind {
            PieceKind::King => {
                if let Some(c) = castling(&self.board, from, to) {
                    self.board.relocate(c.rook_from, c.rook_to);
                    special_last_move = Some((c.rook_from, c.rook_to));
                    footprint.vacated.push(c.rook_from);
                    footprint.occupied.push(c.rook_to);
                }
            }
            PieceKind::Pawn => {
                if let Some(captured) = en_passant_capture(&self.board, from, to) {
                    self.board.remove_piece(captured);
                    special_last_move = Some((captured, to));
                    footprint.vacated.push(captured);
                }
            }
            _ => {}
        }
        self.board.relocate(from, to);
        let (last_from, last_to) = special_last_move.unwrap_or((from, to));
        self.board.set_last_move(last_from, last_to);
        self.board.clear_checks(self.active_force);
        self.mandatory_moves.clear();

        if piece.kind.can_promote()
            && self.board.is_promotable(piece.id)
            && to.is_last_rank_for(piece.force)
        {
            self.phase = Phase::AwaitingPromotion(to);
            self.pending = Some(footprint);
            return Ok(MoveOutcome::PromotionRequired(to));
        }
        Ok(MoveOutcome::Done(self.post_move(footprint)))
    }

    // Completes a move that stopped at `MoveOutcome::PromotionRequired`.
    pub fn promote(&mut self, kind: PieceKind, pos: Point) -> Result<Evaluation, PromotionError> {
        let Phase::AwaitingPromotion(expected) = self.phase else {
            return Err(PromotionError::NotPending);
        };
        if pos != expected {
            return Err(PromotionError::WrongSquare);
        }
        if !kind.is_promotion_target() {
            return Err(PromotionError::BadPieceKind);
        }
        self.board.promote(pos, kind);
        self.phase = Phase::AwaitingMove;
        let footprint = self.pending.take().unwrap_or(MoveFootprint {
            vacated: Vec::new(),
            occupied: vec![pos],
        });
        Ok(self.post_move(footprint))
    }

    fn post_move(&mut self, footprint: MoveFootprint) -> Evaluation {
        let mover = self.active_force;
        let king = self.board.king_pos(mover.opponent());
        let mut checkers: Vec<Point> = footprint
            .occupied
            .iter()
            .copied()
            .filter(|&pos| is_attacking(&self.board, pos, king))
            .collect();
        for &vacated in &footprint.vacated {
            if let Some(checker) = discovered_checker(&self.board, vacated, king, mover) {
                if !checkers.contains(&checker) {
                    checkers.push(checker);
                }
            }
        }
        self.settle(mover.opponent(), checkers)
    }

    // Records checks against `force`, evaluates the position and hands the turn to
    // `force` unless the game is over.
    fn settle(&mut self, force: Force, checkers: Vec<Point>) -> Evaluation {
        let in_check = !checkers.is_empty();
        self.board.set_checks(force, checkers);
        self.mandatory_moves =
            if in_check { self.compute_mandatory_moves(force) } else { HashMap::new() };

        let evaluation = if in_check && self.mandatory_moves.values().all(|moves| moves.is_empty()) {
            Evaluation::Checkmate
        } else if !in_check && !self.has_any_legal_move(force) {
            Evaluation::Stalemate
        } else if is_insufficient_material(&self.board) {
            Evaluation::InsufficientMaterial
        } else if in_check {
            Evaluation::Check
        } else {
            Evaluation::Normal
        };

        match evaluation {
            Evaluation::Checkmate => {
                self.status = GameStatus::Checkmate { winner: force.opponent() };
            }
            Evaluation::Stalemate => self.status = GameStatus::Stalemate,
            Evaluation::InsufficientMaterial => self.status = GameStatus::InsufficientMaterial,
            Evaluation::Normal | Evaluation::Check => self.active_force = force,
        }
        if evaluation.is_terminal() {
            self.phase = Phase::Over;
        }
        evaluation
    }

    fn has_any_legal_move(&self, force: Force) -> bool {
        self.board
            .all_pieces(force)
            .iter()
            .any(|(pos, _)| !movement::legal_destinations(&self.board, *pos).is_empty())
    }

    // For each of `force`'s pieces, the moves that get its king out of check: stepping
    // the king away, capturing a lone checker, or blocking a lone sliding checker.
    fn compute_mandatory_moves(&self, force: Force) -> HashMap<PieceId, Vec<Point>> {
        let board = &self.board;
        let king = board.king_pos(force);
        let checkers = board.checks(force);
        let mut result = HashMap::new();
        for (pos, piece) in board.all_pieces(force) {
            let moves = if piece.kind == PieceKind::King {
                movement::legal_destinations(board, pos)
            } else if let [checker] = checkers {
                let mut targets = blocking_squares(board, *checker, king);
                targets.push(*checker);
                let mut moves: Vec<Point> = targets
                    .into_iter()
                    .filter(|&to| movement::can_move_to(board, pos, to))
                    .collect();
                if piece.kind == PieceKind::Pawn {
                    moves.extend(
                        movement::legal_destinations(board, pos)
                            .into_iter()
                            .filter(|&to| en_passant_capture(board, pos, to) == Some(*checker)),
                    );
                }
                moves
            } else {
                Vec::new()
            };
            result.insert(piece.id, moves);
        }
        result
    }
}

// Squares strictly between a sliding checker and the king.
fn blocking_squares(board: &Board, checker: Point, king: Point) -> Vec<Point> {
    let slider = board.get_piece(checker).is_some_and(|p| p.kind.is_slider());
    let Some(dir) = Direction::offset_of(checker, king) else {
        return Vec::new();
    };
    if !slider {
        return Vec::new();
    }
    let mut squares = Vec::new();
    let mut pos = checker.with_added(dir);
    while pos != king {
        squares.push(pos);
        pos = pos.with_added(dir);
    }
    squares
}

// A `mover` slider uncovered by vacating `vacated` and now attacking `king`.
fn discovered_checker(board: &Board, vacated: Point, king: Point, mover: Force) -> Option<Point> {
    let dir = Direction::offset_of(vacated, king)?;
    if dir.is_knight_jump() || board.is_occupied(vacated) || !path_is_clear(board, vacated, king) {
        return None;
    }
    let back = dir.opposite();
    let mut pos = vacated.with_added(back);
    while pos.is_in_board() {
        if let Some(piece) = board.get_piece(pos) {
            return (piece.force == mover && is_attacking(board, pos, king)).then_some(pos);
        }
        pos = pos.with_added(back);
    }
    None
}

// Bare kings, a lone minor piece against a bare king, or one bishop each on squares of
// the same colour.
fn is_insufficient_material(board: &Board) -> bool {
    let material = |force: Force| -> Vec<(Point, PieceKind)> {
        board
            .all_pieces(force)
            .into_iter()
            .filter(|(_, p)| p.kind != PieceKind::King)
            .map(|(pos, p)| (pos, p.kind))
            .collect()
    };
    let white = material(Force::White);
    let black = material(Force::Black);
    match (white.as_slice(), black.as_slice()) {
        ([], []) => true,
        ([(_, kind)], []) | ([], [(_, kind)]) => {
            matches!(kind, PieceKind::Knight | PieceKind::Bishop)
        }
        ([(white_pos, PieceKind::Bishop)], [(black_pos, PieceKind::Bishop)]) => {
            white_pos.is_dark() == black_pos.is_dark()
        }
        _ => false,
    }
}
