// Per-piece move geometry: reachability, attacks, pins and castling.
//
// Everything here is a pure function of the board. Turn order, check resolution and
// game end are the business of `game`.

use crate::board::Board;
use crate::coord::{BOARD_SIZE, Point};
use crate::direction::Direction;
use crate::force::Force;
use crate::piece::{PieceKind, PieceOnBoard};


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Castling {
    pub rook_from: Point,
    pub rook_to: Point,
}

// Direction of the move if it is one of the piece's own directions within its range.
pub fn available_direction(piece: &PieceOnBoard, from: Point, to: Point) -> Option<Direction> {
    let dir = Direction::offset_of(from, to)?;
    let in_range = Direction::move_distance(from, to) <= piece.max_distance();
    (piece.directions().contains(&dir) && in_range).then_some(dir)
}

// Whether all squares strictly between `from` and `to` are empty. Squares not connected
// by a direction have nothing in between.
pub fn path_is_clear(board: &Board, from: Point, to: Point) -> bool {
    let Some(dir) = Direction::offset_of(from, to) else {
        return true;
    };
    let mut pos = from.with_added(dir);
    while pos != to {
        if board.is_occupied(pos) {
            return false;
        }
        pos = pos.with_added(dir);
    }
    true
}

fn base_reach(board: &Board, piece: &PieceOnBoard, from: Point, to: Point) -> bool {
    available_direction(piece, from, to).is_some() && path_is_clear(board, from, to)
}

fn holds_enemy(board: &Board, pos: Point, force: Force) -> bool {
    board.get_piece(pos).is_some_and(|p| p.force != force)
}

// Square of the pawn taken en passant if the pawn at `from` moving to `to` would be an
// en passant capture.
pub fn en_passant_capture(board: &Board, from: Point, to: Point) -> Option<Point> {
    let pawn = board.get_piece(from)?;
    if pawn.kind != PieceKind::Pawn || !to.is_in_board() || board.is_occupied(to) {
        return None;
    }
    let dir = available_direction(&pawn, from, to)?;
    if !dir.is_diagonal() || Direction::move_distance(from, to) != 1 {
        return None;
    }
    let (last_from, last_to) = board.last_move()?;
    let victim = board.get_piece(last_to)?;
    let double_step = (last_to.y - last_from.y).abs() == 2 && last_to.x == last_from.x;
    let adjacent = last_to.x == to.x && last_to.y == from.y;
    (victim.kind == PieceKind::Pawn && victim.force != pawn.force && double_step && adjacent)
        .then_some(last_to)
}

fn pawn_reach(board: &Board, pawn: &PieceOnBoard, from: Point, to: Point) -> bool {
    let Some(dir) = available_direction(pawn, from, to) else {
        return false;
    };
    if dir.is_diagonal() {
        Direction::move_distance(from, to) == 1
            && (holds_enemy(board, to, pawn.force) || en_passant_capture(board, from, to).is_some())
    } else {
        path_is_clear(board, from, to) && !board.is_occupied(to)
    }
}

// Whether `force`'s king moving from `king_from` to `to` would stand in check there.
// A slider already checking the king still covers the squares behind it on the same line.
fn dest_is_in_check(board: &Board, force: Force, king_from: Point, to: Point) -> bool {
    let attacked = board
        .all_pieces(force.opponent())
        .iter()
        .any(|(pos, _)| is_attacking(board, *pos, to));
    if attacked {
        return true;
    }
    let move_dir = Direction::offset_of(king_from, to);
    board.checks(force).iter().any(|&checker| {
        board.get_piece(checker).is_some_and(|p| p.kind.is_slider())
            && Direction::offset_of(checker, king_from) == move_dir
    })
}

// Whether the piece at `from` may reach `to` ignoring occupancy by allies and king
// safety (pins). Includes castling.
pub fn can_reach(board: &Board, from: Point, to: Point) -> bool {
    let Some(piece) = board.get_piece(from) else {
        return false;
    };
    match piece.kind {
        PieceKind::Pawn => pawn_reach(board, &piece, from, to),
        PieceKind::King => {
            (base_reach(board, &piece, from, to) && !dest_is_in_check(board, piece.force, from, to))
                || castling(board, from, to).is_some()
        }
        _ => base_reach(board, &piece, from, to),
    }
}

// Whether the piece at `from` could capture something standing on `to`. Does not care
// what actually stands on `to`, nor whether the attacker's own king would be exposed.
pub fn is_attacking(board: &Board, from: Point, to: Point) -> bool {
    let Some(piece) = board.get_piece(from) else {
        return false;
    };
    if !to.is_in_board() {
        return false;
    }
    match piece.kind {
        PieceKind::Pawn => available_direction(&piece, from, to)
            .is_some_and(|dir| dir.is_diagonal() && Direction::move_distance(from, to) == 1),
        _ => base_reach(board, &piece, from, to),
    }
}

// Whether moving the piece at `from` to `to` would uncover an attack on its own king.
// Only sliders pin. Capturing the pinning piece is allowed, so is moving along the pin line.
pub fn is_pinned_move(board: &Board, from: Point, to: Point) -> bool {
    let Some(piece) = board.get_piece(from) else {
        return false;
    };
    if piece.kind == PieceKind::King || !board.has_king(piece.force) {
        return false;
    }
    let king = board.king_pos(piece.force);
    let Some(to_king) = Direction::offset_of(from, king) else {
        return false;
    };
    if to_king.is_knight_jump() || !path_is_clear(board, from, king) {
        return false;
    }
    board.all_pieces(piece.force.opponent()).iter().any(|(enemy_pos, enemy)| {
        *enemy_pos != to
            && enemy.kind.is_slider()
            && Direction::offset_of(*enemy_pos, from) == Some(to_king)
            && Direction::offset_of(to, king) != Some(to_king)
            && is_attacking(board, *enemy_pos, from)
            && available_direction(enemy, *enemy_pos, king).is_some()
    })
}

// Rook hop for a king move of two squares along its home rank, if castling is allowed.
pub fn castling(board: &Board, from: Point, to: Point) -> Option<Castling> {
    let king = board.get_piece(from)?;
    if king.kind != PieceKind::King || !king.can_castle() || board.is_in_check(king.force) {
        return None;
    }
    if !to.is_in_board() || from.y != to.y || (to.x - from.x).abs() != 2 {
        return None;
    }
    let dir = Direction::offset_of(from, to)?;
    let rook_from = Point::new(if dir == Direction::East { BOARD_SIZE - 1 } else { 0 }, from.y);
    let rook = board.get_piece(rook_from)?;
    let rook_ok = rook.kind == PieceKind::Rook
        && rook.force == king.force
        && rook.can_castle()
        && board.is_castling_rook(king.force, rook.id)
        && Direction::offset_of(rook_from, to) == Some(dir.opposite());
    if !rook_ok || !path_is_clear(board, from, rook_from) {
        return None;
    }
    let enemies = board.all_pieces(king.force.opponent());
    let mut pos = from;
    while pos != to {
        pos = pos.with_added(dir);
        if enemies.iter().any(|(enemy_pos, _)| is_attacking(board, *enemy_pos, pos)) {
            return None;
        }
    }
    Some(Castling { rook_from, rook_to: from.with_added(dir) })
}

// En passant empties two squares of one rank at once, which `is_pinned_move` cannot see.
// Plays the capture on a copy of the board and looks for attacks on the mover's king.
fn en_passant_exposes_king(board: &Board, from: Point, to: Point) -> bool {
    let Some(captured) = en_passant_capture(board, from, to) else {
        return false;
    };
    let force = board.get_piece(from).map(|p| p.force);
    let Some(force) = force.filter(|&f| board.has_king(f)) else {
        return false;
    };
    let mut after = board.clone();
    after.remove_piece(captured);
    after.relocate(from, to);
    let king = after.king_pos(force);
    after
        .all_pieces(force.opponent())
        .iter()
        .any(|(pos, _)| is_attacking(&after, *pos, king))
}

// Full legality for the piece at `from` apart from turn order and check resolution.
pub fn can_move_to(board: &Board, from: Point, to: Point) -> bool {
    let Some(piece) = board.get_piece(from) else {
        return false;
    };
    to.is_in_board()
        && !board.get_piece(to).is_some_and(|p| p.force == piece.force)
        && can_reach(board, from, to)
        && !is_pinned_move(board, from, to)
        && !en_passant_exposes_king(board, from, to)
}

pub fn legal_destinations(board: &Board, from: Point) -> Vec<Point> {
    Point::all().filter(|&to| can_move_to(board, from, to)).collect()
}
