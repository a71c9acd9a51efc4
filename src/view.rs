// The presentation boundary. A view only paints pieces, shows text and asks questions;
// it never sees game objects.

use crate::board::Board;
use crate::coord::Point;
use crate::force::Force;
use crate::game::Evaluation;
use crate::grid::Grid;
use crate::piece::PieceKind;


pub const CHECK: &str = "Check!";
pub const CHECKMATE: &str = "Checkmate!";
pub const STALEMATE: &str = "Stalemate!";
pub const INSUFFICIENT_MATERIAL: &str = "Insufficient material!";
pub const OPPONENT_DISCONNECTED: &str = "Opponent disconnected";
pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const PROMOTE_HEADER: &str = "Promote";
pub const PROMOTE_QUESTION: &str = "To which piece do you want to promote?";
pub const NEW_GAME_HEADER: &str = "New game";
pub const REPLAY_QUESTION: &str = "Do you want to play again?";

pub trait ChessView: Send + Sync {
    fn put_piece(&self, kind: PieceKind, force: Force, x: i8, y: i8);
    fn remove_piece(&self, x: i8, y: i8);
    fn display_message(&self, text: &str);
    // Blocks until the user picks one of `options`; returns the chosen label.
    fn ask_user(&self, header: &str, question: &str, options: &[String]) -> String;
}

pub fn to_move_message(force: Force) -> String { format!("{force} to move") }
pub fn winner_message(force: Force) -> String { format!("{force} wins") }

// What to tell the players after a move. `next` is the side to reply, or the losing side
// after a checkmate.
pub fn evaluation_messages(evaluation: Evaluation, next: Force) -> Vec<String> {
    match evaluation {
        Evaluation::Normal => vec![to_move_message(next)],
        Evaluation::Check => vec![CHECK.to_owned(), to_move_message(next)],
        Evaluation::Checkmate => vec![CHECKMATE.to_owned(), winner_message(next.opponent())],
        Evaluation::Stalemate => vec![STALEMATE.to_owned()],
        Evaluation::InsufficientMaterial => vec![INSUFFICIENT_MATERIAL.to_owned()],
    }
}

pub fn announce(view: &dyn ChessView, evaluation: Evaluation, next: Force) {
    for message in evaluation_messages(evaluation, next) {
        view.display_message(&message);
    }
}

fn render_square(view: &dyn ChessView, grid: &Grid, pos: Point) {
    match grid[pos] {
        Some(piece) => view.put_piece(piece.kind, piece.force, pos.x, pos.y),
        None => view.remove_piece(pos.x, pos.y),
    }
}

pub fn render_board(view: &dyn ChessView, board: &Board) {
    for pos in Point::all() {
        render_square(view, board.grid(), pos);
    }
}

// Repaints only the squares whose content changed between two snapshots.
pub fn render_diff(view: &dyn ChessView, before: &Grid, after: &Grid) {
    let key = |grid: &Grid, pos: Point| grid[pos].map(|p| (p.kind, p.force));
    for pos in Point::all() {
        if key(before, pos) != key(after, pos) {
            render_square(view, after, pos);
        }
    }
}
