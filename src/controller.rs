use std::str::FromStr;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::coord::Point;
use crate::game::{ChessGame, Evaluation, GameStatus, MoveError, MoveOutcome};
use crate::grid::Grid;
use crate::internal_error;
use crate::message::ReplayVote;
use crate::piece::{PROMOTION_TARGETS, PieceKind};
use crate::view::{self, ChessView};


// What a driver (terminal loop, GUI) calls into.
pub trait ChessController {
    fn start_game(&self);
    // Returns whether the move was accepted.
    fn make_move(&self, from_x: i8, from_y: i8, to_x: i8, to_y: i8) -> bool;
}

pub fn ask_promotion(view: &dyn ChessView) -> PieceKind {
    let options: Vec<String> = PROMOTION_TARGETS.iter().map(|kind| kind.to_string()).collect();
    let answer = view.ask_user(view::PROMOTE_HEADER, view::PROMOTE_QUESTION, &options);
    PieceKind::from_str(&answer)
        .ok()
        .filter(|kind| kind.is_promotion_target())
        .unwrap_or_else(|| {
            warn!("Unexpected promotion choice {answer:?}, using queen");
            PieceKind::Queen
        })
}

pub fn ask_replay(view: &dyn ChessView) -> ReplayVote {
    let options = vec![view::YES.to_owned(), view::NO.to_owned()];
    let answer = view.ask_user(view::NEW_GAME_HEADER, view::REPLAY_QUESTION, &options);
    ReplayVote::from_bool(answer == view::YES)
}

// Snapshot taken before a move; `finish` repaints what the move changed and tells the
// players where the game stands.
pub struct TurnRenderer {
    before: Grid,
}

impl TurnRenderer {
    pub fn new(game: &ChessGame) -> Self { TurnRenderer { before: game.board().grid().clone() } }

    pub fn finish(self, view: &dyn ChessView, game: &ChessGame, evaluation: Evaluation) {
        view::render_diff(view, &self.before, game.board().grid());
        let next = match game.status() {
            GameStatus::Checkmate { winner } => winner.opponent(),
            _ => game.active_force(),
        };
        view::announce(view, evaluation, next);
    }
}

pub fn show_new_game(view: &dyn ChessView, game: &ChessGame) {
    view::render_board(view, game.board());
    view.display_message(&view::to_move_message(game.active_force()));
}

// Runs a move through the engine, asking `choose_promotion` for the piece if the move
// ends on the last rank.
pub fn apply_local_move(
    game: &mut ChessGame, from: Point, to: Point, choose_promotion: impl FnOnce() -> PieceKind,
) -> Result<(Evaluation, Option<PieceKind>), MoveError> {
    match game.try_move(from, to)? {
        MoveOutcome::Done(evaluation) => Ok((evaluation, None)),
        MoveOutcome::PromotionRequired(pos) => {
            let kind = choose_promotion();
            let evaluation = game
                .promote(kind, pos)
                .unwrap_or_else(|err| internal_error!("{err:?}"));
            Ok((evaluation, Some(kind)))
        }
    }
}

// Both players at one screen.
pub struct LocalGame {
    game: Mutex<ChessGame>,
    view: Arc<dyn ChessView>,
}

impl LocalGame {
    pub fn new(view: Arc<dyn ChessView>) -> Self {
        LocalGame { game: Mutex::new(ChessGame::new()), view }
    }

    pub fn game(&self) -> ChessGame { self.game.lock().unwrap().clone() }
}

impl ChessController for LocalGame {
    fn start_game(&self) {
        let mut game = self.game.lock().unwrap();
        game.reset();
        show_new_game(&*self.view, &game);
    }

    fn make_move(&self, from_x: i8, from_y: i8, to_x: i8, to_y: i8) -> bool {
        let (from, to) = (Point::new(from_x, from_y), Point::new(to_x, to_y));
        let mut game = self.game.lock().unwrap();
        let renderer = TurnRenderer::new(&game);
        let evaluation = match apply_local_move(&mut game, from, to, || ask_promotion(&*self.view)) {
            Ok((evaluation, _)) => evaluation,
            Err(err) => {
                debug!("Move {from:?}-{to:?} rejected: {err:?}");
                return false;
            }
        };
        renderer.finish(&*self.view, &game, evaluation);
        if evaluation.is_terminal() {
            drop(game);
            if ask_replay(&*self.view).is_yes() {
                self.start_game();
            }
        }
        true
    }
}
