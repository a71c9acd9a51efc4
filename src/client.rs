// Client side of a networked game. The local engine validates our moves before they are
// sent and replays the opponent's moves relayed by the server.

use std::sync::{Arc, Mutex};
use std::thread;

use log::{info, warn};

use crate::controller::{
    ChessController, TurnRenderer, apply_local_move, ask_promotion, ask_replay, show_new_game,
};
use crate::coord::Point;
use crate::force::Force;
use crate::game::{ChessGame, Evaluation, MoveOutcome};
use crate::message::{Message, ProtocolError};
use crate::peer::{PeerError, PeerHandler, retry_until_valid};
use crate::view::{self, ChessView};


struct ClientState {
    game: ChessGame,
    my_force: Option<Force>,
}

#[derive(Clone)]
pub struct ClientGame {
    peer: Arc<PeerHandler>,
    view: Arc<dyn ChessView>,
    state: Arc<Mutex<ClientState>>,
}

impl ClientGame {
    pub fn new(peer: PeerHandler, view: Arc<dyn ChessView>) -> Self {
        ClientGame {
            peer: Arc::new(peer),
            view,
            state: Arc::new(Mutex::new(ClientState { game: ChessGame::new(), my_force: None })),
        }
    }

    pub fn my_force(&self) -> Option<Force> { self.state.lock().unwrap().my_force }
    pub fn game(&self) -> ChessGame { self.state.lock().unwrap().game.clone() }
    pub fn is_connected(&self) -> bool { !self.peer.is_disconnected() }

    fn is_my_turn(state: &ClientState) -> bool {
        state.game.is_active()
            && state.game.pending_promotion().is_none()
            && state.my_force == Some(state.game.active_force())
    }

    fn on_fatal(&self, err: PeerError) {
        warn!("Connection to {} lost: {err:?}", self.peer.name());
        self.view.display_message(view::OPPONENT_DISCONNECTED);
        self.peer.close();
    }

    fn spawn(&self, f: impl FnOnce(ClientGame) + Send + 'static) {
        let this = self.clone();
        if let Err(err) = thread::Builder::new().name("opponent".to_owned()).spawn(move || f(this)) {
            warn!("Cannot start background thread: {err}");
        }
    }

    // Starts a game with the current color: white moves, black waits.
    fn begin_game(&self) {
        let my_force = {
            let mut state = self.state.lock().unwrap();
            state.game.reset();
            show_new_game(&*self.view, &state.game);
            state.my_force
        };
        if my_force == Some(Force::Black) {
            self.spawn(|this| this.listen_to_opponent());
        }
    }

    // Waits for the opponent's move and plays it. Runs on a background thread.
    fn listen_to_opponent(&self) {
        let evaluation = match self.receive_opponent_move() {
            Ok(evaluation) => evaluation,
            Err(err) => return self.on_fatal(err),
        };
        if evaluation.is_terminal() {
            self.finish_game();
        }
    }

    fn receive_opponent_move(&self) -> Result<Evaluation, PeerError> {
        loop {
            let (from, to) = retry_until_valid(|| self.peer.await_move())?;
            let mut state = self.state.lock().unwrap();
            let renderer = TurnRenderer::new(&state.game);
            let evaluation = match state.game.try_move(from, to) {
                Ok(MoveOutcome::Done(evaluation)) => evaluation,
                Ok(MoveOutcome::PromotionRequired(pos)) => loop {
                    let (kind, at) = retry_until_valid(|| self.peer.await_promotion())?;
                    match state.game.promote(kind, at) {
                        Ok(evaluation) => break evaluation,
                        Err(err) => {
                            warn!("Bad promotion at {pos:?} from server: {err:?}");
                            let _ = self.peer.send_error(ProtocolError::InvalidPromotion);
                        }
                    }
                },
                Err(err) => {
                    warn!("Server relayed an illegal move {from:?}-{to:?}: {err:?}");
                    let _ = self.peer.send_error(ProtocolError::InvalidMove);
                    continue;
                }
            };
            info!("Opponent played {from:?}-{to:?}");
            renderer.finish(&*self.view, &state.game, evaluation);
            return Ok(evaluation);
        }
    }

    // Replay vote. Both players must agree; otherwise the connection is closed.
    fn finish_game(&self) {
        let vote = ask_replay(&*self.view);
        if let Err(err) = self.peer.send(&Message::replay(vote)) {
            return self.on_fatal(err);
        }
        let their_vote = match retry_until_valid(|| self.peer.await_replay()) {
            Ok(vote) => vote,
            Err(err) => return self.on_fatal(err),
        };
        if vote.is_yes() && their_vote.is_yes() {
            info!("Rematch");
            self.begin_game();
        } else {
            info!("No rematch (we: {vote}, opponent: {their_vote})");
            self.peer.close();
        }
    }
}

impl ChessController for ClientGame {
    // Blocks until the server assigns a color.
    fn start_game(&self) {
        match retry_until_valid(|| self.peer.await_color()) {
            Ok(force) => {
                info!("Playing {force}");
                self.state.lock().unwrap().my_force = Some(force);
                self.begin_game();
            }
            Err(err) => self.on_fatal(err),
        }
    }

    fn make_move(&self, from_x: i8, from_y: i8, to_x: i8, to_y: i8) -> bool {
        if self.peer.is_disconnected() {
            return false;
        }
        let (from, to) = (Point::new(from_x, from_y), Point::new(to_x, to_y));
        let mut state = self.state.lock().unwrap();
        if !Self::is_my_turn(&state) {
            return false;
        }
        let renderer = TurnRenderer::new(&state.game);
        let (evaluation, promotion) =
            match apply_local_move(&mut state.game, from, to, || ask_promotion(&*self.view)) {
                Ok(result) => result,
                Err(_) => return false,
            };
        if let Some(kind) = promotion {
            self.peer.defer(Message::promotion(kind, to));
        }
        let sent = self.peer.send_with_deferred(&Message::movement(from, to));
        renderer.finish(&*self.view, &state.game, evaluation);
        drop(state);
        match sent {
            Err(err) => self.on_fatal(err),
            Ok(()) if evaluation.is_terminal() => self.spawn(|this| this.finish_game()),
            Ok(()) => self.spawn(|this| this.listen_to_opponent()),
        }
        true
    }
}
