// Server side of one match. The session thread owns the authoritative `ChessGame` and
// reads moves only from the side to move, so no locking is needed around the game.
// Whatever the other side sent meanwhile is rejected before it hears the reply.

use enum_map::{EnumMap, enum_map};
use log::{info, warn};
use strum::IntoEnumIterator;

use crate::force::Force;
use crate::game::{ChessGame, Evaluation, MoveOutcome};
use crate::message::{Message, ProtocolError, ReplayVote};
use crate::peer::{PeerError, PeerHandler, retry_until_valid};
use crate::piece::PieceKind;


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionEnd {
    // Somebody voted against a rematch.
    Finished,
    Disconnected(Force),
    TimedOut(Force),
}

// Fatal condition attributed to one of the players.
type Fatal = (Force, PeerError);

pub struct PlayerPair {
    players: EnumMap<Force, PeerHandler>,
}

impl PlayerPair {
    pub fn new(white: PeerHandler, black: PeerHandler) -> Self {
        PlayerPair { players: EnumMap::from_array([white, black]) }
    }

    pub fn player(&self, force: Force) -> &PeerHandler { &self.players[force] }

    pub fn send_colors(&self) -> Result<(), Fatal> {
        for force in Force::iter() {
            self.players[force].send(&Message::color(force)).map_err(|err| (force, err))?;
        }
        Ok(())
    }

    pub fn close(&self) {
        for player in self.players.values() {
            player.close();
        }
    }
}

pub struct GameSession {
    id: u64,
    players: PlayerPair,
    game: ChessGame,
}

fn session_end((force, err): Fatal) -> SessionEnd {
    match err {
        PeerError::TimedOut => SessionEnd::TimedOut(force),
        _ => SessionEnd::Disconnected(force),
    }
}

impl GameSession {
    pub fn new(id: u64, players: PlayerPair) -> Self {
        GameSession { id, players, game: ChessGame::new() }
    }

    // Plays games until somebody declines a rematch or drops out. Both connections are
    // closed on return, so a surviving player sees a disconnect.
    pub fn run(self) -> SessionEnd {
        let GameSession { id, players, mut game } = self;
        let players = scopeguard::guard(players, |players| players.close());
        info!(
            "Session {id} started: {} vs {}",
            players.player(Force::White).name(),
            players.player(Force::Black).name()
        );
        let end = loop {
            if let Err(fatal) = play_game(id, &players, &mut game) {
                break session_end(fatal);
            }
            match vote_replay(&players) {
                Ok(true) => {
                    info!("Session {id}: rematch");
                    game.reset();
                }
                Ok(false) => break SessionEnd::Finished,
                Err(fatal) => break session_end(fatal),
            }
        };
        info!("Session {id} ended: {end:?}");
        end
    }
}

fn await_valid<T>(
    force: Force, await_fn: impl FnMut() -> Result<T, PeerError>,
) -> Result<T, Fatal> {
    retry_until_valid(await_fn).map_err(|err| (force, err))
}

fn play_game(id: u64, players: &PlayerPair, game: &mut ChessGame) -> Result<(), Fatal> {
    loop {
        let force = game.active_force();
        let player = players.player(force);
        let opponent = players.player(force.opponent());
        let (from, to) = await_valid(force, || player.await_move())?;
        let evaluation = match game.try_move(from, to) {
            Err(err) => {
                info!("Session {id}: {force} move {from:?}-{to:?} rejected: {err:?}");
                let _ = player.send_error(ProtocolError::InvalidMove);
                continue;
            }
            Ok(MoveOutcome::Done(evaluation)) => {
                opponent.reject_pending().map_err(|err| (force.opponent(), err))?;
                opponent.send(&Message::movement(from, to)).map_err(|err| (force.opponent(), err))?;
                evaluation
            }
            Ok(MoveOutcome::PromotionRequired(_)) => {
                let (kind, evaluation) = await_promotion(force, player, game)?;
                opponent.reject_pending().map_err(|err| (force.opponent(), err))?;
                opponent.defer(Message::promotion(kind, to));
                opponent
                    .send_with_deferred(&Message::movement(from, to))
                    .map_err(|err| (force.opponent(), err))?;
                evaluation
            }
        };
        info!("Session {id}: {force} {from:?}-{to:?}, {evaluation:?}");
        if evaluation.is_terminal() {
            return Ok(());
        }
    }
}

fn await_promotion(
    force: Force, player: &PeerHandler, game: &mut ChessGame,
) -> Result<(PieceKind, Evaluation), Fatal> {
    loop {
        let (kind, pos) = await_valid(force, || player.await_promotion())?;
        match game.promote(kind, pos) {
            Ok(evaluation) => return Ok((kind, evaluation)),
            Err(err) => {
                warn!("{force}: promotion to {kind} at {pos:?} rejected: {err:?}");
                let _ = player.send_error(ProtocolError::InvalidPromotion);
            }
        }
    }
}

// Collects both votes, then tells each player what the other one chose.
fn vote_replay(players: &PlayerPair) -> Result<bool, Fatal> {
    let mut votes = enum_map! { _ => ReplayVote::No };
    for force in Force::iter() {
        votes[force] = await_valid(force, || players.player(force).await_replay())?;
    }
    for force in Force::iter() {
        players
            .player(force)
            .send(&Message::replay(votes[force.opponent()]))
            .map_err(|err| (force, err))?;
    }
    Ok(votes.values().all(|vote| vote.is_yes()))
}
