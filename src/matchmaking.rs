use std::collections::VecDeque;
use std::io;
use std::net::TcpStream;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::peer::{PeerHandler, PeerOptions};
use crate::session::{GameSession, PlayerPair, SessionEnd};


// First come, first served pairing. The earlier of two queued players gets white.
pub struct GamePool {
    queue: Mutex<VecDeque<PeerHandler>>,
    options: PeerOptions,
    next_session_id: AtomicU64,
}

fn drop_disconnected(queue: &mut VecDeque<PeerHandler>) {
    queue.retain(|peer| {
        if peer.is_disconnected() {
            info!("{} left before being paired", peer.name());
        }
        !peer.is_disconnected()
    });
}

impl GamePool {
    pub fn new(options: PeerOptions) -> Self {
        GamePool {
            queue: Mutex::new(VecDeque::new()),
            options,
            next_session_id: AtomicU64::new(1),
        }
    }

    // Number of players waiting for an opponent.
    pub fn waiting(&self) -> usize {
        let mut queue = self.queue.lock().unwrap();
        drop_disconnected(&mut queue);
        queue.len()
    }

    // Queues the player. Once two are queued, sends them their colors and starts a
    // session on a new thread, whose handle is returned.
    pub fn handle_incoming_player(
        &self, stream: TcpStream,
    ) -> io::Result<Option<JoinHandle<SessionEnd>>> {
        let peer = PeerHandler::new(stream, self.options)?;
        info!("{} connected", peer.name());
        let (white, black) = {
            let mut queue = self.queue.lock().unwrap();
            drop_disconnected(&mut queue);
            queue.push_back(peer);
            if queue.len() < 2 {
                return Ok(None);
            }
            match (queue.pop_front(), queue.pop_front()) {
                (Some(white), Some(black)) => (white, black),
                _ => return Ok(None),
            }
        };
        let players = PlayerPair::new(white, black);
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        if let Err((force, err)) = players.send_colors() {
            warn!("Session {id}: cannot assign {force}: {err:?}");
            players.close();
            return Ok(None);
        }
        let handle = thread::Builder::new()
            .name(format!("session {id}"))
            .spawn(move || GameSession::new(id, players).run())?;
        Ok(Some(handle))
    }
}
