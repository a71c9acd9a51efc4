// Test utilities shared by unit tests, integration tests and the console's self-checks.

use std::collections::VecDeque;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use itertools::Itertools;

use crate::coord::Point;
use crate::force::Force;
use crate::game::{ChessGame, MoveError, MoveOutcome};
use crate::piece::PieceKind;
use crate::view::ChessView;


// Splits "e7e8q" into squares and an optional promotion piece.
pub fn parse_move_notation(notation: &str) -> Option<(Point, Point, Option<PieceKind>)> {
    if !notation.is_ascii() || !(4..=5).contains(&notation.len()) {
        return None;
    }
    let from = Point::try_from_algebraic(&notation[0..2])?;
    let to = Point::try_from_algebraic(&notation[2..4])?;
    let promotion = match notation[4..].chars().next() {
        None => None,
        Some(ch) => Some(PieceKind::from_algebraic_char(ch)?),
    };
    Some((from, to, promotion))
}

// Plays whitespace-separated moves like "e2e4 e7e5 g1f3". A promotion is written as a
// fifth letter ("a7a8q"); a queen is used when it is omitted.
#[track_caller]
pub fn replay_log(game: &mut ChessGame, log: &str) -> Result<(), MoveError> {
    for notation in log.split_whitespace() {
        let (from, to, promotion) =
            parse_move_notation(notation).unwrap_or_else(|| panic!("Bad move: {notation:?}"));
        if let MoveOutcome::PromotionRequired(pos) = game.try_move(from, to)? {
            game.promote(promotion.unwrap_or(PieceKind::Queen), pos).unwrap();
        }
    }
    Ok(())
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ViewEvent {
    Put(PieceKind, Force, i8, i8),
    Remove(i8, i8),
    Message(String),
    Question(String),
}

// A view that remembers everything and answers questions from a script. Unscripted
// questions get the first option.
#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
    answers: Mutex<VecDeque<String>>,
}

impl RecordingView {
    pub fn new() -> Self { Self::default() }

    pub fn with_answers(answers: &[&str]) -> Self {
        let view = Self::new();
        view.answers.lock().unwrap().extend(answers.iter().map(|a| a.to_string()));
        view
    }

    pub fn events(&self) -> Vec<ViewEvent> { self.events.lock().unwrap().clone() }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::Message(text) => Some(text),
                _ => None,
            })
            .collect_vec()
    }

    pub fn count_message(&self, text: &str) -> usize {
        self.messages().iter().filter(|m| *m == text).count()
    }

    // Polls until `text` has been displayed at least `times` times.
    pub fn wait_for_message(&self, text: &str, times: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.count_message(text) >= times {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn record(&self, event: ViewEvent) { self.events.lock().unwrap().push(event); }
}

impl ChessView for RecordingView {
    fn put_piece(&self, kind: PieceKind, force: Force, x: i8, y: i8) {
        self.record(ViewEvent::Put(kind, force, x, y));
    }

    fn remove_piece(&self, x: i8, y: i8) { self.record(ViewEvent::Remove(x, y)); }

    fn display_message(&self, text: &str) { self.record(ViewEvent::Message(text.to_owned())); }

    fn ask_user(&self, _header: &str, question: &str, options: &[String]) -> String {
        self.record(ViewEvent::Question(question.to_owned()));
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| options[0].clone())
    }
}

pub fn local_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

// Two ends of one localhost connection: (client side, server side).
pub fn tcp_pair() -> (TcpStream, TcpStream) {
    let (listener, addr) = local_listener();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}
