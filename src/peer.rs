// One player's connection.
//
// A dedicated reader thread turns incoming lines into `PeerEvent`s on a channel; the
// owner of the handler pulls them out one at a time with `await_message`. Sends go
// straight to the socket under a writer lock and may come from any thread.

use std::collections::VecDeque;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::coord::Point;
use crate::force::Force;
use crate::internal_error_message;
use crate::message::{Message, MessageKind, ParseResult, ProtocolError, ReplayVote};
use crate::piece::PieceKind;
use crate::transport::{self, TcpLineReader, TcpLineWriter};


#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PeerOptions {
    // How long `await_message` may wait for the peer. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PeerError {
    // The peer sent something unacceptable. An `ERROR` reply has been sent already.
    Protocol(ProtocolError),
    // The peer answered our last message with `ERROR`.
    Rejected(ProtocolError),
    Disconnected,
    TimedOut,
}

#[derive(Debug)]
enum PeerEvent {
    Received(ParseResult),
    Disconnected,
}

pub struct PeerHandler {
    name: String,
    socket: TcpStream,
    writer: Mutex<TcpLineWriter>,
    deferred: Mutex<VecDeque<Message>>,
    events: Mutex<Receiver<PeerEvent>>,
    disconnected: Arc<AtomicBool>,
    options: PeerOptions,
}

impl PeerError {
    pub fn is_fatal(self) -> bool { matches!(self, PeerError::Disconnected | PeerError::TimedOut) }
}

// Repeats `await_fn` until it yields a value or fails fatally. Invalid messages have
// already been answered with `ERROR` by the time they show up here.
pub fn retry_until_valid<T>(
    mut await_fn: impl FnMut() -> Result<T, PeerError>,
) -> Result<T, PeerError> {
    loop {
        match await_fn() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => debug!("Still waiting after {err:?}"),
        }
    }
}

fn run_reader(
    name: String, mut reader: TcpLineReader, tx: mpsc::Sender<PeerEvent>,
    disconnected: Arc<AtomicBool>,
) {
    loop {
        match reader.receive() {
            Ok(Some(result)) => {
                if tx.send(PeerEvent::Received(result)).is_err() {
                    break;
                }
            }
            Ok(None) => {
                info!("{name} closed the connection");
                break;
            }
            Err(err) => {
                debug!("Reading from {name} failed: {err}");
                break;
            }
        }
    }
    disconnected.store(true, Ordering::SeqCst);
    let _ = tx.send(PeerEvent::Disconnected);
}

impl PeerHandler {
    pub fn new(stream: TcpStream, options: PeerOptions) -> std::io::Result<Self> {
        let name = stream
            .peer_addr()
            .map_or_else(|_| "<unknown peer>".to_owned(), |addr| addr.to_string());
        let socket = stream.try_clone()?;
        let (reader, writer) = transport::split(stream)?;
        let (tx, rx) = mpsc::channel();
        let disconnected = Arc::new(AtomicBool::new(false));
        let reader_name = name.clone();
        let reader_disconnected = Arc::clone(&disconnected);
        thread::Builder::new()
            .name(format!("reader {name}"))
            .spawn(move || run_reader(reader_name, reader, tx, reader_disconnected))?;
        Ok(PeerHandler {
            name,
            socket,
            writer: Mutex::new(writer),
            deferred: Mutex::new(VecDeque::new()),
            events: Mutex::new(rx),
            disconnected,
            options,
        })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn is_disconnected(&self) -> bool { self.disconnected.load(Ordering::SeqCst) }

    pub fn send(&self, message: &Message) -> Result<(), PeerError> {
        let mut writer = self.writer.lock().unwrap();
        self.send_locked(&mut writer, message)
    }

    pub fn send_error(&self, error: ProtocolError) -> Result<(), PeerError> {
        assert_ne!(
            error,
            ProtocolError::Disconnected,
            "{}",
            internal_error_message!("DISCONNECTED is local only")
        );
        self.send(&Message::error(error))
    }

    // Queues a message to go out right after the next `send_with_deferred`.
    pub fn defer(&self, message: Message) { self.deferred.lock().unwrap().push_back(message); }

    // Sends `message` followed by everything deferred, with no other send in between.
    pub fn send_with_deferred(&self, message: &Message) -> Result<(), PeerError> {
        let mut writer = self.writer.lock().unwrap();
        self.send_locked(&mut writer, message)?;
        let deferred: Vec<_> = self.deferred.lock().unwrap().drain(..).collect();
        for m in &deferred {
            self.send_locked(&mut writer, m)?;
        }
        Ok(())
    }

    fn send_locked(&self, writer: &mut TcpLineWriter, message: &Message) -> Result<(), PeerError> {
        writer.send(message).map_err(|err| {
            warn!("Cannot send {message} to {}: {err}", self.name);
            PeerError::Disconnected
        })
    }

    // Blocks until the peer sends something, then checks it against `kind`. Invalid
    // messages are answered with `ERROR` on the spot; the caller decides whether to
    // wait again.
    pub fn await_message(&self, kind: MessageKind) -> Result<Message, PeerError> {
        let events = self.events.lock().unwrap();
        let event = match self.options.idle_timeout {
            None => events.recv().map_err(|_| PeerError::Disconnected)?,
            Some(timeout) => match events.recv_timeout(timeout) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("{} did not send {kind} in {timeout:?}", self.name);
                    return Err(PeerError::TimedOut);
                }
                Err(RecvTimeoutError::Disconnected) => return Err(PeerError::Disconnected),
            },
        };
        let message = match event {
            PeerEvent::Disconnected => return Err(PeerError::Disconnected),
            PeerEvent::Received(Err(err)) => return Err(self.reject(err)),
            PeerEvent::Received(Ok(message)) => message,
        };
        if message.kind() == MessageKind::Error && kind != MessageKind::Error {
            return match message.as_error() {
                Some(code) => {
                    warn!("{} rejected our message: {}", self.name, code.description());
                    Err(PeerError::Rejected(code))
                }
                None => Err(self.reject(ProtocolError::InvalidMessage)),
            };
        }
        match message.validate(kind) {
            Ok(()) => Ok(message),
            Err(err) => Err(self.reject(err)),
        }
    }

    // Answers everything the peer has sent so far without waiting for more, for use while
    // it is not the peer's turn. A well-formed `MOVE` gets `ERROR INVALID_MOVE`, anything
    // else the rejection `await_message` would give it. Incoming `ERROR`s are only logged.
    pub fn reject_pending(&self) -> Result<(), PeerError> {
        let events = self.events.lock().unwrap();
        loop {
            let event = match events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(PeerError::Disconnected),
            };
            let error = match event {
                PeerEvent::Disconnected => return Err(PeerError::Disconnected),
                PeerEvent::Received(Err(err)) => err,
                PeerEvent::Received(Ok(message)) if message.kind() == MessageKind::Error => {
                    warn!("{} sent {message} out of turn", self.name);
                    continue;
                }
                PeerEvent::Received(Ok(message)) => match message.validate(MessageKind::Move) {
                    Ok(()) => ProtocolError::InvalidMove,
                    Err(err) => err,
                },
            };
            self.reject(error);
        }
    }

    fn reject(&self, error: ProtocolError) -> PeerError {
        warn!("Invalid message from {}: {}", self.name, error.description());
        // A failed reply surfaces as a disconnect on the next await.
        let _ = self.send_error(error);
        PeerError::Protocol(error)
    }

    pub fn await_move(&self) -> Result<(Point, Point), PeerError> {
        let message = self.await_message(MessageKind::Move)?;
        message.as_move().ok_or(PeerError::Protocol(ProtocolError::InvalidMove))
    }

    pub fn await_promotion(&self) -> Result<(PieceKind, Point), PeerError> {
        let message = self.await_message(MessageKind::Promotion)?;
        message.as_promotion().ok_or(PeerError::Protocol(ProtocolError::InvalidPromotion))
    }

    pub fn await_replay(&self) -> Result<ReplayVote, PeerError> {
        let message = self.await_message(MessageKind::Replay)?;
        message.as_replay().ok_or(PeerError::Protocol(ProtocolError::InvalidReplay))
    }

    pub fn await_color(&self) -> Result<Force, PeerError> {
        let message = self.await_message(MessageKind::Color)?;
        message.as_color().ok_or(PeerError::Protocol(ProtocolError::InvalidColor))
    }

    // Shuts the socket down. The reader thread sees end of stream and exits, and the
    // remote side observes a disconnect.
    pub fn close(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        if let Err(err) = transport::shutdown(&self.socket) {
            debug!("Closing {} failed: {err}", self.name);
        }
    }
}

impl Drop for PeerHandler {
    fn drop(&mut self) { self.close(); }
}
