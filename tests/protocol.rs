mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::*;
use netchess::coord::Point;
use netchess::force::Force;
use netchess::message::{Message, MessageKind, ProtocolError, ReplayVote};
use netchess::peer::{PeerError, PeerHandler, PeerOptions, retry_until_valid};
use netchess::piece::PieceKind;
use netchess::test_util::tcp_pair;
use pretty_assertions::assert_eq;
use strum::IntoEnumIterator;


fn connect(options: PeerOptions) -> (RawPeer, PeerHandler) {
    let (client, server) = tcp_pair();
    (RawPeer::new(client), PeerHandler::new(server, options).unwrap())
}

// Sends `line` and checks which error the handler reports and sends back.
fn check_rejected(line: &str, kind: MessageKind, expected: ProtocolError) {
    let (mut client, server) = connect(PeerOptions::default());
    client.send(line);
    assert_eq!(server.await_message(kind), Err(PeerError::Protocol(expected)), "{line}");
    client.expect(&format!("ERROR {}", expected.code()));
}

#[test]
fn valid_messages() {
    let (mut client, server) = connect(PeerOptions::default());
    client.send("MOVE 4 1 4 3");
    assert_eq!(server.await_move(), Ok((Point::new(4, 1), Point::new(4, 3))));
    client.send("PROMOTION 1 7 0");
    assert_eq!(server.await_promotion(), Ok((PieceKind::Knight, Point::new(7, 0))));
    client.send("REPLAY No");
    assert_eq!(server.await_replay(), Ok(ReplayVote::No));
    client.send("COLOR BLACK");
    assert_eq!(server.await_color(), Ok(Force::Black));
}

#[test]
fn invalid_content() {
    check_rejected("MOVE 0 0 0 0", MessageKind::Move, ProtocolError::InvalidMove);
    check_rejected("MOVE 9 0 0 0", MessageKind::Move, ProtocolError::InvalidMove);
    check_rejected("MOVE a b c d", MessageKind::Move, ProtocolError::InvalidMove);
    check_rejected("REPLAY Maybe", MessageKind::Replay, ProtocolError::InvalidReplay);
    check_rejected("PROMOTION 0 0 0", MessageKind::Promotion, ProtocolError::InvalidPromotion);
    check_rejected("PROMOTION 5 0 7", MessageKind::Promotion, ProtocolError::InvalidPromotion);
    check_rejected("COLOR BLUE", MessageKind::Color, ProtocolError::InvalidColor);
}

#[test]
fn invalid_shape() {
    check_rejected("REPLAY Yes", MessageKind::Move, ProtocolError::InvalidMessage);
    check_rejected("MOVE 1 2 3", MessageKind::Move, ProtocolError::InvalidNbrArguments);
    check_rejected("MOVE 1 2 3 4 5", MessageKind::Move, ProtocolError::InvalidNbrArguments);
    check_rejected("REPLAY", MessageKind::Replay, ProtocolError::InvalidNbrArguments);
    check_rejected("HELLO", MessageKind::Move, ProtocolError::InvalidMessage);
    check_rejected("HELLO", MessageKind::Replay, ProtocolError::InvalidMessage);
    check_rejected("ERROR 9", MessageKind::Move, ProtocolError::InvalidMessage);
}

#[test]
fn incoming_error_is_not_answered() {
    let (mut client, server) = connect(PeerOptions::default());
    client.send("ERROR 2");
    assert_eq!(
        server.await_message(MessageKind::Move),
        Err(PeerError::Rejected(ProtocolError::InvalidMove))
    );
    server.send(&Message::color(Force::White)).unwrap();
    client.expect("COLOR WHITE");
}

#[test]
fn retry_after_invalid_message() {
    let (mut client, server) = connect(PeerOptions::default());
    client.send("HELLO");
    client.send("MOVE 4 1 4 9");
    client.send("MOVE 4 1 4 3");
    assert_eq!(
        retry_until_valid(|| server.await_move()),
        Ok((Point::new(4, 1), Point::new(4, 3)))
    );
    client.expect("ERROR 0");
    client.expect("ERROR 2");
}

#[test]
fn disconnect_is_sticky() {
    let (client, server) = connect(PeerOptions::default());
    drop(client);
    assert_eq!(server.await_message(MessageKind::Move), Err(PeerError::Disconnected));
    assert_eq!(server.await_message(MessageKind::Replay), Err(PeerError::Disconnected));
    assert!(server.is_disconnected());
    assert_eq!(retry_until_valid(|| server.await_move()), Err(PeerError::Disconnected));
}

#[test]
fn pending_messages_are_rejected_without_waiting() {
    let (mut client, server) = connect(PeerOptions::default());
    assert_eq!(server.reject_pending(), Ok(()));
    client.send("MOVE 4 6 4 4");
    client.send("MOVE 4 6");
    client.send("REPLAY Yes");
    client.send("ERROR 2");
    client.send("HELLO");
    thread::sleep(Duration::from_millis(200));
    assert_eq!(server.reject_pending(), Ok(()));
    client.expect("ERROR 2");
    client.expect("ERROR 1");
    client.expect("ERROR 0");
    client.expect("ERROR 0");

    client.send("MOVE 4 1 4 3");
    assert_eq!(server.await_move(), Ok((Point::new(4, 1), Point::new(4, 3))));

    drop(client);
    let deadline = Instant::now() + Duration::from_secs(10);
    let err = loop {
        match server.reject_pending() {
            Ok(()) => {
                assert!(Instant::now() < deadline);
                thread::sleep(Duration::from_millis(10));
            }
            Err(err) => break err,
        }
    };
    assert_eq!(err, PeerError::Disconnected);
}

#[test]
fn idle_timeout() {
    let options = PeerOptions { idle_timeout: Some(Duration::from_millis(100)) };
    let (mut client, server) = connect(options);
    assert_eq!(server.await_message(MessageKind::Move), Err(PeerError::TimedOut));
    assert!(!server.is_disconnected());
    client.send("MOVE 6 0 5 2");
    assert_eq!(server.await_move(), Ok((Point::new(6, 0), Point::new(5, 2))));
}

#[test]
fn deferred_messages_follow_the_move() {
    let (mut client, server) = connect(PeerOptions::default());
    server.defer(Message::promotion(PieceKind::Queen, Point::new(0, 7)));
    server.send(&Message::color(Force::Black)).unwrap();
    server.send_with_deferred(&Message::movement(Point::new(1, 6), Point::new(0, 7))).unwrap();
    server.send_with_deferred(&Message::replay(ReplayVote::Yes)).unwrap();
    client.expect("COLOR BLACK");
    client.expect("MOVE 1 6 0 7");
    client.expect("PROMOTION 4 0 7");
    client.expect("REPLAY Yes");
}

#[test]
fn close_is_seen_as_end_of_stream() {
    let (mut client, server) = connect(PeerOptions::default());
    server.close();
    client.expect_eof();
    assert_eq!(server.await_message(MessageKind::Move), Err(PeerError::Disconnected));
}

#[test]
fn outgoing_messages_round_trip() {
    let messages = [
        Message::color(Force::White),
        Message::movement(Point::new(0, 1), Point::new(7, 6)),
        Message::promotion(PieceKind::Bishop, Point::new(3, 0)),
        Message::replay(ReplayVote::No),
        Message::error(ProtocolError::InvalidColor),
    ];
    for message in messages {
        let parsed = Message::parse(&message.to_string()).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.validate(message.kind()), Ok(()));
        assert_eq!(parsed.args().len(), parsed.kind().arity());
    }
    for kind in MessageKind::iter() {
        assert!(kind.arity() >= 1);
    }
}
