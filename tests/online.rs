mod common;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use common::*;
use netchess::client::ClientGame;
use netchess::controller::ChessController;
use netchess::force::Force;
use netchess::matchmaking::GamePool;
use netchess::message::Message;
use netchess::peer::{PeerHandler, PeerOptions};
use netchess::session::SessionEnd;
use netchess::test_util::{RecordingView, parse_move_notation, tcp_pair};
use netchess::view::{CHECKMATE, OPPONENT_DISCONNECTED};
use pretty_assertions::assert_eq;


const WAIT: Duration = Duration::from_secs(10);

fn move_line(notation: &str) -> String {
    let (from, to, _) = parse_move_notation(notation).unwrap();
    Message::movement(from, to).to_string()
}

fn promotion_line(notation: &str) -> Option<String> {
    let (_, to, promotion) = parse_move_notation(notation).unwrap();
    promotion.map(|kind| Message::promotion(kind, to).to_string())
}

fn join_pool(pool: &GamePool) -> (RawPeer, Option<JoinHandle<SessionEnd>>) {
    let (client, server) = tcp_pair();
    let session = pool.handle_incoming_player(server).unwrap();
    (RawPeer::new(client), session)
}

// Connects two raw players and checks the color assignment.
fn start_session(pool: &GamePool) -> (RawPeer, RawPeer, JoinHandle<SessionEnd>) {
    let (mut white, session) = join_pool(pool);
    assert!(session.is_none());
    let (mut black, session) = join_pool(pool);
    white.expect("COLOR WHITE");
    black.expect("COLOR BLACK");
    (white, black, session.unwrap())
}

// Plays `log` from the start, alternating sides, and checks every relay.
fn play(white: &mut RawPeer, black: &mut RawPeer, log: &str) {
    for (index, notation) in log.split_whitespace().enumerate() {
        let (mover, other) =
            if index % 2 == 0 { (&mut *white, &mut *black) } else { (&mut *black, &mut *white) };
        mover.send(&move_line(notation));
        if let Some(line) = promotion_line(notation) {
            mover.send(&line);
        }
        other.expect(&move_line(notation));
        if let Some(line) = promotion_line(notation) {
            other.expect(&line);
        }
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn players_are_paired_in_arrival_order() {
    let pool = GamePool::new(PeerOptions::default());
    let (mut a, a_session) = join_pool(&pool);
    assert!(a_session.is_none());
    assert_eq!(pool.waiting(), 1);
    let (mut b, ab_session) = join_pool(&pool);
    let (mut c, c_session) = join_pool(&pool);
    let (mut d, cd_session) = join_pool(&pool);
    assert!(c_session.is_none());
    assert_eq!(pool.waiting(), 0);
    a.expect("COLOR WHITE");
    b.expect("COLOR BLACK");
    c.expect("COLOR WHITE");
    d.expect("COLOR BLACK");

    c.send("MOVE 3 1 3 3");
    d.expect("MOVE 3 1 3 3");
    a.send("MOVE 4 1 4 3");
    b.expect("MOVE 4 1 4 3");

    drop(b);
    a.expect_eof();
    assert_eq!(ab_session.unwrap().join().unwrap(), SessionEnd::Disconnected(Force::Black));

    d.send("MOVE 3 6 3 4");
    c.expect("MOVE 3 6 3 4");
    drop(c);
    d.expect_eof();
    assert_eq!(cd_session.unwrap().join().unwrap(), SessionEnd::Disconnected(Force::White));
}

#[test]
fn player_leaving_the_queue_is_forgotten() {
    let pool = GamePool::new(PeerOptions::default());
    let (a, _) = join_pool(&pool);
    drop(a);
    assert!(wait_until(|| pool.waiting() == 0));
    let (mut white, black, session) = start_session(&pool);
    drop(black);
    white.expect_eof();
    assert_eq!(session.join().unwrap(), SessionEnd::Disconnected(Force::Black));
}

#[test]
fn illegal_moves_are_rejected() {
    let pool = GamePool::new(PeerOptions::default());
    let (mut white, mut black, session) = start_session(&pool);
    white.send("MOVE 4 1 4 4");
    white.expect("ERROR 2");
    white.send("MOVE 4 6 4 4");
    white.expect("ERROR 2");
    white.send("MOVE 4 1 4");
    white.expect("ERROR 1");
    white.send("REPLAY Yes");
    white.expect("ERROR 0");
    play(&mut white, &mut black, "e2e4");
    black.send("MOVE 4 6 4 3");
    black.expect("ERROR 2");
    drop(black);
    white.expect_eof();
    assert_eq!(session.join().unwrap(), SessionEnd::Disconnected(Force::Black));
}

#[test]
fn move_out_of_turn_is_rejected() {
    let pool = GamePool::new(PeerOptions::default());
    let (mut white, mut black, session) = start_session(&pool);
    black.send("MOVE 4 6 4 4");
    black.send("MOVE 4 6");
    // Both lines must be queued on the server before white moves.
    thread::sleep(Duration::from_millis(200));
    white.send("MOVE 3 1 3 3");
    black.expect("ERROR 2");
    black.expect("ERROR 1");
    black.expect("MOVE 3 1 3 3");
    black.send("MOVE 4 6 4 4");
    white.expect("MOVE 4 6 4 4");
    drop(white);
    black.expect_eof();
    assert_eq!(session.join().unwrap(), SessionEnd::Disconnected(Force::White));
}

#[test]
fn promotion_is_relayed_after_the_move() {
    let pool = GamePool::new(PeerOptions::default());
    let (mut white, mut black, session) = start_session(&pool);
    play(&mut white, &mut black, "a2a4 b7b5 a4b5 a7a6 b5a6 c8b7 a6b7 b8c6");
    white.send("MOVE 1 6 0 7");
    white.send("PROMOTION 4 1 7");
    white.expect("ERROR 3");
    white.send("PROMOTION 5 0 7");
    white.expect("ERROR 3");
    white.send("PROMOTION 4 0 7");
    black.expect("MOVE 1 6 0 7");
    black.expect("PROMOTION 4 0 7");
    drop(black);
    white.expect_eof();
    assert_eq!(session.join().unwrap(), SessionEnd::Disconnected(Force::Black));
}

#[test]
fn no_rematch_ends_session() {
    let pool = GamePool::new(PeerOptions::default());
    let (mut white, mut black, session) = start_session(&pool);
    play(&mut white, &mut black, "f2f3 e7e5 g2g4 d8h4");
    white.send("REPLAY Yes");
    black.send("REPLAY No");
    white.expect("REPLAY No");
    black.expect("REPLAY Yes");
    white.expect_eof();
    black.expect_eof();
    assert_eq!(session.join().unwrap(), SessionEnd::Finished);
}

#[test]
fn rematch_keeps_colors() {
    let pool = GamePool::new(PeerOptions::default());
    let (mut white, mut black, session) = start_session(&pool);
    play(&mut white, &mut black, "f2f3 e7e5 g2g4 d8h4");
    white.send("MOVE 4 1 4 3");
    white.expect("ERROR 0");
    white.send("REPLAY Yes");
    black.send("REPLAY Yes");
    white.expect("REPLAY Yes");
    black.expect("REPLAY Yes");
    play(&mut white, &mut black, "e2e4 e7e5");
    drop(white);
    black.expect_eof();
    assert_eq!(session.join().unwrap(), SessionEnd::Disconnected(Force::White));
}

#[test]
fn idle_player_times_out() {
    let pool = GamePool::new(PeerOptions { idle_timeout: Some(Duration::from_millis(200)) });
    let (mut white, mut black, session) = start_session(&pool);
    white.expect_eof();
    black.expect_eof();
    assert_eq!(session.join().unwrap(), SessionEnd::TimedOut(Force::White));
}

fn client_and_server(view: &Arc<RecordingView>) -> (ClientGame, RawPeer) {
    let (client, server) = tcp_pair();
    let peer = PeerHandler::new(client, PeerOptions::default()).unwrap();
    (ClientGame::new(peer, view.clone()), RawPeer::new(server))
}

#[test]
fn client_validates_locally() {
    let view = Arc::new(RecordingView::new());
    let (client, mut server) = client_and_server(&view);
    server.send("COLOR WHITE");
    client.start_game();
    assert_eq!(client.my_force(), Some(Force::White));
    assert_eq!(view.count_message("WHITE to move"), 1);

    assert!(!client.make_move(4, 1, 4, 4));
    assert!(client.make_move(4, 1, 4, 3));
    assert!(!client.make_move(4, 6, 4, 4));
    server.expect("MOVE 4 1 4 3");
    assert!(view.wait_for_message("BLACK to move", 1, WAIT));

    server.send("MOVE 4 6 4 4");
    assert!(view.wait_for_message("WHITE to move", 2, WAIT));
    assert!(!client.make_move(4, 3, 4, 4));
    assert!(client.make_move(6, 0, 5, 2));
    server.expect("MOVE 6 0 5 2");
    let game = client.game();
    assert!(game.board().get_piece(p("e5")).is(piece!(Black Pawn)));
    assert!(game.board().get_piece(p("f3")).is(piece!(White Knight)));
}

#[test]
fn client_sends_promotion_after_move() {
    let view = Arc::new(RecordingView::with_answers(&["Knight"]));
    let (client, mut server) = client_and_server(&view);
    server.send("COLOR WHITE");
    client.start_game();
    let log = "a2a4 b7b5 a4b5 a7a6 b5a6 c8b7 a6b7 b8c6".split_whitespace().collect::<Vec<_>>();
    for (turn, pair) in log.chunks(2).enumerate() {
        let (from, to, _) = parse_move_notation(pair[0]).unwrap();
        assert!(client.make_move(from.x, from.y, to.x, to.y));
        server.expect(&move_line(pair[0]));
        server.send(&move_line(pair[1]));
        assert!(view.wait_for_message("WHITE to move", turn + 2, WAIT));
    }
    assert!(client.make_move(1, 6, 0, 7));
    server.expect("MOVE 1 6 0 7");
    server.expect("PROMOTION 1 0 7");
    assert!(client.game().board().get_piece(p("a8")).is(piece!(White Knight)));
}

#[test]
fn client_checkmate_and_declined_rematch() {
    let view = Arc::new(RecordingView::with_answers(&["No"]));
    let (client, mut server) = client_and_server(&view);
    server.send("COLOR BLACK");
    client.start_game();
    assert!(!client.make_move(4, 6, 4, 4));
    server.send("MOVE 5 1 5 2");
    assert!(view.wait_for_message("BLACK to move", 1, WAIT));
    assert!(client.make_move(4, 6, 4, 4));
    server.expect("MOVE 4 6 4 4");
    server.send("MOVE 6 1 6 3");
    assert!(view.wait_for_message("BLACK to move", 2, WAIT));
    assert!(client.make_move(3, 7, 7, 3));
    server.expect("MOVE 3 7 7 3");
    server.expect("REPLAY No");
    server.send("REPLAY Yes");
    server.expect_eof();
    assert_eq!(view.count_message(CHECKMATE), 1);
    assert_eq!(view.count_message("BLACK wins"), 1);
    assert!(!client.is_connected());
}

#[test]
fn client_reports_lost_connection() {
    let view = Arc::new(RecordingView::new());
    let (client, mut server) = client_and_server(&view);
    server.send("COLOR BLACK");
    client.start_game();
    assert_eq!(client.my_force(), Some(Force::Black));
    drop(server);
    assert!(view.wait_for_message(OPPONENT_DISCONNECTED, 1, WAIT));
    assert!(!client.is_connected());
    assert!(!client.make_move(4, 6, 4, 4));
}

#[test]
fn two_clients_through_the_server() {
    let pool = GamePool::new(PeerOptions::default());
    let white_view = Arc::new(RecordingView::with_answers(&["Yes"]));
    let black_view = Arc::new(RecordingView::with_answers(&["No"]));
    let connect = |view: &Arc<RecordingView>| {
        let (client, server) = tcp_pair();
        let session = pool.handle_incoming_player(server).unwrap();
        let peer = PeerHandler::new(client, PeerOptions::default()).unwrap();
        (ClientGame::new(peer, view.clone()), session)
    };
    let (white, _) = connect(&white_view);
    let (black, session) = connect(&black_view);
    white.start_game();
    black.start_game();
    assert_eq!(white.my_force(), Some(Force::White));
    assert_eq!(black.my_force(), Some(Force::Black));

    assert!(white.make_move(5, 1, 5, 2));
    assert!(black_view.wait_for_message("BLACK to move", 1, WAIT));
    assert!(black.make_move(4, 6, 4, 4));
    assert!(white_view.wait_for_message("WHITE to move", 2, WAIT));
    assert!(white.make_move(6, 1, 6, 3));
    assert!(black_view.wait_for_message("BLACK to move", 2, WAIT));
    assert!(black.make_move(3, 7, 7, 3));

    assert!(white_view.wait_for_message(CHECKMATE, 1, WAIT));
    assert_eq!(session.unwrap().join().unwrap(), SessionEnd::Finished);
    assert!(wait_until(|| !white.is_connected() && !black.is_connected()));
    assert!(white.game().is_checkmate());
    assert!(black.game().is_checkmate());
}
