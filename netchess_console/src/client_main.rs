use std::net::TcpStream;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use log::info;
use netchess::client::ClientGame;
use netchess::controller::{ChessController, LocalGame};
use netchess::coord::Point;
use netchess::peer::{PeerHandler, PeerOptions};
use strum::{EnumIter, EnumString, IntoEnumIterator};

use crate::console_view::ConsoleView;


pub struct ClientConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Copy, Debug, EnumIter, EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
enum ConsoleCommand {
    Board,
    Help,
    Quit,
}

enum Input {
    Command(ConsoleCommand),
    Move(Point, Point),
}

// Accepts "e2 e4", "e2-e4" or "e2e4".
fn parse_move(line: &str) -> Option<(Point, Point)> {
    let squares: String = line.chars().filter(|ch| ch.is_ascii_alphanumeric()).collect();
    if squares.len() != 4 {
        return None;
    }
    Some((Point::try_from_algebraic(&squares[0..2])?, Point::try_from_algebraic(&squares[2..4])?))
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim().to_ascii_lowercase();
    if let Ok(command) = ConsoleCommand::from_str(&line) {
        return Some(Input::Command(command));
    }
    parse_move(&line).map(|(from, to)| Input::Move(from, to))
}

fn print_help() {
    let commands: Vec<String> = ConsoleCommand::iter().map(|c| c.to_string()).collect();
    println!("Enter moves like \"e2 e4\". Commands: {}", commands.join(", "));
}

// Feeds stdin into `controller` until the user quits, stdin closes or `keep_going` fails.
fn command_loop(
    view: &ConsoleView, controller: &dyn ChessController, keep_going: impl Fn() -> bool,
) {
    print_help();
    while keep_going() {
        let Some(line) = view.next_command() else {
            return;
        };
        match parse_input(&line) {
            Some(Input::Command(ConsoleCommand::Quit)) => return,
            Some(Input::Command(ConsoleCommand::Help)) => print_help(),
            Some(Input::Command(ConsoleCommand::Board)) => view.print_board(),
            Some(Input::Move(from, to)) => {
                if !controller.make_move(from.x, from.y, to.x, to.y) {
                    let (from, to) = (from.to_algebraic(), to.to_algebraic());
                    println!("Move {from}-{to} is not possible now");
                }
            }
            None if line.trim().is_empty() => {}
            None => println!("Cannot parse {line:?}"),
        }
    }
}

pub fn run(config: ClientConfig) -> anyhow::Result<()> {
    let stream = TcpStream::connect((config.host.as_str(), config.port))
        .with_context(|| format!("Cannot connect to {}:{}", config.host, config.port))?;
    let peer = PeerHandler::new(stream, PeerOptions::default())?;
    info!("Connected to {}, waiting for an opponent", peer.name());
    let view = Arc::new(ConsoleView::new());
    let client = ClientGame::new(peer, view.clone());
    client.start_game();
    command_loop(&view, &client, || client.is_connected());
    Ok(())
}

pub fn run_local() -> anyhow::Result<()> {
    let view = Arc::new(ConsoleView::new());
    let game = LocalGame::new(view.clone());
    game.start_game();
    command_loop(&view, &game, || true);
    Ok(())
}
