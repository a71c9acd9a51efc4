// Each integration test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use itertools::Itertools;
use netchess::board::Board;
use netchess::coord::{BOARD_SIZE, Point};
use netchess::force::Force;
use netchess::piece::{PieceKind, PieceOnBoard};


#[derive(Clone, Copy, Debug)]
pub struct PieceMatcher {
    pub kind: PieceKind,
    pub force: Force,
}

pub trait PieceIs {
    fn is(self, matcher: PieceMatcher) -> bool;
}

impl PieceIs for Option<PieceOnBoard> {
    fn is(self, matcher: PieceMatcher) -> bool {
        if let Some(piece) = self {
            piece.kind == matcher.kind && piece.force == matcher.force
        } else {
            false
        }
    }
}

#[macro_export]
macro_rules! piece {
    ($force:ident $kind:ident) => {
        common::PieceMatcher {
            force: netchess::force::Force::$force,
            kind: netchess::piece::PieceKind::$kind,
        }
    };
}

pub fn p(algebraic: &str) -> Point { Point::from_algebraic(algebraic) }

fn piece_from_ascii(ch: char) -> Option<(PieceKind, Force)> {
    let force = if ch.is_ascii_uppercase() { Force::White } else { Force::Black };
    Some((PieceKind::from_algebraic_char(ch)?, force))
}

// Builds a position from a diagram with rank 8 on top. Upper case is white, lower case
// is black, '.' is empty. Castling is not wired; use `Board::allow_castling`.
pub fn parse_board(board_str: &str) -> Board {
    let rows = board_str
        .split('\n')
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.split_ascii_whitespace().collect_vec())
        .collect_vec();
    assert_eq!(rows.len(), BOARD_SIZE as usize);
    let mut board = Board::empty();
    for (y, row) in rows.iter().rev().enumerate() {
        assert_eq!(row.len(), BOARD_SIZE as usize);
        for (x, cell) in row.iter().enumerate() {
            let ch = cell.chars().exactly_one().unwrap();
            if ch == '.' {
                continue;
            }
            let (kind, force) = piece_from_ascii(ch).unwrap_or_else(|| panic!("Bad piece {ch}"));
            board.place(kind, force, Point::new(x as i8, y as i8));
        }
    }
    board
}

// Raw end of a connection, speaking the line protocol by hand.
pub struct RawPeer {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl RawPeer {
    pub fn new(stream: TcpStream) -> Self {
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        RawPeer { reader, writer: stream }
    }

    pub fn send(&mut self, line: &str) {
        self.writer.write_all(format!("{line}\n").as_bytes()).unwrap();
        self.writer.flush().unwrap();
    }

    // Next line without the terminator, or `None` on end of stream.
    pub fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end().to_owned()),
            Err(err) if err.kind() == std::io::ErrorKind::ConnectionReset => None,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn expect(&mut self, line: &str) { assert_eq!(self.recv().as_deref(), Some(line)); }

    pub fn expect_eof(&mut self) { assert_eq!(self.recv(), None); }
}
