// Line protocol: `<TYPE> <arg1> <arg2> ...`, one message per line.
//
// Parsing is lenient: any known type with any number of arguments yields a `Message`.
// Whether it is acceptable is decided by `Message::validate` against the type the
// receiver is waiting for.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use static_assertions::const_assert_eq;
use strum::{Display, EnumIter, EnumString, FromRepr};

use crate::coord::Point;
use crate::force::Force;
use crate::internal_error_message;
use crate::piece::PieceKind;


#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Color,
    Move,
    Promotion,
    Replay,
    Error,
}

// Wire codes are the ordinals; the order must never change.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, FromRepr)]
#[repr(u8)]
pub enum ProtocolError {
    InvalidMessage = 0,
    InvalidNbrArguments = 1,
    InvalidMove = 2,
    InvalidPromotion = 3,
    InvalidReplay = 4,
    InvalidColor = 5,
    // Local only: the connection hit end-of-stream. Never sent.
    Disconnected = 6,
}

const_assert_eq!(ProtocolError::InvalidMove as u8, 2);
const_assert_eq!(ProtocolError::Disconnected as u8, 6);

pub type ParseResult = Result<Message, ProtocolError>;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumString, Display)]
pub enum ReplayVote {
    Yes,
    No,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    kind: MessageKind,
    args: Vec<String>,
}

impl MessageKind {
    pub const fn arity(self) -> usize {
        match self {
            MessageKind::Color => 1,
            MessageKind::Move => 4,
            MessageKind::Promotion => 3,
            MessageKind::Replay => 1,
            MessageKind::Error => 1,
        }
    }
}

impl ProtocolError {
    pub fn code(self) -> u8 { self as u8 }
    pub fn from_code(code: u8) -> Option<Self> { Self::from_repr(code) }

    pub fn description(self) -> &'static str {
        match self {
            ProtocolError::InvalidMessage => "Invalid message",
            ProtocolError::InvalidNbrArguments => "Invalid number of arguments",
            ProtocolError::InvalidMove => "Invalid move",
            ProtocolError::InvalidPromotion => "Invalid promotion",
            ProtocolError::InvalidReplay => "Invalid replay",
            ProtocolError::InvalidColor => "Invalid color",
            ProtocolError::Disconnected => "Opponent disconnected",
        }
    }
}

impl ReplayVote {
    pub fn from_bool(yes: bool) -> Self { if yes { ReplayVote::Yes } else { ReplayVote::No } }
    pub fn is_yes(self) -> bool { self == ReplayVote::Yes }
}

fn parse_coord(s: &str) -> Option<i8> {
    let v = s.parse::<i8>().ok()?;
    Point::new(v, 0).is_in_board().then_some(v)
}

fn parse_point(x: &str, y: &str) -> Option<Point> {
    Some(Point::new(parse_coord(x)?, parse_coord(y)?))
}

impl Message {
    // Builds an outgoing message. Wrong arity is a programming error.
    #[track_caller]
    pub fn new(kind: MessageKind, args: Vec<String>) -> Self {
        assert_eq!(
            args.len(),
            kind.arity(),
            "{}",
            internal_error_message!("{kind} takes {} arguments", kind.arity())
        );
        Message { kind, args }
    }

    pub fn color(force: Force) -> Self { Self::new(MessageKind::Color, vec![force.to_string()]) }

    pub fn movement(from: Point, to: Point) -> Self {
        Self::new(
            MessageKind::Move,
            [from.x, from.y, to.x, to.y].iter().map(|v| v.to_string()).collect(),
        )
    }

    pub fn promotion(kind: PieceKind, pos: Point) -> Self {
        Self::new(
            MessageKind::Promotion,
            vec![kind.to_wire().to_string(), pos.x.to_string(), pos.y.to_string()],
        )
    }

    pub fn replay(vote: ReplayVote) -> Self {
        Self::new(MessageKind::Replay, vec![vote.to_string()])
    }

    pub fn error(error: ProtocolError) -> Self {
        Self::new(MessageKind::Error, vec![error.code().to_string()])
    }

    pub fn kind(&self) -> MessageKind { self.kind }
    pub fn args(&self) -> &[String] { &self.args }

    pub fn parse(line: &str) -> ParseResult {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut tokens = line.split(' ');
        let kind = tokens
            .next()
            .and_then(|t| MessageKind::from_str(t).ok())
            .ok_or(ProtocolError::InvalidMessage)?;
        Ok(Message { kind, args: tokens.map(str::to_owned).collect() })
    }

    // Checks, in order: type, argument count, then type-specific argument content.
    pub fn validate(&self, expected: MessageKind) -> Result<(), ProtocolError> {
        if self.kind != expected {
            return Err(ProtocolError::InvalidMessage);
        }
        if self.args.len() != self.kind.arity() {
            return Err(ProtocolError::InvalidNbrArguments);
        }
        match self.kind {
            MessageKind::Promotion => self.decode_promotion().map(|_| ()),
            MessageKind::Replay => self.decode_replay().map(|_| ()),
            MessageKind::Move => self.decode_move().map(|_| ()),
            MessageKind::Color => self.decode_color().map(|_| ()),
            MessageKind::Error => self.decode_error().map(|_| ()),
        }
    }

    pub fn as_move(&self) -> Option<(Point, Point)> {
        self.is_valid(MessageKind::Move).then(|| self.decode_move().ok()).flatten()
    }
    pub fn as_promotion(&self) -> Option<(PieceKind, Point)> {
        self.is_valid(MessageKind::Promotion).then(|| self.decode_promotion().ok()).flatten()
    }
    pub fn as_replay(&self) -> Option<ReplayVote> {
        self.is_valid(MessageKind::Replay).then(|| self.decode_replay().ok()).flatten()
    }
    pub fn as_color(&self) -> Option<Force> {
        self.is_valid(MessageKind::Color).then(|| self.decode_color().ok()).flatten()
    }
    pub fn as_error(&self) -> Option<ProtocolError> {
        self.is_valid(MessageKind::Error).then(|| self.decode_error().ok()).flatten()
    }

    fn is_valid(&self, kind: MessageKind) -> bool { self.validate(kind).is_ok() }

    fn decode_move(&self) -> Result<(Point, Point), ProtocolError> {
        let err = ProtocolError::InvalidMove;
        let (fx, fy, tx, ty) = self.args.iter().collect_tuple().ok_or(err)?;
        let from = parse_point(fx, fy).ok_or(err)?;
        let to = parse_point(tx, ty).ok_or(err)?;
        if from == to {
            return Err(err);
        }
        Ok((from, to))
    }

    fn decode_promotion(&self) -> Result<(PieceKind, Point), ProtocolError> {
        let err = ProtocolError::InvalidPromotion;
        let (kind, x, y) = self.args.iter().collect_tuple().ok_or(err)?;
        let kind = kind
            .parse::<u8>()
            .ok()
            .and_then(PieceKind::from_wire)
            .filter(|k| k.is_promotion_target())
            .ok_or(err)?;
        let pos = parse_point(x, y).ok_or(err)?;
        Ok((kind, pos))
    }

    fn decode_replay(&self) -> Result<ReplayVote, ProtocolError> {
        let [vote] = self.args.as_slice() else {
            return Err(ProtocolError::InvalidReplay);
        };
        ReplayVote::from_str(vote).map_err(|_| ProtocolError::InvalidReplay)
    }

    fn decode_color(&self) -> Result<Force, ProtocolError> {
        let [color] = self.args.as_slice() else {
            return Err(ProtocolError::InvalidColor);
        };
        Force::from_str(color).map_err(|_| ProtocolError::InvalidColor)
    }

    fn decode_error(&self) -> Result<ProtocolError, ProtocolError> {
        let [code] = self.args.as_slice() else {
            return Err(ProtocolError::InvalidMessage);
        };
        code.parse::<u8>()
            .ok()
            .and_then(ProtocolError::from_code)
            .ok_or(ProtocolError::InvalidMessage)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
