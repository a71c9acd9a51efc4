#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod board;
pub mod client;
pub mod controller;
pub mod coord;
pub mod direction;
pub mod error;
pub mod force;
pub mod game;
pub mod grid;
pub mod matchmaking;
pub mod message;
pub mod movement;
pub mod peer;
pub mod piece;
pub mod session;
pub mod test_util;
pub mod transport;
pub mod view;

pub const DEFAULT_PORT: u16 = 6343;
