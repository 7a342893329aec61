//! Client side of the blackjack rooms server: a small HTTP wrapper used by the
//! interactive and scripted CLI clients.

pub mod client;

pub use client::{ClientError, GameClient};
