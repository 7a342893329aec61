use crate::deck::{DeckApi, DeckError, DeckSource, LocalDecks};
use axum::http::HeaderValue;
use clap::{Parser, ValueEnum};
use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};
use tracing::warn;
use url::Url;

/// Longest accepted idle-room TTL: 30 days.
pub const MAX_ROOM_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeckMode {
    /// deckofcardsapi.com compatible HTTP service
    Remote,
    /// In-process shuffled decks
    Local,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Blackjack rooms HTTP server", long_about = None)]
pub struct Config {
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    #[arg(long, env = "DECK_API_URL", default_value = "https://deckofcardsapi.com/api/deck/")]
    pub deck_api_url: Url,

    #[arg(long = "deck", env = "DECK_SOURCE", value_enum, default_value_t = DeckMode::Remote)]
    pub deck_mode: DeckMode,

    /// 52-card decks per shoe
    #[arg(long, env = "DECK_COUNT", default_value_t = 1)]
    pub deck_count: u32,

    #[arg(long, env = "DECK_TIMEOUT_SECS", default_value_t = 10)]
    pub deck_timeout_secs: u64,

    /// Rooms idle this long are dropped; 0 keeps them forever
    #[arg(
        long,
        env = "ROOM_TTL_SECS",
        default_value_t = 7200,
        value_parser = clap::value_parser!(u64).range(0..=MAX_ROOM_TTL_SECS)
    )]
    pub room_ttl_secs: u64,

    /// Origins allowed to call the API with credentials
    #[arg(
        long = "allow-origin",
        env = "ALLOW_ORIGIN",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allow_origins: Vec<String>,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn deck_source(&self) -> Result<DeckSource, DeckError> {
        Ok(match self.deck_mode {
            DeckMode::Remote => DeckSource::Remote(DeckApi::new(
                &self.deck_api_url,
                self.deck_count,
                Duration::from_secs(self.deck_timeout_secs),
            )?),
            DeckMode::Local => DeckSource::Local(LocalDecks::new(self.deck_count)),
        })
    }

    pub fn room_ttl(&self) -> Option<chrono::Duration> {
        if self.room_ttl_secs == 0 {
            return None;
        }
        i64::try_from(self.room_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    pub fn origins(&self) -> Vec<HeaderValue> {
        self.allow_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o.trim()) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid origin");
                    None
                }
            })
            .collect()
    }
}
