use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use std::{sync::Arc, time::Duration};
use tracing::info;

mod config;
mod deck;
mod error;
mod game;
mod handlers;
mod session;
mod store;
#[cfg(test)]
mod tests;

use config::Config;
use deck::DeckSource;
use session::SessionStore;
use store::{MemoryStore, RoomStore};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RoomStore>,
    sessions: Arc<SessionStore>,
    decks: Arc<DeckSource>,
}

impl AppState {
    fn new(decks: DeckSource) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            sessions: Arc::new(SessionStore::new()),
            decks: Arc::new(decks),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let decks = config.deck_source().context("failed to build deck client")?;
    let state = AppState::new(decks);
    if let Some(ttl) = config.room_ttl() {
        spawn_room_sweeper(state.clone(), ttl);
    }

    let app = handlers::router(state, &config.origins());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, deck = ?config.deck_mode, "blackjack server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server error")?;

    info!("server stopped");
    Ok(())
}

fn spawn_room_sweeper(state: AppState, ttl: chrono::Duration) {
    let period = ttl
        .to_std()
        .unwrap_or(Duration::from_secs(60))
        .min(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            for code in store::evict_idle(state.store.as_ref(), Utc::now() - ttl) {
                let sessions = state.sessions.drop_room(&code);
                info!(room = %code, sessions, "evicted idle room");
            }
        }
    });
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal");
}
