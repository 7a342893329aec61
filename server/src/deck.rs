use blackjack_protocol::{Card, Deck};
use parking_lot::Mutex;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use tracing::debug;
use url::Url;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("deck service failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("deck {0} not found")]
    UnknownDeck(String),
    #[error("deck exhausted: requested {requested}, drew {drawn}")]
    Exhausted { requested: u32, drawn: u32 },
}

pub type Result<T> = std::result::Result<T, DeckError>;

#[derive(Debug, Deserialize)]
struct DeckState {
    deck_id: String,
    #[serde(default)]
    remaining: u32,
}

#[derive(Debug, Deserialize)]
struct DrawnCards {
    #[serde(default)]
    cards: Vec<Card>,
}

/// Client for a deckofcardsapi.com compatible service.
#[derive(Clone)]
pub struct DeckApi {
    base_url: Url,
    http_client: HttpClient,
    deck_count: u32,
}

impl DeckApi {
    pub fn new(base_url: &Url, deck_count: u32, timeout: Duration) -> Result<Self> {
        // Url::join drops the last segment unless the base ends in a slash
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            http_client,
            deck_count: deck_count.max(1),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "deck api request");
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DeckError::Failed(response.status()));
        }
        Ok(response.json().await?)
    }

    pub async fn new_deck(&self) -> Result<String> {
        let url = self
            .base_url
            .join(&format!("new/shuffle/?deck_count={}", self.deck_count))?;
        let state: DeckState = self.get(url).await?;
        Ok(state.deck_id)
    }

    pub async fn draw(&self, deck_id: &str, count: u32) -> Result<Vec<Card>> {
        let url = self
            .base_url
            .join(&format!("{deck_id}/draw/?count={count}"))?;
        let drawn: DrawnCards = self.get(url).await?;
        let got = drawn.cards.len() as u32;
        if got < count {
            return Err(DeckError::Exhausted {
                requested: count,
                drawn: got,
            });
        }
        Ok(drawn.cards)
    }

    pub async fn reshuffle(&self, deck_id: &str) -> Result<u32> {
        let url = self.base_url.join(&format!("{deck_id}/shuffle/"))?;
        let state: DeckState = self.get(url).await?;
        Ok(state.remaining)
    }
}

/// Decks shuffled in process, keyed by generated ids.
pub struct LocalDecks {
    decks: Mutex<HashMap<String, Deck>>,
    deck_count: u32,
    stacked: Option<Vec<Card>>,
}

impl LocalDecks {
    pub fn new(deck_count: u32) -> Self {
        Self {
            decks: Mutex::new(HashMap::new()),
            deck_count: deck_count.max(1),
            stacked: None,
        }
    }

    /// Every deck created deals `order` front to back.
    #[cfg(test)]
    pub fn stacked(order: Vec<Card>) -> Self {
        Self {
            stacked: Some(order),
            ..Self::new(1)
        }
    }

    fn fresh(&self) -> Deck {
        match &self.stacked {
            Some(order) => Deck::stacked(order),
            None => Deck::shoe_shuffled(self.deck_count),
        }
    }

    pub fn new_deck(&self) -> String {
        let id = Uuid::new_v4().simple().to_string()[..12].to_string();
        self.decks.lock().insert(id.clone(), self.fresh());
        id
    }

    pub fn draw(&self, deck_id: &str, count: u32) -> Result<Vec<Card>> {
        let mut decks = self.decks.lock();
        let deck = decks
            .get_mut(deck_id)
            .ok_or_else(|| DeckError::UnknownDeck(deck_id.to_string()))?;
        if deck.remaining() < count as usize {
            return Err(DeckError::Exhausted {
                requested: count,
                drawn: deck.remaining() as u32,
            });
        }
        Ok((0..count).filter_map(|_| deck.draw()).collect())
    }

    pub fn reshuffle(&self, deck_id: &str) -> Result<u32> {
        let fresh = self.fresh();
        let mut decks = self.decks.lock();
        let deck = decks
            .get_mut(deck_id)
            .ok_or_else(|| DeckError::UnknownDeck(deck_id.to_string()))?;
        *deck = fresh;
        Ok(deck.remaining() as u32)
    }
}

/// Where rooms get their cards from.
pub enum DeckSource {
    Remote(DeckApi),
    Local(LocalDecks),
}

impl DeckSource {
    pub async fn new_deck(&self) -> Result<String> {
        match self {
            DeckSource::Remote(api) => api.new_deck().await,
            DeckSource::Local(local) => Ok(local.new_deck()),
        }
    }

    pub async fn draw(&self, deck_id: &str, count: u32) -> Result<Vec<Card>> {
        match self {
            DeckSource::Remote(api) => api.draw(deck_id, count).await,
            DeckSource::Local(local) => local.draw(deck_id, count),
        }
    }

    pub async fn reshuffle(&self, deck_id: &str) -> Result<u32> {
        match self {
            DeckSource::Remote(api) => api.reshuffle(deck_id).await,
            DeckSource::Local(local) => local.reshuffle(deck_id),
        }
    }
}
