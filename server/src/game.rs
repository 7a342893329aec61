use crate::deck::DeckSource;
use crate::error::{Error, Result};
use blackjack_protocol::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Largest single `/draw` request. No blackjack hand can hold more cards
/// without busting.
pub const MAX_DRAW: u32 = 11;

/// Seats at one table.
pub const MAX_SEATS: usize = 7;

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub seat: usize,
    pub hand: Vec<Card>,
    /// Done acting: stood or busted.
    pub ready: bool,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub deck_id: Option<String>,
    pub players: HashMap<Uuid, PlayerState>,
    pub dealer_hand: Vec<Card>,
    /// Set by the first stay; later stays settle against the same hand.
    pub dealer_played: bool,
    pub phase: Phase,
    pub message: String,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    pub fn new(code: String, host: Uuid) -> Self {
        let mut room = Room {
            code,
            deck_id: None,
            players: HashMap::new(),
            dealer_hand: vec![],
            dealer_played: false,
            phase: Phase::NotStarted,
            message: String::new(),
            last_activity: Utc::now(),
        };
        room.seat(host);
        room
    }

    pub fn game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    fn seat(&mut self, player_id: Uuid) {
        let seat = self.players.len();
        self.players.insert(
            player_id,
            PlayerState {
                seat,
                hand: vec![],
                ready: false,
                outcome: None,
            },
        );
    }

    pub fn join(&mut self, player_id: Uuid) -> Result<()> {
        if self.phase != Phase::NotStarted {
            return Err(Error::AlreadyStarted);
        }
        if self.players.len() >= MAX_SEATS {
            return Err(Error::RoomFull);
        }
        self.seat(player_id);
        self.touch();
        Ok(())
    }

    pub fn player(&self, player_id: Uuid) -> Result<&PlayerState> {
        self.players.get(&player_id).ok_or(Error::InvalidSession)
    }

    /// Player ids in seat order.
    pub fn seating(&self) -> Vec<Uuid> {
        let mut seats: Vec<(usize, Uuid)> = self.players.iter().map(|(id, p)| (p.seat, *id)).collect();
        seats.sort();
        seats.into_iter().map(|(_, id)| id).collect()
    }

    fn require(&self, phase: Phase) -> Result<()> {
        if self.phase == phase {
            return Ok(());
        }
        Err(match self.phase {
            Phase::NotStarted => Error::NotStarted,
            Phase::InProgress => Error::AlreadyStarted,
            Phase::GameOver => Error::GameOver(self.message.clone()),
        })
    }

    /// The player must still be in the hand.
    fn require_acting(&self, player_id: Uuid) -> Result<()> {
        match self.player(player_id)?.outcome {
            Some(outcome) => Err(Error::PlayerDone(outcome.message().to_string())),
            None => Ok(()),
        }
    }

    /// Record a player's result. The game is over once every seat is done.
    fn finish(&mut self, player_id: Uuid, outcome: Outcome) {
        if let Some(p) = self.players.get_mut(&player_id) {
            p.ready = true;
            p.outcome = Some(outcome);
        }
        let waiting = self.players.values().filter(|p| !p.ready).count();
        if waiting > 0 {
            self.message = format!("Waiting on {waiting} player(s)");
            return;
        }
        self.phase = Phase::GameOver;
        self.message = if self.players.len() == 1 {
            outcome.message().to_string()
        } else {
            "All hands settled".to_string()
        };
    }

    fn deck(&self) -> Result<&str> {
        self.deck_id.as_deref().ok_or(Error::NotStarted)
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn view(&self) -> RoomView {
        let reveal = self.game_over() || self.dealer_played;
        let dealer_hand = if reveal {
            self.dealer_hand.clone()
        } else {
            self.dealer_hand.iter().take(1).copied().collect()
        };
        let players = self
            .seating()
            .into_iter()
            .filter_map(|id| {
                self.players.get(&id).map(|p| PlayerView {
                    player_id: id,
                    seat: p.seat,
                    hand: p.hand.clone(),
                    total: hand_value(&p.hand),
                    ready: p.ready,
                    outcome: p.outcome,
                })
            })
            .collect();
        RoomView {
            room_code: self.code.clone(),
            phase: self.phase,
            game_over: self.game_over(),
            message: self.message.clone(),
            dealer_total: reveal.then(|| hand_value(&self.dealer_hand)),
            dealer_hand,
            players,
        }
    }
}

/// Fresh deck, two cards to the dealer, then two to every seat.
pub async fn start(room: &mut Room, decks: &DeckSource) -> Result<Card> {
    room.require(Phase::NotStarted)?;

    let deck_id = decks.new_deck().await?;
    room.dealer_hand = decks.draw(&deck_id, 2).await?;
    for id in room.seating() {
        let cards = decks.draw(&deck_id, 2).await?;
        if let Some(p) = room.players.get_mut(&id) {
            p.hand = cards;
            p.ready = false;
            p.outcome = None;
        }
    }
    room.deck_id = Some(deck_id);
    room.phase = Phase::InProgress;
    room.message = "Game started".to_string();
    room.touch();

    info!(room = %room.code, players = room.players.len(), "game started");
    room.dealer_hand.first().copied().ok_or(Error::NotStarted)
}

pub struct Drawn {
    pub cards: Vec<Card>,
    pub hand: Vec<Card>,
    pub total: u32,
    /// `Some(Bust)` when the draw ended this player's hand.
    pub outcome: Option<Outcome>,
}

/// Deal `count` cards to one player. Busting finishes their hand.
pub async fn draw(room: &mut Room, player_id: Uuid, count: u32, decks: &DeckSource) -> Result<Drawn> {
    if count == 0 || count > MAX_DRAW {
        return Err(Error::InvalidCount(count));
    }
    room.player(player_id)?;
    room.require(Phase::InProgress)?;
    room.require_acting(player_id)?;

    let cards = decks.draw(room.deck()?, count).await?;
    let player = room.players.get_mut(&player_id).ok_or(Error::InvalidSession)?;
    player.hand.extend_from_slice(&cards);
    let value = evaluate(&player.hand);
    let hand = player.hand.clone();
    let outcome = value.is_bust().then_some(Outcome::Bust);
    if let Some(outcome) = outcome {
        room.finish(player_id, outcome);
        info!(room = %room.code, player = %player_id, total = value.total, "player bust");
    }
    room.touch();

    Ok(Drawn {
        cards,
        hand,
        total: value.total,
        outcome,
    })
}

pub async fn hit(room: &mut Room, player_id: Uuid, decks: &DeckSource) -> Result<Drawn> {
    draw(room, player_id, 1, decks).await
}

pub struct Settlement {
    pub dealer_total: u32,
    pub player_total: u32,
    pub outcome: Outcome,
}

/// Settle the staying player. The dealer plays out on the first stay of the
/// game and every later stay is compared against that same hand.
pub async fn stay(room: &mut Room, player_id: Uuid, decks: &DeckSource) -> Result<Settlement> {
    room.player(player_id)?;
    room.require(Phase::InProgress)?;
    room.require_acting(player_id)?;

    if !room.dealer_played {
        let deck_id = room.deck()?.to_string();
        while hand_value(&room.dealer_hand) < DEALER_STANDS_ON {
            let cards = decks.draw(&deck_id, 1).await?;
            room.dealer_hand.extend(cards);
        }
        room.dealer_played = true;
    }
    let dealer_total = hand_value(&room.dealer_hand);
    let player_total = hand_value(&room.player(player_id)?.hand);
    let outcome = Outcome::settle(player_total, dealer_total);

    room.finish(player_id, outcome);
    room.touch();

    info!(
        room = %room.code,
        player = %player_id,
        player_total,
        dealer_total,
        ?outcome,
        "hand settled"
    );
    Ok(Settlement {
        dealer_total,
        player_total,
        outcome,
    })
}

pub async fn reshuffle(room: &mut Room, decks: &DeckSource) -> Result<u32> {
    let remaining = decks.reshuffle(room.deck()?).await?;
    room.touch();
    Ok(remaining)
}

pub fn hand(room: &Room, player_id: Uuid) -> Result<HandResponse> {
    let hand = room.player(player_id)?.hand.clone();
    let value = evaluate(&hand);
    Ok(HandResponse {
        hand,
        total: value.total,
        soft: value.soft,
    })
}
