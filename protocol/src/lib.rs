use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Dealer keeps drawing while below this total (stands on every 17).
pub const DEALER_STANDS_ON: u32 = 17;
/// Highest total that does not bust.
pub const BLACKJACK: u32 = 21;

/// ---- Cards ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    #[serde(rename = "2")]
    Two = 2,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "JACK")]
    Jack,
    #[serde(rename = "QUEEN")]
    Queen,
    #[serde(rename = "KING")]
    King,
    #[serde(rename = "ACE")]
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Blackjack value with every ace counted high.
    pub fn value(self) -> u32 {
        match self {
            Rank::Ace => 11,
            Rank::Jack | Rank::Queen | Rank::King => 10,
            numeric => numeric as u32,
        }
    }
}

/// A card as the deck service reports it. The JSON shape follows the remote
/// API (`{"value": "ACE", "suit": "SPADES", ...}`); unknown fields such as
/// `code` and `image` are ignored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    #[serde(rename = "value")]
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Card { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = match self.rank {
            Rank::Ace => "A",
            Rank::King => "K",
            Rank::Queen => "Q",
            Rank::Jack => "J",
            Rank::Ten => "10",
            Rank::Nine => "9",
            Rank::Eight => "8",
            Rank::Seven => "7",
            Rank::Six => "6",
            Rank::Five => "5",
            Rank::Four => "4",
            Rank::Three => "3",
            Rank::Two => "2",
        };
        let s = match self.suit {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
        };
        write!(f, "{}{}", r, s)
    }
}

/// In-process shoe of one or more 52-card decks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn standard_shuffled() -> Self {
        Self::shoe_shuffled(1)
    }

    pub fn shoe_shuffled(decks: u32) -> Self {
        let mut cards = Vec::with_capacity(52 * decks as usize);
        for _ in 0..decks {
            for &s in &Suit::ALL {
                for r in Rank::ALL {
                    cards.push(Card::new(r, s));
                }
            }
        }
        cards.shuffle(&mut thread_rng());
        Deck { cards }
    }

    /// A deck that deals `order` front to back.
    pub fn stacked(order: &[Card]) -> Self {
        let mut cards = order.to_vec();
        cards.reverse();
        Deck { cards }
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

/// ---- Scoring ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandValue {
    pub total: u32,
    /// An ace is still counted as 11.
    pub soft: bool,
}

impl HandValue {
    pub fn is_bust(&self) -> bool {
        self.total > BLACKJACK
    }
}

pub fn evaluate(cards: &[Card]) -> HandValue {
    let mut total = 0;
    let mut aces = 0;
    for c in cards {
        total += c.rank.value();
        if c.rank == Rank::Ace {
            aces += 1;
        }
    }
    while total > BLACKJACK && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    HandValue {
        total,
        soft: aces > 0,
    }
}

pub fn hand_value(cards: &[Card]) -> u32 {
    evaluate(cards).total
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    PlayerWins,
    DealerWins,
    Tie,
    Bust,
}

impl Outcome {
    /// Compare final totals once the dealer has finished drawing.
    pub fn settle(player_total: u32, dealer_total: u32) -> Self {
        if player_total > BLACKJACK {
            Outcome::Bust
        } else if dealer_total > BLACKJACK || player_total > dealer_total {
            Outcome::PlayerWins
        } else if dealer_total > player_total {
            Outcome::DealerWins
        } else {
            Outcome::Tie
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Outcome::PlayerWins => "You win!",
            Outcome::DealerWins => "Dealer wins.",
            Outcome::Tie => "It's a tie.",
            Outcome::Bust => "Bust! You lose",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    InProgress,
    GameOver,
}

/// ---- HTTP bodies ----

/// Session reference carried in a request body or query string. Used when the
/// caller has no session cookie.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_code: String,
    pub player_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub room_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub message: String,
    pub room_code: String,
    pub player_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGameResponse {
    pub message: String,
    pub dealer_card: Card,
    pub hand: Vec<Card>,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitResponse {
    pub card: Card,
    pub hand: Vec<Card>,
    pub total: u32,
    pub game_over: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawRequest {
    #[serde(default = "default_draw_count")]
    pub count: u32,
    #[serde(flatten)]
    pub session: SessionRef,
}

fn default_draw_count() -> u32 {
    1
}

impl Default for DrawRequest {
    fn default() -> Self {
        DrawRequest {
            count: default_draw_count(),
            session: SessionRef::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawResponse {
    pub cards: Vec<Card>,
    pub hand: Vec<Card>,
    pub total: u32,
    pub game_over: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayResponse {
    pub dealer_hand: Vec<Card>,
    pub dealer_total: u32,
    pub player_total: u32,
    pub outcome: Outcome,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandResponse {
    pub hand: Vec<Card>,
    pub total: u32,
    pub soft: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReshuffleResponse {
    pub shuffled: bool,
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub player_id: Uuid,
    pub seat: usize,
    pub hand: Vec<Card>,
    pub total: u32,
    pub ready: bool,
    /// Result of a finished hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

/// Public snapshot of a room. The dealer's hole card stays hidden until the
/// game is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub room_code: String,
    pub phase: Phase,
    pub game_over: bool,
    pub message: String,
    pub dealer_hand: Vec<Card>,
    pub dealer_total: Option<u32>,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
