use crate::deck::{DeckApi, DeckSource, LocalDecks};
use crate::handlers::router;
use crate::session::SESSION_COOKIE;
use crate::AppState;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use blackjack_protocol::*;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

/// App whose every deck deals `order` front to back: dealer first, then seats.
fn stacked_app(order: &[Rank]) -> Router {
    let cards = order.iter().map(|&r| Card::new(r, Suit::Clubs)).collect();
    router(AppState::new(DeckSource::Local(LocalDecks::stacked(cards))), &[])
}

fn shuffled_app() -> Router {
    router(AppState::new(DeckSource::Local(LocalDecks::new(1))), &[])
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

impl Reply {
    fn parse<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.body.clone()).unwrap()
    }

    fn error(&self) -> String {
        self.body["error"].as_str().unwrap_or_default().to_string()
    }
}

async fn send(app: &Router, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Reply {
        status,
        cookie,
        body,
    }
}

/// Create a room and return (cookie, room code, player id).
async fn create(app: &Router) -> (String, String, String) {
    let reply = send(app, "POST", "/create-room", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let created: CreateRoomResponse = reply.parse();
    (
        reply.cookie.expect("session cookie"),
        created.room_code,
        created.player_id.to_string(),
    )
}

fn clubs(ranks: &[Rank]) -> Vec<Card> {
    ranks.iter().map(|&r| Card::new(r, Suit::Clubs)).collect()
}

#[tokio::test]
async fn test_index() {
    let reply = send(&shuffled_app(), "GET", "/", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, Value::String("Welcome to Blackjack!".into()));
}

#[tokio::test]
async fn test_create_room_sets_session_cookie() {
    let app = shuffled_app();
    let (cookie, code, _) = create(&app).await;

    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

    let view: RoomView = send(&app, "GET", "/room", Some(&cookie), None).await.parse();
    assert_eq!(view.room_code, code);
    assert_eq!(view.phase, Phase::NotStarted);
    assert_eq!(view.players.len(), 1);
}

#[tokio::test]
async fn test_join_room_validation() {
    let app = shuffled_app();

    let missing = send(&app, "POST", "/join-room", None, Some(json!({}))).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.error(), "Missing room code");

    let unknown = send(&app, "POST", "/join-room", None, Some(json!({"room_code": "ZZZZZZ"}))).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.error(), "Room not found");
}

#[tokio::test]
async fn test_join_then_start_deals_every_seat() {
    let app = stacked_app(&[Rank::Ten, Rank::Six, Rank::Two, Rank::Three, Rank::Four, Rank::Five]);
    let (host, code, _) = create(&app).await;

    let joined = send(
        &app,
        "POST",
        "/join-room",
        None,
        Some(json!({"room_code": code.to_lowercase()})),
    )
    .await;
    assert_eq!(joined.status, StatusCode::OK);
    let guest = joined.cookie.clone().expect("guest cookie");
    let body: JoinRoomResponse = joined.parse();
    assert_eq!(body.message, format!("Joined room {code}"));

    let started = send(&app, "POST", "/start-game", Some(&host), Some(json!({}))).await;
    assert_eq!(started.status, StatusCode::OK);
    let started: StartGameResponse = started.parse();
    assert_eq!(started.message, "Game started");
    assert_eq!(started.dealer_card.rank, Rank::Ten);
    assert_eq!(started.hand, clubs(&[Rank::Two, Rank::Three]));
    assert_eq!(started.total, 5);

    let guest_hand: HandResponse = send(&app, "GET", "/hand", Some(&guest), None).await.parse();
    assert_eq!(guest_hand.hand, clubs(&[Rank::Four, Rank::Five]));
    assert_eq!(guest_hand.total, 9);

    let view: RoomView = send(&app, "GET", "/room", Some(&guest), None).await.parse();
    assert_eq!(view.phase, Phase::InProgress);
    assert_eq!(view.dealer_hand.len(), 1);
    assert_eq!(view.players.len(), 2);
    assert_eq!(view.players[1].seat, 1);

    let late = send(&app, "POST", "/join-room", None, Some(json!({"room_code": code}))).await;
    assert_eq!(late.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_actions_before_start_conflict() {
    let app = shuffled_app();
    let (cookie, _, _) = create(&app).await;

    for path in ["/hit", "/stay", "/draw", "/reshuffle"] {
        let reply = send(&app, "POST", path, Some(&cookie), None).await;
        assert_eq!(reply.status, StatusCode::CONFLICT, "{path}");
        assert_eq!(reply.error(), "Game has not started");
    }
}

#[tokio::test]
async fn test_start_twice_conflicts() {
    let app = shuffled_app();
    let (cookie, _, _) = create(&app).await;

    assert_eq!(send(&app, "POST", "/start", Some(&cookie), None).await.status, StatusCode::OK);
    let again = send(&app, "POST", "/start-game", Some(&cookie), None).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.error(), "Game already in progress");
}

#[tokio::test]
async fn test_stay_player_wins() {
    let app = stacked_app(&[Rank::Ten, Rank::Seven, Rank::Ten, Rank::Nine]);
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    let reply = send(&app, "POST", "/stay", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let stay: StayResponse = reply.parse();
    assert_eq!(stay.dealer_total, 17);
    assert_eq!(stay.player_total, 19);
    assert_eq!(stay.outcome, Outcome::PlayerWins);
    assert_eq!(stay.result, "You win!");
    assert_eq!(reply.body["outcome"], "player_wins");

    let after = send(&app, "POST", "/hit", Some(&cookie), None).await;
    assert_eq!(after.status, StatusCode::CONFLICT);
    assert_eq!(after.error(), "Game is over: You win!");
}

#[tokio::test]
async fn test_stay_tie() {
    let app = stacked_app(&[Rank::Ten, Rank::Eight, Rank::Nine, Rank::Nine]);
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    let stay: StayResponse = send(&app, "POST", "/stay", Some(&cookie), None).await.parse();
    assert_eq!(stay.outcome, Outcome::Tie);
    assert_eq!(stay.result, "It's a tie.");
}

#[tokio::test]
async fn test_dealer_draws_until_17_and_busts() {
    let app = stacked_app(&[
        Rank::Two,
        Rank::Three,
        Rank::Ten,
        Rank::Eight,
        Rank::Four,
        Rank::Five,
        Rank::Ten,
    ]);
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    let stay: StayResponse = send(&app, "POST", "/stay", Some(&cookie), None).await.parse();
    assert_eq!(
        stay.dealer_hand,
        clubs(&[Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Ten])
    );
    assert_eq!(stay.dealer_total, 24);
    assert_eq!(stay.outcome, Outcome::PlayerWins);

    let view: RoomView = send(&app, "GET", "/room", Some(&cookie), None).await.parse();
    assert!(view.game_over);
    assert_eq!(view.dealer_total, Some(24));
}

#[tokio::test]
async fn test_hit_bust_ends_game() {
    let app = stacked_app(&[Rank::Ten, Rank::Seven, Rank::Ten, Rank::Six, Rank::King]);
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    let hit: HitResponse = send(&app, "POST", "/hit", Some(&cookie), None).await.parse();
    assert_eq!(hit.card.rank, Rank::King);
    assert_eq!(hit.hand.len(), 3);
    assert_eq!(hit.total, 26);
    assert!(hit.game_over);
    assert_eq!(hit.message, "Bust! You lose");

    let stay = send(&app, "POST", "/stay", Some(&cookie), None).await;
    assert_eq!(stay.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_hit_below_21_keeps_playing() {
    let app = stacked_app(&[Rank::Ten, Rank::Seven, Rank::Ace, Rank::Two, Rank::Ace]);
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    let hit: HitResponse = send(&app, "POST", "/hit", Some(&cookie), None).await.parse();
    assert_eq!(hit.total, 14);
    assert!(!hit.game_over);

    let hand: HandResponse = send(&app, "GET", "/hand", Some(&cookie), None).await.parse();
    assert!(hand.soft);
}

#[tokio::test]
async fn test_draw_multiple_cards() {
    let app = stacked_app(&[Rank::Ten, Rank::Seven, Rank::Two, Rank::Two, Rank::Three, Rank::Four]);
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    let bad = send(&app, "POST", "/draw", Some(&cookie), Some(json!({"count": 0}))).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let drawn: DrawResponse = send(&app, "POST", "/draw", Some(&cookie), Some(json!({"count": 2})))
        .await
        .parse();
    assert_eq!(drawn.cards, clubs(&[Rank::Three, Rank::Four]));
    assert_eq!(drawn.hand.len(), 4);
    assert_eq!(drawn.total, 11);
    assert!(!drawn.game_over);
}

#[tokio::test]
async fn test_hand_view_is_idempotent() {
    let app = shuffled_app();
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    let first = send(&app, "GET", "/hand", Some(&cookie), None).await;
    let second = send(&app, "GET", "/hand", Some(&cookie), None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, second.body);

    let hand: HandResponse = first.parse();
    assert_eq!(hand.hand.len(), 2);
    assert_eq!(hand.total, hand_value(&hand.hand));
}

#[tokio::test]
async fn test_session_from_body_and_query() {
    let app = stacked_app(&[Rank::Ten, Rank::Seven, Rank::Five, Rank::Six]);
    let (_, code, player_id) = create(&app).await;

    let started = send(
        &app,
        "POST",
        "/start-game",
        None,
        Some(json!({"room_code": code, "player_id": player_id})),
    )
    .await;
    assert_eq!(started.status, StatusCode::OK);

    let uri = format!("/hand?room_code={code}&player_id={player_id}");
    let hand: HandResponse = send(&app, "GET", &uri, None, None).await.parse();
    assert_eq!(hand.total, 11);

    let anonymous = send(&app, "POST", "/hit", None, None).await;
    assert_eq!(anonymous.status, StatusCode::BAD_REQUEST);
    assert_eq!(anonymous.error(), "Invalid session");

    let stranger = send(
        &app,
        "POST",
        "/hit",
        None,
        Some(json!({"room_code": code, "player_id": uuid::Uuid::new_v4()})),
    )
    .await;
    assert_eq!(stranger.status, StatusCode::BAD_REQUEST);

    let stale = format!("{SESSION_COOKIE}={}", uuid::Uuid::new_v4());
    let reply = send(&app, "GET", "/hand", Some(&stale), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dealer_always_finishes_at_17_or_more() {
    let app = shuffled_app();
    for _ in 0..25 {
        let (cookie, _, _) = create(&app).await;
        send(&app, "POST", "/start-game", Some(&cookie), None).await;

        let stay: StayResponse = send(&app, "POST", "/stay", Some(&cookie), None).await.parse();
        assert!(stay.dealer_total >= DEALER_STANDS_ON);
        assert_eq!(stay.dealer_total, hand_value(&stay.dealer_hand));
        assert_eq!(stay.outcome, Outcome::settle(stay.player_total, stay.dealer_total));
    }
}

#[tokio::test]
async fn test_reshuffle_after_start() {
    let app = shuffled_app();
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    let reshuffled: ReshuffleResponse = send(&app, "POST", "/reshuffle", Some(&cookie), None)
        .await
        .parse();
    assert!(reshuffled.shuffled);
    assert_eq!(reshuffled.remaining, 52);
}

#[tokio::test]
async fn test_deck_service_failure_is_bad_gateway() {
    let unreachable = url::Url::parse("http://127.0.0.1:9/api/deck/").unwrap();
    let api = DeckApi::new(&unreachable, 1, Duration::from_secs(2)).unwrap();
    let app = router(AppState::new(DeckSource::Remote(api)), &[]);
    let (cookie, _, _) = create(&app).await;

    let reply = send(&app, "POST", "/start-game", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);

    // the failed start left the room untouched
    let view: RoomView = send(&app, "GET", "/room", Some(&cookie), None).await.parse();
    assert_eq!(view.phase, Phase::NotStarted);
}

#[tokio::test]
async fn test_draw_rejects_malformed_counts() {
    let app = stacked_app(&[Rank::Ten, Rank::Seven, Rank::Two, Rank::Two, Rank::Three, Rank::Four]);
    let (cookie, _, _) = create(&app).await;
    send(&app, "POST", "/start-game", Some(&cookie), None).await;

    for body in [json!({"count": -1}), json!({"count": "many"}), json!({"count": 2.5})] {
        let reply = send(&app, "POST", "/draw", Some(&cookie), Some(body.clone())).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
        assert!(reply.error().starts_with("Invalid request body"), "{body}");
    }

    // nothing was dealt by the rejected requests
    let hand: HandResponse = send(&app, "GET", "/hand", Some(&cookie), None).await.parse();
    assert_eq!(hand.hand.len(), 2);

    let drawn: DrawResponse = send(&app, "POST", "/draw", Some(&cookie), None).await.parse();
    assert_eq!(drawn.cards, clubs(&[Rank::Three]));
}

#[tokio::test]
async fn test_two_players_settle_separately() {
    // dealer 10+7, host 10+9, guest 10+8
    let app = stacked_app(&[Rank::Ten, Rank::Seven, Rank::Ten, Rank::Nine, Rank::Ten, Rank::Eight]);
    let (host, code, _) = create(&app).await;
    let joined = send(&app, "POST", "/join-room", None, Some(json!({"room_code": code}))).await;
    let guest = joined.cookie.expect("guest cookie");
    send(&app, "POST", "/start-game", Some(&host), None).await;

    let first: StayResponse = send(&app, "POST", "/stay", Some(&host), None).await.parse();
    assert_eq!(first.outcome, Outcome::PlayerWins);

    let view: RoomView = send(&app, "GET", "/room", Some(&guest), None).await.parse();
    assert_eq!(view.phase, Phase::InProgress);
    assert_eq!(view.message, "Waiting on 1 player(s)");
    assert_eq!(view.players[0].outcome, Some(Outcome::PlayerWins));
    assert!(!view.players[1].ready);

    let again = send(&app, "POST", "/stay", Some(&host), None).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.error(), "Your hand is finished: You win!");

    let reply = send(&app, "POST", "/stay", Some(&guest), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let second: StayResponse = reply.parse();
    assert_eq!(second.dealer_hand, first.dealer_hand);
    assert_eq!(second.player_total, 18);
    assert_eq!(second.outcome, Outcome::PlayerWins);

    let view: RoomView = send(&app, "GET", "/room", Some(&host), None).await.parse();
    assert!(view.game_over);
    assert_eq!(view.message, "All hands settled");
    assert!(view.players.iter().all(|p| p.ready));
}

#[tokio::test]
async fn test_full_room_and_empty_shoe_conflict() {
    let app = stacked_app(&[Rank::Ten, Rank::Seven]);
    let (host, code, _) = create(&app).await;
    for _ in 1..crate::game::MAX_SEATS {
        let joined = send(&app, "POST", "/join-room", None, Some(json!({"room_code": code}))).await;
        assert_eq!(joined.status, StatusCode::OK);
    }
    let full = send(&app, "POST", "/join-room", None, Some(json!({"room_code": code}))).await;
    assert_eq!(full.status, StatusCode::CONFLICT);
    assert_eq!(full.error(), "Room is full");

    // two cards cannot deal a table of seven
    let start = send(&app, "POST", "/start-game", Some(&host), None).await;
    assert_eq!(start.status, StatusCode::CONFLICT);
}
