use crate::deck::DeckError;
use crate::error::{Error, Result};
use crate::game::{self, Room};
use crate::session::{session_cookie, Session, SessionContext};
use crate::store::RoomStore;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use blackjack_protocol::*;
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

pub fn router(state: AppState, origins: &[HeaderValue]) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/", get(index))
        .route("/create-room", post(create_room))
        .route("/join-room", post(join_room))
        .route("/start-game", post(start_game))
        .route("/start", post(start_game))
        .route("/hit", post(hit))
        .route("/draw", post(draw))
        .route("/stay", post(stay))
        .route("/hand", get(show_hand))
        .route("/room", get(show_room))
        .route("/reshuffle", post(reshuffle))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "Welcome to Blackjack!"
}

fn new_room_code(store: &dyn RoomStore) -> String {
    loop {
        let code = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        if !store.contains(&code) {
            return code;
        }
    }
}

/// Resolve the caller's session and load a copy of their room.
fn load(state: &AppState, ctx: &SessionContext, fallback: &SessionRef) -> Result<(Session, Room)> {
    let session = ctx.resolve(fallback)?;
    let room = state
        .store
        .get(&session.room_code)
        .ok_or(Error::InvalidSession)?;
    room.player(session.player_id)?;
    Ok((session, room))
}

fn save(state: &AppState, room: Room) {
    state.store.put(room.code.clone(), room);
}

async fn create_room(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<impl IntoResponse> {
    let player_id = Uuid::new_v4();
    let room_code = new_room_code(state.store.as_ref());
    save(&state, Room::new(room_code.clone(), player_id));

    let token = state.sessions.save(
        ctx.token,
        Session {
            player_id,
            room_code: room_code.clone(),
        },
    );
    info!(room = %room_code, player = %player_id, "room created");

    Ok((
        [(header::SET_COOKIE, session_cookie(token))],
        Json(CreateRoomResponse {
            room_code,
            player_id,
        }),
    ))
}

async fn join_room(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: Option<Json<JoinRoomRequest>>,
) -> Result<impl IntoResponse> {
    let room_code = body
        .and_then(|Json(b)| b.room_code)
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .ok_or(Error::MissingRoomCode)?;

    let mut room = state
        .store
        .get(&room_code)
        .ok_or_else(|| Error::RoomNotFound(room_code.clone()))?;
    let player_id = Uuid::new_v4();
    room.join(player_id)?;
    save(&state, room);

    let token = state.sessions.save(
        ctx.token,
        Session {
            player_id,
            room_code: room_code.clone(),
        },
    );
    info!(room = %room_code, player = %player_id, "player joined");

    Ok((
        [(header::SET_COOKIE, session_cookie(token))],
        Json(JoinRoomResponse {
            message: format!("Joined room {room_code}"),
            room_code,
            player_id,
        }),
    ))
}

/// An empty body means defaults; anything else must parse.
fn json_or_default<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| Error::InvalidBody(e.to_string()))
}

fn session_ref(body: Option<Json<SessionRef>>) -> SessionRef {
    body.map(|Json(b)| b).unwrap_or_default()
}

async fn start_game(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: Option<Json<SessionRef>>,
) -> Result<Json<StartGameResponse>> {
    let (session, mut room) = load(&state, &ctx, &session_ref(body))?;

    let dealer_card = game::start(&mut room, &state.decks).await?;
    let hand = game::hand(&room, session.player_id)?;
    let message = room.message.clone();
    save(&state, room);

    Ok(Json(StartGameResponse {
        message,
        dealer_card,
        hand: hand.hand,
        total: hand.total,
    }))
}

async fn hit(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: Option<Json<SessionRef>>,
) -> Result<Json<HitResponse>> {
    let (session, mut room) = load(&state, &ctx, &session_ref(body))?;

    let drawn = game::hit(&mut room, session.player_id, &state.decks).await?;
    let card = drawn.cards.first().copied().ok_or(Error::Deck(DeckError::Exhausted {
        requested: 1,
        drawn: 0,
    }))?;
    let response = HitResponse {
        card,
        hand: drawn.hand,
        total: drawn.total,
        game_over: drawn.outcome.is_some(),
        message: hand_message(&room, drawn.outcome),
    };
    save(&state, room);

    Ok(Json(response))
}

async fn draw(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: Bytes,
) -> Result<Json<DrawResponse>> {
    let request: DrawRequest = json_or_default(&body)?;
    let (session, mut room) = load(&state, &ctx, &request.session)?;

    let drawn = game::draw(&mut room, session.player_id, request.count, &state.decks).await?;
    let response = DrawResponse {
        game_over: drawn.outcome.is_some(),
        message: hand_message(&room, drawn.outcome),
        cards: drawn.cards,
        hand: drawn.hand,
        total: drawn.total,
    };
    save(&state, room);

    Ok(Json(response))
}

/// The player's own result once their hand is finished, else the table status.
fn hand_message(room: &Room, outcome: Option<Outcome>) -> String {
    match outcome {
        Some(outcome) => outcome.message().to_string(),
        None => room.message.clone(),
    }
}

async fn stay(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: Option<Json<SessionRef>>,
) -> Result<Json<StayResponse>> {
    let (session, mut room) = load(&state, &ctx, &session_ref(body))?;

    let settled = game::stay(&mut room, session.player_id, &state.decks).await?;
    let response = StayResponse {
        dealer_hand: room.dealer_hand.clone(),
        dealer_total: settled.dealer_total,
        player_total: settled.player_total,
        outcome: settled.outcome,
        result: settled.outcome.message().to_string(),
    };
    save(&state, room);

    Ok(Json(response))
}

async fn show_hand(
    State(state): State<AppState>,
    ctx: SessionContext,
    query: Option<Query<SessionRef>>,
) -> Result<Json<HandResponse>> {
    let fallback = query.map(|Query(q)| q).unwrap_or_default();
    let (session, room) = load(&state, &ctx, &fallback)?;
    Ok(Json(game::hand(&room, session.player_id)?))
}

async fn show_room(
    State(state): State<AppState>,
    ctx: SessionContext,
    query: Option<Query<SessionRef>>,
) -> Result<Json<RoomView>> {
    let fallback = query.map(|Query(q)| q).unwrap_or_default();
    let (_, room) = load(&state, &ctx, &fallback)?;
    Ok(Json(room.view()))
}

async fn reshuffle(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: Option<Json<SessionRef>>,
) -> Result<Json<ReshuffleResponse>> {
    let (session, mut room) = load(&state, &ctx, &session_ref(body))?;

    let remaining = game::reshuffle(&mut room, &state.decks).await?;
    info!(room = %room.code, player = %session.player_id, remaining, "deck reshuffled");
    save(&state, room);

    Ok(Json(ReshuffleResponse {
        shuffled: true,
        remaining,
    }))
}
