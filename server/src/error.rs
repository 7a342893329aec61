use crate::deck::DeckError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blackjack_protocol::ErrorBody;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid session")]
    InvalidSession,
    #[error("Missing room code")]
    MissingRoomCode,
    #[error("Room not found")]
    RoomNotFound(String),
    #[error("Game has not started")]
    NotStarted,
    #[error("Game already in progress")]
    AlreadyStarted,
    #[error("Game is over: {0}")]
    GameOver(String),
    #[error("Your hand is finished: {0}")]
    PlayerDone(String),
    #[error("Room is full")]
    RoomFull,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("Draw count must be between 1 and {max}, got {0}", max = crate::game::MAX_DRAW)]
    InvalidCount(u32),
    #[error("deck service error: {0}")]
    Deck(#[from] DeckError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidSession
            | Error::MissingRoomCode
            | Error::InvalidCount(_)
            | Error::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Error::RoomNotFound(_) => StatusCode::NOT_FOUND,
            Error::NotStarted
            | Error::AlreadyStarted
            | Error::GameOver(_)
            | Error::PlayerDone(_)
            | Error::RoomFull => StatusCode::CONFLICT,
            // the shoe ran dry or its id is gone: our state, not the upstream's
            Error::Deck(DeckError::Exhausted { .. } | DeckError::UnknownDeck(_)) => {
                StatusCode::CONFLICT
            }
            Error::Deck(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        } else {
            warn!(%status, error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
