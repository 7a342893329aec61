use crate::error::{Error, Result};
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
};
use blackjack_protocol::SessionRef;
use parking_lot::Mutex;
use std::{collections::HashMap, convert::Infallible};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "blackjack_session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub player_id: Uuid,
    pub room_code: String,
}

/// Server-side sessions keyed by the opaque cookie token.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `session` to the caller's token, minting one if needed.
    pub fn save(&self, token: Option<Uuid>, session: Session) -> Uuid {
        let token = token.unwrap_or_else(Uuid::new_v4);
        self.inner.lock().insert(token, session);
        token
    }

    pub fn get(&self, token: Uuid) -> Option<Session> {
        self.inner.lock().get(&token).cloned()
    }

    /// Forget every session pointing at `room_code`.
    pub fn drop_room(&self, room_code: &str) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.len();
        inner.retain(|_, s| s.room_code != room_code);
        before - inner.len()
    }
}

pub fn session_cookie(token: Uuid) -> HeaderValue {
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    // a hyphenated uuid is always a valid header value
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn token_from_cookies(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

/// Session context of the current request, looked up from the cookie.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub token: Option<Uuid>,
    pub session: Option<Session>,
}

impl SessionContext {
    /// The cookie session wins; otherwise fall back to the ids the caller
    /// sent in the body or query string.
    pub fn resolve(&self, fallback: &SessionRef) -> Result<Session> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        match (&fallback.room_code, fallback.player_id) {
            (Some(room_code), Some(player_id)) if !room_code.is_empty() => Ok(Session {
                player_id,
                room_code: room_code.trim().to_uppercase(),
            }),
            _ => Err(Error::InvalidSession),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = token_from_cookies(parts);
        let session = token.and_then(|t| state.sessions.get(t));
        Ok(SessionContext { token, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_token_from_cookie_header() {
        let token = Uuid::new_v4();
        let parts = parts_with_cookie(&format!("theme=dark; {SESSION_COOKIE}={token}; other=1"));
        assert_eq!(token_from_cookies(&parts), Some(token));

        let parts = parts_with_cookie(&format!("{SESSION_COOKIE}=not-a-uuid"));
        assert_eq!(token_from_cookies(&parts), None);
    }

    #[test]
    fn test_save_reuses_token() {
        let store = SessionStore::new();
        let player_id = Uuid::new_v4();
        let token = store.save(
            None,
            Session {
                player_id,
                room_code: "AAAAAA".into(),
            },
        );
        let again = store.save(
            Some(token),
            Session {
                player_id,
                room_code: "BBBBBB".into(),
            },
        );
        assert_eq!(token, again);
        assert_eq!(store.get(token).map(|s| s.room_code), Some("BBBBBB".to_string()));
        assert_eq!(store.drop_room("BBBBBB"), 1);
        assert!(store.get(token).is_none());
    }

    #[test]
    fn test_resolve_prefers_cookie_session() {
        let cookie = Session {
            player_id: Uuid::new_v4(),
            room_code: "COOKIE".into(),
        };
        let ctx = SessionContext {
            token: Some(Uuid::new_v4()),
            session: Some(cookie.clone()),
        };
        let body = SessionRef {
            room_code: Some("BODY01".into()),
            player_id: Some(Uuid::new_v4()),
        };
        assert_eq!(ctx.resolve(&body).unwrap(), cookie);

        let anonymous = SessionContext::default();
        let resolved = anonymous.resolve(&body).unwrap();
        assert_eq!(resolved.room_code, "BODY01");
        assert!(matches!(
            anonymous.resolve(&SessionRef::default()),
            Err(Error::InvalidSession)
        ));
    }
}
