use blackjack_protocol::*;
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

/// Timeout for every request to the game server
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("server returned {status}: {message}")]
    Server {
        status: reqwest::StatusCode,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// One player's connection to a blackjack rooms server.
///
/// The server session cookie is kept in the client's cookie store; the room
/// code and player id are also remembered and sent in every request body so
/// the session survives a server-side session loss.
pub struct GameClient {
    base_url: Url,
    http_client: HttpClient,
    session: SessionRef,
}

impl GameClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(ClientError::InvalidScheme(scheme.to_string())),
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = HttpClient::builder()
            .cookie_store(true)
            .timeout(TIMEOUT)
            .build()?;

        Ok(Self {
            base_url,
            http_client,
            session: SessionRef::default(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SessionRef {
        &self.session
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        Err(ClientError::Server { status, message })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http_client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http_client
            .get(self.endpoint(path)?)
            .query(&self.session)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn create_room(&mut self) -> Result<CreateRoomResponse> {
        let created: CreateRoomResponse = self.post("create-room", &serde_json::json!({})).await?;
        self.session = SessionRef {
            room_code: Some(created.room_code.clone()),
            player_id: Some(created.player_id),
        };
        Ok(created)
    }

    pub async fn join_room(&mut self, room_code: &str) -> Result<JoinRoomResponse> {
        let request = JoinRoomRequest {
            room_code: Some(room_code.to_string()),
        };
        let joined: JoinRoomResponse = self.post("join-room", &request).await?;
        self.session = SessionRef {
            room_code: Some(joined.room_code.clone()),
            player_id: Some(joined.player_id),
        };
        Ok(joined)
    }

    pub async fn start(&self) -> Result<StartGameResponse> {
        self.post("start-game", &self.session).await
    }

    pub async fn hit(&self) -> Result<HitResponse> {
        self.post("hit", &self.session).await
    }

    pub async fn draw(&self, count: u32) -> Result<DrawResponse> {
        let request = DrawRequest {
            count,
            session: self.session.clone(),
        };
        self.post("draw", &request).await
    }

    pub async fn stay(&self) -> Result<StayResponse> {
        self.post("stay", &self.session).await
    }

    pub async fn reshuffle(&self) -> Result<ReshuffleResponse> {
        self.post("reshuffle", &self.session).await
    }

    pub async fn hand(&self) -> Result<HandResponse> {
        self.get("hand").await
    }

    pub async fn room(&self) -> Result<RoomView> {
        self.get("room").await
    }
}
