//! HTTP control client for a single player.
//!
//! Stateless per call: one reusable reqwest client, no other mutable
//! state, at most one outstanding request per call site. Every failure -
//! transport, HTTP status, undecodable body, or a refusal in the envelope -
//! folds into [`ControlError`]; nothing escapes as a panic or an unhandled
//! fault.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::protocol::{
    EpisodeRequest, PlaybackStatus, PlayerInfo, RemoteResponse, SeekRequest, SkipRequest,
    VolumeRequest,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Overall per-request timeout; a player that never answers fails with a
/// transport error instead of hanging the session.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ControlError {
    /// Connection refused, DNS failure, or timeout.
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    /// The player answered with a non-success HTTP status.
    #[error("player returned HTTP {0}")]
    Status(StatusCode),
    /// The player answered 200 but the body did not decode.
    #[error("undecodable response body: {0}")]
    Decode(#[source] serde_json::Error),
    /// A well-formed envelope with `success: false`.
    #[error("player refused the request: {0}")]
    Refused(String),
}

pub struct ControlClient {
    base: String,
    http: Client,
}

impl ControlClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        // Parse up front so a bad address fails here, not on first use.
        let parsed = Url::parse(base_url)?;
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            base: parsed.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `GET /` - player name, version, upstream server.
    pub async fn info(&self) -> Result<PlayerInfo, ControlError> {
        self.get("/").await
    }

    /// `GET /status` - current playback snapshot.
    pub async fn status(&self) -> Result<PlaybackStatus, ControlError> {
        self.get("/status").await
    }

    /// `POST /play` - start playback of the given episode.
    pub async fn play(&self, episode: &EpisodeRequest) -> Result<(), ControlError> {
        self.post_ack("/play", Some(episode)).await
    }

    pub async fn pause(&self) -> Result<(), ControlError> {
        self.post_ack("/pause", None::<&()>).await
    }

    pub async fn resume(&self) -> Result<(), ControlError> {
        self.post_ack("/resume", None::<&()>).await
    }

    pub async fn stop(&self) -> Result<(), ControlError> {
        self.post_ack("/stop", None::<&()>).await
    }

    /// Relative seek. The sign travels unchanged; clamping to the valid
    /// range is the player's responsibility.
    pub async fn skip(&self, seconds: i64) -> Result<(), ControlError> {
        self.post_ack("/skip", Some(&SkipRequest { seconds })).await
    }

    /// Absolute seek.
    pub async fn seek(&self, position: i64) -> Result<(), ControlError> {
        self.post_ack("/seek", Some(&SeekRequest { position })).await
    }

    /// Sets the output level. Expects 0.0..=1.0; the caller clamps, this
    /// client transmits verbatim.
    pub async fn set_volume(&self, volume: f32) -> Result<(), ControlError> {
        self.post_ack("/volume", Some(&VolumeRequest { volume }))
            .await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ControlError> {
        debug!(path, "control GET");
        let response = self
            .http
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(ControlError::Transport)?;
        let envelope = Self::decode::<T>(response).await?;
        match envelope.data {
            Some(data) => Ok(data),
            None => Err(ControlError::Decode(<serde_json::Error as serde::de::Error>::custom(
                "success envelope without a data field",
            ))),
        }
    }

    async fn post_ack<B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ControlError> {
        debug!(path, "control POST");
        let mut request = self.http.post(self.endpoint(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(ControlError::Transport)?;
        // Acknowledgements may carry data; only the success flag matters.
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<RemoteResponse<T>, ControlError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::Status(status));
        }
        let body = response.text().await.map_err(ControlError::Transport)?;
        let envelope: RemoteResponse<T> =
            serde_json::from_str(&body).map_err(ControlError::Decode)?;
        if !envelope.success {
            return Err(ControlError::Refused(
                envelope
                    .message
                    .unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        Ok(envelope)
    }
}
