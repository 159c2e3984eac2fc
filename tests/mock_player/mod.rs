#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]
//! Mock Emberwood player for integration tests.
//!
//! Serves the full control surface on a random local port, records every
//! request it sees, and exposes knobs for the failure modes the client has
//! to survive: refused commands, malformed bodies, HTTP error statuses.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug)]
struct MockPlayerState {
    is_playing: bool,
    position: i64,
    duration: i64,
    volume: f64,
    current_episode: Option<Value>,
    refuse_commands: bool,
    malformed_status: bool,
    status_http_error: Option<u16>,
    requests: Vec<RecordedRequest>,
}

impl Default for MockPlayerState {
    fn default() -> Self {
        Self {
            is_playing: false,
            position: 0,
            duration: 0,
            volume: 0.5,
            current_episode: None,
            refuse_commands: false,
            malformed_status: false,
            status_http_error: None,
            requests: Vec::new(),
        }
    }
}

type Shared = Arc<RwLock<MockPlayerState>>;

pub struct MockPlayer {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl MockPlayer {
    /// Starts a mock player on a random port.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(RwLock::new(MockPlayerState::default()));

        let app = Router::new()
            .route("/", get(info))
            .route("/status", get(status))
            .route("/play", post(play))
            .route("/pause", post(pause))
            .route("/resume", post(resume))
            .route("/stop", post(stop))
            .route("/skip", post(skip))
            .route("/seek", post(seek))
            .route("/volume", post(volume))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn set_playing(&self, playing: bool) {
        self.state.write().await.is_playing = playing;
    }

    pub async fn set_status(&self, is_playing: bool, position: i64, duration: i64, volume: f64) {
        let mut state = self.state.write().await;
        state.is_playing = is_playing;
        state.position = position;
        state.duration = duration;
        state.volume = volume;
    }

    /// Makes every command endpoint answer `{"success": false}`.
    pub async fn refuse_commands(&self, refuse: bool) {
        self.state.write().await.refuse_commands = refuse;
    }

    /// Makes `/status` answer 200 with a non-JSON body.
    pub async fn malformed_status(&self, malformed: bool) {
        self.state.write().await.malformed_status = malformed;
    }

    /// Makes `/status` answer with the given HTTP status code.
    pub async fn fail_status_with(&self, code: u16) {
        self.state.write().await.status_http_error = Some(code);
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn requests_for(&self, path: &str) -> Vec<RecordedRequest> {
        self.state
            .read()
            .await
            .requests
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }
}

impl Drop for MockPlayer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record(state: &Shared, method: &str, path: &str, body: Option<Value>) {
    state.write().await.requests.push(RecordedRequest {
        method: method.to_string(),
        path: path.to_string(),
        body,
    });
}

async fn info(State(state): State<Shared>) -> Json<Value> {
    record(&state, "GET", "/", None).await;
    Json(json!({
        "success": true,
        "data": {
            "name": "Mock Player",
            "version": "0.1.0",
            "server_url": null
        }
    }))
}

async fn status(State(state): State<Shared>) -> Response {
    record(&state, "GET", "/status", None).await;
    let s = state.read().await;
    if let Some(code) = s.status_http_error {
        let code = StatusCode::from_u16(code).unwrap();
        return (code, "server error").into_response();
    }
    if s.malformed_status {
        return (StatusCode::OK, "this is not json").into_response();
    }
    Json(json!({
        "success": true,
        "data": {
            "is_playing": s.is_playing,
            "position": s.position,
            "duration": s.duration,
            "volume": s.volume,
            "current_episode": s.current_episode
        }
    }))
    .into_response()
}

async fn ack(state: &Shared) -> Json<Value> {
    if state.read().await.refuse_commands {
        Json(json!({"success": false, "message": "player busy"}))
    } else {
        Json(json!({"success": true}))
    }
}

async fn play(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    record(&state, "POST", "/play", Some(body.clone())).await;
    let response = ack(&state).await;
    if response.0["success"] == json!(true) {
        let mut s = state.write().await;
        s.is_playing = true;
        s.current_episode = Some(json!({
            "episode_id": body.get("episode_id").cloned().unwrap_or(Value::Null),
            "episode_title": body.get("episode_title").cloned().unwrap_or(json!("")),
            "podcast_name": body.get("podcast_name").cloned().unwrap_or(json!("")),
            "episode_artwork": Value::Null,
            "duration": body.get("episode_duration").and_then(Value::as_i64).unwrap_or(0)
        }));
    }
    response
}

async fn pause(State(state): State<Shared>) -> Json<Value> {
    record(&state, "POST", "/pause", None).await;
    let response = ack(&state).await;
    if response.0["success"] == json!(true) {
        state.write().await.is_playing = false;
    }
    response
}

async fn resume(State(state): State<Shared>) -> Json<Value> {
    record(&state, "POST", "/resume", None).await;
    let response = ack(&state).await;
    if response.0["success"] == json!(true) {
        state.write().await.is_playing = true;
    }
    response
}

async fn stop(State(state): State<Shared>) -> Json<Value> {
    record(&state, "POST", "/stop", None).await;
    let response = ack(&state).await;
    if response.0["success"] == json!(true) {
        let mut s = state.write().await;
        s.is_playing = false;
        s.current_episode = None;
    }
    response
}

async fn skip(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    record(&state, "POST", "/skip", Some(body)).await;
    ack(&state).await
}

async fn seek(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    record(&state, "POST", "/seek", Some(body)).await;
    ack(&state).await
}

async fn volume(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    record(&state, "POST", "/volume", Some(body.clone())).await;
    let response = ack(&state).await;
    if response.0["success"] == json!(true) {
        if let Some(v) = body.get("volume").and_then(Value::as_f64) {
            state.write().await.volume = v;
        }
    }
    response
}
