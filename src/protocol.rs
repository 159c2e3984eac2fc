//! Wire types for the player control surface.
//!
//! Every control response is wrapped in a `{success, message?, data?}`
//! envelope. Decoding is deliberately lenient: unknown fields are ignored
//! and an envelope that does not claim success counts as a failure.

use serde::{Deserialize, Serialize};

/// Response envelope carried by every control endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResponse<T> {
    /// Absent `success` deserializes as `false`.
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Player identity, returned by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub version: String,
    /// Upstream server the player is attached to, if any.
    pub server_url: Option<String>,
}

/// Episode descriptor inside a playback status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentEpisode {
    pub episode_id: Option<i64>,
    pub episode_title: String,
    pub podcast_name: String,
    pub episode_artwork: Option<String>,
    #[serde(default)]
    pub duration: i64,
}

/// Snapshot of player state, returned by `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    /// Current position in seconds.
    pub position: i64,
    /// Total duration in seconds.
    pub duration: i64,
    /// Volume from 0.0 to 1.0.
    pub volume: f32,
    pub current_episode: Option<CurrentEpisode>,
}

/// Playback request for `POST /play`.
///
/// Every field serializes unconditionally: an absent `episode_duration`
/// goes out as an explicit JSON `null`, which the player reads as
/// "determine the duration yourself". A `0` would not convey that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRequest {
    pub episode_id: Option<i64>,
    pub episode_url: String,
    pub episode_title: String,
    pub podcast_name: String,
    pub episode_duration: Option<i64>,
    pub episode_artwork: Option<String>,
    /// Resume offset in seconds.
    pub start_position: Option<i64>,
}

/// Body for `POST /skip`. Positive skips forward, negative backward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipRequest {
    pub seconds: i64,
}

/// Body for `POST /seek`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeekRequest {
    pub position: i64,
}

/// Body for `POST /volume`. Range 0.0 to 1.0; the caller clamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub volume: f32,
}
