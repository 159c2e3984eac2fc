//! Thread-safe registry of players seen on the network.
//!
//! The registry is fed from the discovery event channel and polled from the
//! caller's task. One mutex guards both directions; critical sections are
//! map operations only, never network I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

/// One discovered player: advertisement name, resolved address, and the
/// TXT properties from its advertisement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecord {
    /// Full advertisement name, unique per player instance.
    pub name: String,
    pub host: String,
    pub port: u16,
    pub properties: HashMap<String, String>,
}

impl PlayerRecord {
    /// Base URL of the player's control surface.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Add/remove notification from the directory service.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Added(PlayerRecord),
    Removed { name: String },
}

/// Identity-to-record map. `apply` is the only mutator and may run
/// concurrently with `snapshot` from another thread.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Mutex<HashMap<String, PlayerRecord>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one directory event. A duplicate add refreshes the record in
    /// place; removing an unknown identity is a no-op.
    pub fn apply(&self, event: PlayerEvent) {
        let mut players = self.players.lock().expect("player registry mutex poisoned");
        match event {
            PlayerEvent::Added(record) => {
                debug!(name = %record.name, host = %record.host, port = record.port, "player added");
                players.insert(record.name.clone(), record);
            }
            PlayerEvent::Removed { name } => {
                if players.remove(&name).is_some() {
                    debug!(name = %name, "player removed");
                }
            }
        }
    }

    /// Point-in-time copy of the registry. Mutating the returned map never
    /// affects the registry.
    pub fn snapshot(&self) -> HashMap<String, PlayerRecord> {
        self.players
            .lock()
            .expect("player registry mutex poisoned")
            .clone()
    }
}
