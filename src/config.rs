//! Configuration management.
//!
//! Settings resolve in three layers: built-in defaults, an optional config
//! file in the platform config directory, then `EMBERWOOD_*` environment
//! variables. CLI flags override the resolved values at the point of use.

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Settings {
    /// How long a discovery window stays open, in seconds.
    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,

    /// Overall timeout for one control request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between status fetches while monitoring, in seconds.
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
}

fn default_discovery_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_monitor_interval_secs() -> u64 {
    2
}

/// Config directory: `EMBERWOOD_CONFIG_DIR` override, then the platform
/// convention, then the current directory.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EMBERWOOD_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library/Application Support/emberwood-remote");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("emberwood-remote");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config/emberwood-remote");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("emberwood-remote");
        }
    }

    PathBuf::from(".")
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config_file = config_dir().join("config");

        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::with_name(&config_file.to_string_lossy()).required(false),
            )
            .add_source(::config::Environment::with_prefix("EMBERWOOD").try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
