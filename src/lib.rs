//! Emberwood Remote - discovery and control client for Emberwood players
//!
//! Emberwood players advertise themselves on the local network via mDNS
//! (`_emberwood-remote._tcp.local.`) and expose a small JSON-over-HTTP
//! control surface.
//!
//! This library provides:
//! - mDNS discovery of players with a bounded, cancellable browse window
//! - A thread-safe registry of currently-reachable players
//! - An HTTP control client bound to a single player
//! - An interactive control session with live status monitoring

pub mod config;
pub mod control;
pub mod discovery;
pub mod protocol;
pub mod registry;
pub mod session;
