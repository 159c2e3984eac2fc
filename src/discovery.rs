//! mDNS discovery of Emberwood players.
//!
//! Players advertise `_emberwood-remote._tcp.local.`. The mdns-sd daemon
//! delivers browse events on its own thread; a blocking forwarder bridges
//! them onto a tokio channel so the registry and the caller never touch
//! mdns-sd types directly, and tests can feed the channel without a
//! network.

use std::collections::HashMap;
use std::time::Duration;

use mdns_sd::{ResolvedService, ServiceDaemon, ServiceEvent};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::{PlayerEvent, PlayerRecord, PlayerRegistry};

/// Service type advertised by Emberwood players.
pub const SERVICE_TYPE: &str = "_emberwood-remote._tcp.local.";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The local mDNS stack could not be acquired at all. Fatal for
    /// discovery, but never for a direct-connect flow that bypasses it.
    #[error("mDNS daemon unavailable: {0}")]
    Daemon(#[from] mdns_sd::Error),
}

/// Handle on an active browse. `start` returns the handle plus the event
/// receiver; `stop` consumes the handle, so it can only be called once.
pub struct DirectoryClient {
    daemon: ServiceDaemon,
    service_type: String,
    forwarder: JoinHandle<()>,
}

impl DirectoryClient {
    /// Starts browsing for `service_type` and returns the event stream.
    pub fn start(
        service_type: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PlayerEvent>), DiscoveryError> {
        let daemon = ServiceDaemon::new()?;
        let browse = daemon.browse(service_type)?;
        let (tx, rx) = mpsc::unbounded_channel();

        // recv() blocks until the daemon shuts down, so keep it off the
        // async runtime.
        let forwarder = tokio::task::spawn_blocking(move || forward_events(browse, tx));

        let client = Self {
            daemon,
            service_type: service_type.to_string(),
            forwarder,
        };
        Ok((client, rx))
    }

    /// Releases the mDNS daemon and joins the forwarder. Shutting the
    /// daemon down disconnects the browse channel, which ends the
    /// forwarder and closes the event stream.
    pub async fn stop(self) {
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            debug!("stop_browse failed: {e}");
        }
        if let Err(e) = self.daemon.shutdown() {
            debug!("mDNS daemon shutdown failed: {e}");
        }
        let _ = self.forwarder.await;
    }
}

fn forward_events(
    browse: mdns_sd::Receiver<ServiceEvent>,
    tx: mpsc::UnboundedSender<PlayerEvent>,
) {
    while let Ok(event) = browse.recv() {
        let translated = match event {
            // `resolved` is a `Box<ResolvedService>`; deref to the record fn.
            ServiceEvent::ServiceResolved(resolved) => match record_from_info(&resolved) {
                Some(record) => PlayerEvent::Added(record),
                None => {
                    // Advertisement seen but no usable address; the
                    // directory stays usable without it.
                    debug!(
                        name = resolved.get_fullname(),
                        "dropping advertisement without a resolvable address"
                    );
                    continue;
                }
            },
            ServiceEvent::ServiceRemoved(_, fullname) => PlayerEvent::Removed { name: fullname },
            _ => continue,
        };
        if tx.send(translated).is_err() {
            break;
        }
    }
}

fn record_from_info(resolved: &ResolvedService) -> Option<PlayerRecord> {
    let address = resolved.get_addresses().iter().next()?;
    let properties: HashMap<String, String> = resolved
        .get_properties()
        .iter()
        .map(|property| (property.key().to_string(), property.val_str().to_string()))
        .collect();

    Some(PlayerRecord {
        name: resolved.get_fullname().to_string(),
        host: address.to_string(),
        port: resolved.get_port(),
        properties,
    })
}

/// Applies events from `events` to `registry` until the window elapses,
/// `cancel` fires, or the channel closes.
pub async fn collect_events(
    mut events: mpsc::UnboundedReceiver<PlayerEvent>,
    registry: &PlayerRegistry,
    window: Duration,
    cancel: &CancellationToken,
) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = cancel.cancelled() => {
                info!("discovery interrupted before the window elapsed");
                break;
            }
            event = events.recv() => match event {
                Some(event) => registry.apply(event),
                None => break,
            },
        }
    }
}

/// Runs a full discovery window and returns the final snapshot.
///
/// The daemon is stopped on every path before the snapshot is returned;
/// the registry is consumed here, so no further mutation of the result is
/// possible. An empty window with no advertisements yields an empty map.
pub async fn discover_players(
    window: Duration,
    cancel: &CancellationToken,
) -> Result<HashMap<String, PlayerRecord>, DiscoveryError> {
    info!(
        service = SERVICE_TYPE,
        window_secs = window.as_secs(),
        "browsing for players"
    );

    let (client, events) = DirectoryClient::start(SERVICE_TYPE)?;
    let registry = PlayerRegistry::new();
    collect_events(events, &registry, window, cancel).await;
    client.stop().await;

    let snapshot = registry.snapshot();
    info!(found = snapshot.len(), "discovery window closed");
    Ok(snapshot)
}
