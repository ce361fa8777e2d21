//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for tick reports and the
//! live [`Simulation`] behind a single read-write lock. Control
//! endpoints and the tick loop both go through that lock, so every
//! mutation of game state serializes in one critical section.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hustings_core::simulation::{Simulation, TickReport};
use tokio::sync::{broadcast, RwLock};

/// Capacity of the broadcast channel for tick reports.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// JSON-serializable tick projection pushed over the `WebSocket`.
///
/// A lightweight summary of [`TickReport`]: counts instead of full
/// payloads, so a dashboard can stay responsive while the REST API
/// serves the detail.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TickBroadcast {
    /// Game time after the tick.
    pub game_time: DateTime<Utc>,
    /// Whether the clock was paused.
    pub paused: bool,
    /// Number of events that fired.
    pub events_fired: usize,
    /// Number of polling snapshots generated.
    pub snapshots: usize,
    /// Number of phase transitions applied.
    pub phase_changes: usize,
    /// Number of election results produced.
    pub resolutions: usize,
    /// System notices fired this tick.
    pub notices: Vec<String>,
    /// Number of handler failures.
    pub failures: usize,
}

impl From<&TickReport> for TickBroadcast {
    fn from(report: &TickReport) -> Self {
        Self {
            game_time: report.game_time,
            paused: report.paused,
            events_fired: report.fired_events.len(),
            snapshots: report.snapshots.len(),
            phase_changes: report.phase_changes.len(),
            resolutions: report.resolutions.len(),
            notices: report.notices.clone(),
            failures: report.failures.len(),
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// broadcast sender pushes tick projections to all connected
/// `WebSocket` clients; the simulation lock is shared with the engine
/// binary's tick loop.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for tick projections.
    pub tx: broadcast::Sender<TickBroadcast>,
    /// The live simulation, shared with the tick loop.
    pub sim: Arc<RwLock<Simulation>>,
}

impl AppState {
    /// Create application state around an existing simulation handle.
    pub fn new(sim: Arc<RwLock<Simulation>>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx, sim }
    }

    /// Subscribe to the tick broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a tick projection to all connected clients.
    ///
    /// Returns the number of receivers that received the message;
    /// 0 when no clients are connected, which is not an error.
    pub fn broadcast(&self, projection: &TickBroadcast) -> usize {
        // send returns Err only when there are zero receivers.
        self.tx.send(projection.clone()).unwrap_or(0)
    }
}
