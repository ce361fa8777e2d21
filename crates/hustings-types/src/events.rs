//! Scheduled event records for the time engine's due-event queue.
//!
//! The payload is a closed sum type with an explicit `kind` discriminator
//! in its JSON form -- never dynamic dispatch on an untyped callback -- so
//! every event a tick can fire is statically known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{EventId, PlayerId};

/// What a scheduled event does when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventPayload {
    /// Generate a polling snapshot for the player's active cycle.
    PollingGeneration {
        /// The player whose campaign is polled.
        player_id: PlayerId,
    },
    /// Advance the player's active cycle one phase forward.
    PhaseAdvance {
        /// The player whose campaign advances.
        player_id: PlayerId,
    },
    /// Resolve the player's cycle into a final election result.
    ///
    /// Only ever scheduled from the `ElectionDay`-entry transition; external
    /// callers cannot enqueue resolution directly.
    ElectionResolution {
        /// The player whose campaign resolves.
        player_id: PlayerId,
    },
    /// Fire-and-forget system notification (e.g. an administrative action).
    SystemBroadcast {
        /// Free-form notice text.
        message: String,
    },
}

impl EventPayload {
    /// The player this event targets, if it targets one.
    pub const fn player_id(&self) -> Option<PlayerId> {
        match self {
            Self::PollingGeneration { player_id }
            | Self::PhaseAdvance { player_id }
            | Self::ElectionResolution { player_id } => Some(*player_id),
            Self::SystemBroadcast { .. } => None,
        }
    }
}

/// An event waiting in (or drained from) the due-event queue.
///
/// An event fires at most once. Events sharing a `scheduled_for` fire in
/// insertion order, which keeps ticks deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScheduledEvent {
    /// Unique event identifier; duplicate IDs are rejected on insert.
    pub id: EventId,
    /// Game time at which the event becomes due.
    pub scheduled_for: DateTime<Utc>,
    /// What the event does.
    pub payload: EventPayload,
    /// Whether to record the event in the fired-event store after firing.
    pub persist: bool,
}
