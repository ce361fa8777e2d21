//! Core entity structs for campaign cycles, polling, and election results.
//!
//! Everything here is a plain data record: behavior (phase transitions,
//! snapshot generation, resolution math) lives in `hustings-core`. All
//! records serialize to JSON for the observer API and persistence, and
//! export `TypeScript` bindings for the game dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CampaignPhase, TrendDirection};
use crate::ids::{CandidateId, PlayerId};

/// Error returned when a state code string fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid state code {0:?}: expected two ASCII uppercase letters")]
pub struct StateCodeError(pub String);

/// Two-letter postal abbreviation for a state (e.g. `OH`, `PA`).
///
/// Validated on construction and on deserialization, so a malformed code
/// from an external caller is rejected at the boundary and never reaches
/// the core.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(try_from = "String", into = "String")]
#[ts(export, export_to = "bindings/", type = "string")]
pub struct StateCode(String);

impl StateCode {
    /// Parse and validate a state code.
    ///
    /// # Errors
    ///
    /// Returns [`StateCodeError`] unless the input is exactly two ASCII
    /// uppercase letters.
    pub fn parse(code: &str) -> Result<Self, StateCodeError> {
        let valid = code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase());
        if valid {
            Ok(Self(code.to_owned()))
        } else {
            Err(StateCodeError(code.to_owned()))
        }
    }

    /// Return the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StateCode {
    type Error = StateCodeError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::parse(&code)
    }
}

impl From<StateCode> for String {
    fn from(code: StateCode) -> Self {
        code.0
    }
}

impl core::fmt::Display for StateCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One campaign cycle for one player.
///
/// Exactly one non-[`Resolved`](CampaignPhase::Resolved) cycle may exist
/// per player at any time; historical cycles are retained for audit and
/// never deleted. The `version` field is an optimistic-concurrency stamp:
/// the storage layer rejects a save whose expected version no longer
/// matches the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CampaignCycle {
    /// The player running this campaign.
    pub player_id: PlayerId,
    /// Monotonic cycle counter per player, starting at 1.
    pub cycle_sequence: u32,
    /// Current lifecycle phase.
    pub phase: CampaignPhase,
    /// Game time at which the cycle was created.
    pub started_at: DateTime<Utc>,
    /// The player's candidate. Positive state margins favor this candidate.
    pub candidate: CandidateId,
    /// The opposing candidate.
    pub opponent: CandidateId,
    /// Accumulated signed percentage-point adjustments per state, summed
    /// from outreach, donor funding, and event activity over the cycle.
    pub state_modifiers: BTreeMap<StateCode, f64>,
    /// Optimistic-concurrency version stamp, incremented on every save.
    pub version: u64,
}

impl CampaignCycle {
    /// Whether this cycle still accepts ticks (not yet resolved).
    pub const fn is_active(&self) -> bool {
        !self.phase.is_resolved()
    }

    /// Sum of all accumulated state modifiers.
    pub fn national_modifier_total(&self) -> f64 {
        self.state_modifiers.values().sum()
    }
}

/// A single public-opinion snapshot for a player's campaign.
///
/// Immutable once created; the per-player snapshot sequence is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PollingSnapshot {
    /// The player this snapshot belongs to.
    pub player_id: PlayerId,
    /// The cycle the snapshot was generated against.
    pub cycle_sequence: u32,
    /// Game time at capture.
    pub captured_at: DateTime<Utc>,
    /// Support percentage per candidate. Values sum to at most 100; the
    /// remainder is the implicit undecided bucket.
    pub support_by_candidate: BTreeMap<CandidateId, f64>,
    /// The stochastic jitter magnitude that was applied to this sample.
    pub sample_noise: f64,
}

impl PollingSnapshot {
    /// The candidate currently leading this snapshot, if any support was
    /// recorded.
    pub fn leader(&self) -> Option<CandidateId> {
        self.support_by_candidate
            .iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(id, _)| *id)
    }
}

/// Derived polling statistics over a caller-specified window.
///
/// Never stored; recomputed on demand from the snapshot sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PollingAggregate {
    /// Arithmetic mean of the leading candidate's support across the window.
    pub average_support: f64,
    /// Sample standard deviation of the same series.
    pub volatility: f64,
    /// Direction of movement comparing the newest sample to the oldest.
    pub trend_direction: TrendDirection,
    /// The window length the aggregate was computed over, in hours.
    pub window_hours: u32,
    /// Number of snapshots that fell inside the window.
    pub sample_count: u32,
}

/// The electoral-vote leader and their margin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EvLead {
    /// The candidate holding more electors.
    pub candidate: CandidateId,
    /// Absolute elector difference between the two candidates.
    pub margin: u32,
}

/// Human-facing summary attached to an election result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ElectionSummary {
    /// Electoral-vote leader and margin.
    pub ev_lead: EvLead,
    /// Candidate leading the turnout-weighted national popular estimate.
    /// Can diverge from the EV leader, modeling real college/popular splits.
    pub national_popular_leader: CandidateId,
}

/// Final outcome of a resolved campaign cycle.
///
/// Computed exactly once at resolution time and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ElectionResult {
    /// The player whose cycle resolved.
    pub player_id: PlayerId,
    /// The cycle that resolved.
    pub cycle_sequence: u32,
    /// Game time at resolution.
    pub resolved_at: DateTime<Utc>,
    /// Elector count per candidate. Counts sum to the baseline table's
    /// full elector pool.
    pub electoral_college: BTreeMap<CandidateId, u32>,
    /// States whose adjusted margin fell inside the recount band. The
    /// winner-take-all allocation stands as the provisional call.
    pub recounts: Vec<StateCode>,
    /// Signed percentage-point margin per state; positive favors the
    /// player's candidate.
    pub adjusted_margins: BTreeMap<StateCode, f64>,
    /// Per-state win probability per candidate. Probabilities within each
    /// state sum to 1.
    pub state_win_probability: BTreeMap<StateCode, BTreeMap<CandidateId, f64>>,
    /// Headline summary.
    pub summary: ElectionSummary,
}

impl ElectionResult {
    /// Total electors allocated across all candidates.
    pub fn total_electors(&self) -> u32 {
        self.electoral_college
            .values()
            .fold(0_u32, |acc, n| acc.saturating_add(*n))
    }
}
