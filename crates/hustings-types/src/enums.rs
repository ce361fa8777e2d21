//! Enumeration types shared across the Hustings workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle phase of a campaign cycle.
///
/// Phases are strictly linear: `Announcement -> Primary -> GeneralCampaign
/// -> ElectionDay -> Resolved`. There are no back-transitions, and the
/// final step into [`Resolved`](Self::Resolved) only happens once election
/// resolution has completed successfully.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum CampaignPhase {
    /// The candidate has declared; polling is at its noisiest.
    Announcement,
    /// Intra-party contest.
    Primary,
    /// Head-to-head general campaign.
    GeneralCampaign,
    /// Voting day; the resolution engine is scheduled on entry.
    ElectionDay,
    /// Terminal phase: the cycle has a final election result.
    Resolved,
}

impl CampaignPhase {
    /// Return the next phase in the linear sequence, or `None` if the
    /// cycle is already [`Resolved`](Self::Resolved).
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Announcement => Some(Self::Primary),
            Self::Primary => Some(Self::GeneralCampaign),
            Self::GeneralCampaign => Some(Self::ElectionDay),
            Self::ElectionDay => Some(Self::Resolved),
            Self::Resolved => None,
        }
    }

    /// Whether this phase is terminal.
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl core::fmt::Display for CampaignPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Announcement => "announcement",
            Self::Primary => "primary",
            Self::GeneralCampaign => "general_campaign",
            Self::ElectionDay => "election_day",
            Self::Resolved => "resolved",
        };
        write!(f, "{name}")
    }
}

/// Direction of a polling trend over an aggregation window.
///
/// Compared against a small configured epsilon so sampling noise does not
/// register as movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TrendDirection {
    /// The leading candidate gained support across the window.
    Rising,
    /// The leading candidate lost support across the window.
    Falling,
    /// Movement stayed within the noise epsilon.
    Stable,
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_linear_and_terminate() {
        let mut phase = CampaignPhase::Announcement;
        let mut steps = 0;
        while let Some(next) = phase.next() {
            phase = next;
            steps += 1;
        }
        assert_eq!(phase, CampaignPhase::Resolved);
        assert_eq!(steps, 4);
    }

    #[test]
    fn resolved_has_no_successor() {
        assert!(CampaignPhase::Resolved.next().is_none());
        assert!(CampaignPhase::Resolved.is_resolved());
        assert!(!CampaignPhase::ElectionDay.is_resolved());
    }

    #[test]
    fn phase_serde_roundtrip() {
        let json = serde_json::to_string(&CampaignPhase::GeneralCampaign).ok();
        assert_eq!(json.as_deref(), Some("\"GeneralCampaign\""));
    }
}
