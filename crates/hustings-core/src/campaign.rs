//! Campaign phase state machine and per-player cycle registry.
//!
//! Each player has at most one active (non-`Resolved`) cycle; historical
//! cycles are retained for audit and never deleted. Phase-advance events
//! routed through the time engine move the active cycle exactly one state
//! forward per firing. The final `ElectionDay -> Resolved` step is owned
//! by the resolution path: a phase-advance firing on `ElectionDay` waits,
//! and firing on `Resolved` is a no-op.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hustings_types::{CampaignCycle, CampaignPhase, CandidateId, PlayerId, StateCode};
use tracing::info;

/// Errors that can occur in campaign lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    /// A new cycle was requested while a prior cycle is still active.
    #[error("player {player_id} already has active cycle {active_sequence}")]
    CycleAlreadyActive {
        /// The player with the conflicting cycle.
        player_id: PlayerId,
        /// Sequence number of the still-active cycle.
        active_sequence: u32,
    },

    /// The operation requires an active cycle and the player has none.
    #[error("player {player_id} has no active campaign cycle")]
    NoActiveCycle {
        /// The player without an active cycle.
        player_id: PlayerId,
    },
}

/// Result of applying a phase-advance firing to a player's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAdvanceOutcome {
    /// The cycle moved one phase forward.
    Advanced {
        /// Phase before the firing.
        from: CampaignPhase,
        /// Phase after the firing.
        to: CampaignPhase,
    },
    /// The cycle sits in `ElectionDay`; only successful resolution moves
    /// it to `Resolved`.
    AwaitingResolution,
    /// The cycle is already terminal; the firing is a no-op.
    AlreadyResolved,
    /// The player has no cycle at all (e.g. an event outlived its cycle).
    NoCycle,
}

/// Per-player campaign cycle history.
///
/// The registry is plain in-memory state; persistence of cycle records is
/// delegated to the caller after each mutation returns.
#[derive(Debug, Default)]
pub struct CampaignRegistry {
    /// Full cycle history per player, oldest first. The last entry is the
    /// active cycle iff it is not `Resolved`.
    cycles: BTreeMap<PlayerId, Vec<CampaignCycle>>,
}

impl CampaignRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            cycles: BTreeMap::new(),
        }
    }

    /// The player's active (non-`Resolved`) cycle, if any.
    pub fn active(&self, player_id: PlayerId) -> Option<&CampaignCycle> {
        self.cycles
            .get(&player_id)
            .and_then(|history| history.last())
            .filter(|cycle| cycle.is_active())
    }

    /// Mutable access to the player's active cycle, if any.
    fn active_mut(&mut self, player_id: PlayerId) -> Option<&mut CampaignCycle> {
        self.cycles
            .get_mut(&player_id)
            .and_then(|history| history.last_mut())
            .filter(|cycle| cycle.is_active())
    }

    /// The player's complete cycle history, oldest first.
    pub fn history(&self, player_id: PlayerId) -> &[CampaignCycle] {
        self.cycles
            .get(&player_id)
            .map_or(&[], |history| history.as_slice())
    }

    /// The most recent cycle of every player, active or resolved. This is
    /// the set a persistence layer needs to keep in sync.
    pub fn latest_cycles(&self) -> impl Iterator<Item = &CampaignCycle> {
        self.cycles.values().filter_map(|history| history.last())
    }

    /// Create a new cycle in `Announcement` for the player.
    ///
    /// A new cycle is only created once the prior cycle has reached
    /// `Resolved`; the sequence number continues from the player's
    /// highest.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::CycleAlreadyActive`] if a non-`Resolved`
    /// cycle exists.
    pub fn initialize_campaign(
        &mut self,
        player_id: PlayerId,
        candidate: CandidateId,
        opponent: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<CampaignCycle, CampaignError> {
        if let Some(active) = self.active(player_id) {
            return Err(CampaignError::CycleAlreadyActive {
                player_id,
                active_sequence: active.cycle_sequence,
            });
        }

        let history = self.cycles.entry(player_id).or_default();
        let sequence = history
            .last()
            .map_or(1, |prior| prior.cycle_sequence.saturating_add(1));

        let cycle = CampaignCycle {
            player_id,
            cycle_sequence: sequence,
            phase: CampaignPhase::Announcement,
            started_at: now,
            candidate,
            opponent,
            state_modifiers: BTreeMap::new(),
            version: 0,
        };
        history.push(cycle.clone());

        info!(%player_id, sequence, "campaign cycle initialized");
        Ok(cycle)
    }

    /// Apply one phase-advance firing to the player's cycle.
    ///
    /// Moves the cycle exactly one state forward. `ElectionDay` is held
    /// until resolution succeeds, and `Resolved` ignores further firings.
    pub fn advance_phase(&mut self, player_id: PlayerId) -> PhaseAdvanceOutcome {
        let Some(history) = self.cycles.get_mut(&player_id) else {
            return PhaseAdvanceOutcome::NoCycle;
        };
        let Some(cycle) = history.last_mut() else {
            return PhaseAdvanceOutcome::NoCycle;
        };

        match cycle.phase {
            CampaignPhase::Resolved => PhaseAdvanceOutcome::AlreadyResolved,
            CampaignPhase::ElectionDay => PhaseAdvanceOutcome::AwaitingResolution,
            from => match from.next() {
                Some(to) => {
                    cycle.phase = to;
                    info!(%player_id, %from, %to, "campaign phase advanced");
                    PhaseAdvanceOutcome::Advanced { from, to }
                }
                // Unreachable by construction: every non-terminal phase
                // has a successor.
                None => PhaseAdvanceOutcome::AlreadyResolved,
            },
        }
    }

    /// Move an `ElectionDay` cycle into `Resolved` after resolution has
    /// completed successfully.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::NoActiveCycle`] if the player has no
    /// active cycle in `ElectionDay`.
    pub fn mark_resolved(&mut self, player_id: PlayerId) -> Result<(), CampaignError> {
        let cycle = self
            .active_mut(player_id)
            .filter(|cycle| cycle.phase == CampaignPhase::ElectionDay)
            .ok_or(CampaignError::NoActiveCycle { player_id })?;
        cycle.phase = CampaignPhase::Resolved;
        info!(%player_id, sequence = cycle.cycle_sequence, "campaign cycle resolved");
        Ok(())
    }

    /// Accumulate a signed percentage-point adjustment for a state into
    /// the player's active cycle. Contributions sum.
    ///
    /// Returns the new accumulated value for the state.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::NoActiveCycle`] if the player has no
    /// active cycle.
    pub fn record_modifier(
        &mut self,
        player_id: PlayerId,
        state: StateCode,
        delta: f64,
    ) -> Result<f64, CampaignError> {
        let cycle = self
            .active_mut(player_id)
            .ok_or(CampaignError::NoActiveCycle { player_id })?;
        let entry = cycle.state_modifiers.entry(state).or_insert(0.0);
        *entry += delta;
        Ok(*entry)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-01-01T00:00:00Z".parse().unwrap()
    }

    fn init(registry: &mut CampaignRegistry, player: PlayerId) -> CampaignCycle {
        registry
            .initialize_campaign(player, CandidateId::new(), CandidateId::new(), now())
            .unwrap()
    }

    #[test]
    fn first_cycle_starts_at_sequence_one_in_announcement() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        let cycle = init(&mut registry, player);
        assert_eq!(cycle.cycle_sequence, 1);
        assert_eq!(cycle.phase, CampaignPhase::Announcement);
        assert!(registry.active(player).is_some());
    }

    #[test]
    fn second_initialize_while_active_is_rejected() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        init(&mut registry, player);

        let second =
            registry.initialize_campaign(player, CandidateId::new(), CandidateId::new(), now());
        assert!(matches!(
            second,
            Err(CampaignError::CycleAlreadyActive {
                active_sequence: 1,
                ..
            })
        ));
    }

    #[test]
    fn new_cycle_allowed_after_resolution() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        init(&mut registry, player);

        // Walk to ElectionDay, then resolve.
        for _ in 0..3 {
            registry.advance_phase(player);
        }
        registry.mark_resolved(player).unwrap();
        assert!(registry.active(player).is_none());

        let next = init(&mut registry, player);
        assert_eq!(next.cycle_sequence, 2);
        assert_eq!(registry.history(player).len(), 2);
    }

    #[test]
    fn phases_advance_one_step_per_firing() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        init(&mut registry, player);

        assert_eq!(
            registry.advance_phase(player),
            PhaseAdvanceOutcome::Advanced {
                from: CampaignPhase::Announcement,
                to: CampaignPhase::Primary,
            }
        );
        assert_eq!(
            registry.advance_phase(player),
            PhaseAdvanceOutcome::Advanced {
                from: CampaignPhase::Primary,
                to: CampaignPhase::GeneralCampaign,
            }
        );
        assert_eq!(
            registry.advance_phase(player),
            PhaseAdvanceOutcome::Advanced {
                from: CampaignPhase::GeneralCampaign,
                to: CampaignPhase::ElectionDay,
            }
        );
    }

    #[test]
    fn election_day_waits_for_resolution() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        init(&mut registry, player);
        for _ in 0..3 {
            registry.advance_phase(player);
        }

        // Phase-advance firings cannot push past ElectionDay.
        assert_eq!(
            registry.advance_phase(player),
            PhaseAdvanceOutcome::AwaitingResolution
        );
        assert_eq!(
            registry.active(player).unwrap().phase,
            CampaignPhase::ElectionDay
        );
    }

    #[test]
    fn resolved_cycle_ignores_firings() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        init(&mut registry, player);
        for _ in 0..3 {
            registry.advance_phase(player);
        }
        registry.mark_resolved(player).unwrap();

        assert_eq!(
            registry.advance_phase(player),
            PhaseAdvanceOutcome::AlreadyResolved
        );
    }

    #[test]
    fn mark_resolved_requires_election_day() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        init(&mut registry, player);

        assert!(registry.mark_resolved(player).is_err());
    }

    #[test]
    fn modifiers_accumulate_per_state() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        init(&mut registry, player);
        let ohio = StateCode::parse("OH").unwrap();

        let total = registry.record_modifier(player, ohio.clone(), 1.5).unwrap();
        assert!((total - 1.5).abs() < f64::EPSILON);
        let total = registry.record_modifier(player, ohio, -0.5).unwrap();
        assert!((total - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn modifier_without_active_cycle_is_rejected() {
        let mut registry = CampaignRegistry::new();
        let player = PlayerId::new();
        let result = registry.record_modifier(player, StateCode::parse("PA").unwrap(), 1.0);
        assert!(matches!(result, Err(CampaignError::NoActiveCycle { .. })));
    }
}
