//! Election resolution: margins, win probabilities, and the electoral
//! college allocation.
//!
//! Resolution is a pure function of the cycle, its polling volatility, and
//! the baseline table. It runs exactly once per cycle, produces an
//! immutable [`ElectionResult`], and is all-or-nothing: any modifier
//! naming a state the table does not know aborts the whole resolution
//! rather than skipping the state.
//!
//! # Design Principles
//!
//! - Win probabilities are reporting, not mechanism: the state call itself
//!   is deterministic winner-take-all on the adjusted margin.
//! - Volatility widens uncertainty. A volatile race pushes per-state
//!   probabilities toward 50/50 without changing who takes the electors.
//! - The popular estimate is computed independently of the college, so a
//!   college/popular split is a reachable outcome, not an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hustings_types::{
    CampaignCycle, ElectionResult, ElectionSummary, EvLead, StateCode,
};

use crate::baseline::BaselineTable;
use crate::config::ElectionConfig;

/// Errors that can occur during election resolution.
#[derive(Debug, thiserror::Error)]
pub enum ElectionError {
    /// The baseline table holds no states; there is nothing to resolve.
    #[error("baseline table is empty")]
    EmptyBaseline,

    /// One or more cycle modifiers reference states the baseline table
    /// does not contain. No partial result is produced.
    #[error("baseline table missing states referenced by modifiers: {missing:?}")]
    IncompleteData {
        /// The referenced-but-unknown state codes.
        missing: Vec<StateCode>,
    },
}

/// Resolve a campaign cycle into a final election result.
///
/// `volatility` is the cycle's polling volatility (or the configured
/// default when too few snapshots exist); it shapes the reported win
/// probabilities but never the allocation itself.
///
/// # Errors
///
/// Returns [`ElectionError::EmptyBaseline`] for an empty table and
/// [`ElectionError::IncompleteData`] if any modifier names an unknown
/// state. Neither leaves partial state behind.
pub fn resolve(
    cycle: &CampaignCycle,
    volatility: f64,
    table: &BaselineTable,
    config: &ElectionConfig,
    resolved_at: DateTime<Utc>,
) -> Result<ElectionResult, ElectionError> {
    if table.is_empty() {
        return Err(ElectionError::EmptyBaseline);
    }
    let missing: Vec<StateCode> = cycle
        .state_modifiers
        .keys()
        .filter(|state| !table.contains(state))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ElectionError::IncompleteData { missing });
    }

    let scale = config.probability_scale * volatility.max(config.volatility_floor);

    let mut adjusted_margins = BTreeMap::new();
    let mut state_win_probability = BTreeMap::new();
    let mut recounts = Vec::new();
    let mut candidate_electors = 0_u32;
    let mut opponent_electors = 0_u32;
    let mut candidate_popular = 0.0_f64;
    let mut opponent_popular = 0.0_f64;

    for (state, baseline) in table.iter() {
        let modifier = cycle.state_modifiers.get(state).copied().unwrap_or(0.0);
        let margin = baseline.lean + modifier;
        adjusted_margins.insert(state.clone(), margin);

        // Logistic transform; normalized so the pair sums to exactly 1.
        let p_candidate = 1.0 / (1.0 + (-margin / scale).exp());
        let p_opponent = 1.0 - p_candidate;
        let total = p_candidate + p_opponent;
        let mut probabilities = BTreeMap::new();
        probabilities.insert(cycle.candidate, p_candidate / total);
        probabilities.insert(cycle.opponent, p_opponent / total);
        state_win_probability.insert(state.clone(), probabilities);

        // Winner-take-all; an exact-zero margin breaks toward the opponent.
        if margin > 0.0 {
            candidate_electors = candidate_electors.saturating_add(baseline.electors);
        } else {
            opponent_electors = opponent_electors.saturating_add(baseline.electors);
        }

        if margin.abs() <= config.recount_threshold_pct {
            recounts.push(state.clone());
        }

        let estimate = (50.0 + margin / 2.0).clamp(0.0, 100.0);
        candidate_popular += baseline.turnout_weight * estimate;
        opponent_popular += baseline.turnout_weight * (100.0 - estimate);
    }

    let national_popular_leader = if candidate_popular > opponent_popular {
        cycle.candidate
    } else {
        cycle.opponent
    };
    let ev_lead = match candidate_electors.cmp(&opponent_electors) {
        core::cmp::Ordering::Greater => EvLead {
            candidate: cycle.candidate,
            margin: candidate_electors.saturating_sub(opponent_electors),
        },
        core::cmp::Ordering::Less => EvLead {
            candidate: cycle.opponent,
            margin: opponent_electors.saturating_sub(candidate_electors),
        },
        // A dead-even college falls back to the popular estimate.
        core::cmp::Ordering::Equal => EvLead {
            candidate: national_popular_leader,
            margin: 0,
        },
    };

    let mut electoral_college = BTreeMap::new();
    electoral_college.insert(cycle.candidate, candidate_electors);
    electoral_college.insert(cycle.opponent, opponent_electors);

    Ok(ElectionResult {
        player_id: cycle.player_id,
        cycle_sequence: cycle.cycle_sequence,
        resolved_at,
        electoral_college,
        recounts,
        adjusted_margins,
        state_win_probability,
        summary: ElectionSummary {
            ev_lead,
            national_popular_leader,
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::baseline::StateBaseline;
    use hustings_types::{CampaignPhase, CandidateId, PlayerId};

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn cycle() -> CampaignCycle {
        CampaignCycle {
            player_id: PlayerId::new(),
            cycle_sequence: 1,
            phase: CampaignPhase::ElectionDay,
            started_at: at("2025-01-01T00:00:00Z"),
            candidate: CandidateId::new(),
            opponent: CandidateId::new(),
            state_modifiers: BTreeMap::new(),
            version: 0,
        }
    }

    fn state(code: &str) -> StateCode {
        StateCode::parse(code).unwrap()
    }

    fn table(entries: &[(&str, f64, u32, f64)]) -> BaselineTable {
        let states = entries
            .iter()
            .map(|(code, lean, electors, weight)| {
                (
                    state(code),
                    StateBaseline {
                        lean: *lean,
                        electors: *electors,
                        turnout_weight: *weight,
                    },
                )
            })
            .collect();
        BaselineTable::from_states(states)
    }

    #[test]
    fn win_probabilities_sum_to_one_per_state() {
        let cycle = cycle();
        let table = table(&[
            ("OH", -4.5, 17, 1.1),
            ("PA", 0.8, 19, 1.2),
            ("VT", 22.0, 3, 0.3),
        ]);

        let result = resolve(&cycle, 2.0, &table, &ElectionConfig::default(), at("2025-03-01T00:00:00Z")).unwrap();
        for probabilities in result.state_win_probability.values() {
            let sum: f64 = probabilities.values().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn electors_sum_to_the_full_pool() {
        let cycle = cycle();
        let table = table(&[("OH", -4.5, 17, 1.1), ("PA", 0.8, 19, 1.2)]);

        let result = resolve(&cycle, 2.0, &table, &ElectionConfig::default(), at("2025-03-01T00:00:00Z")).unwrap();
        assert_eq!(result.total_electors(), table.total_electors());
    }

    #[test]
    fn narrow_margin_lands_in_the_recount_band() {
        // Lean 0.2 plus a -0.1 modifier gives margin 0.1, inside the
        // default 0.5pp band; the state is still allocated.
        let mut cycle = cycle();
        cycle.state_modifiers.insert(state("PA"), -0.1);
        let table = table(&[("PA", 0.2, 19, 1.2)]);

        let result = resolve(&cycle, 2.0, &table, &ElectionConfig::default(), at("2025-03-01T00:00:00Z")).unwrap();
        assert_eq!(result.recounts, vec![state("PA")]);
        assert_eq!(
            result.electoral_college.get(&cycle.candidate).copied(),
            Some(19)
        );
    }

    #[test]
    fn zero_margin_goes_to_the_opponent_with_recount() {
        let mut cycle = cycle();
        cycle.state_modifiers.insert(state("OH"), 4.5);
        let table = table(&[("OH", -4.5, 17, 1.1)]);

        let result = resolve(&cycle, 2.0, &table, &ElectionConfig::default(), at("2025-03-01T00:00:00Z")).unwrap();
        assert_eq!(
            result.electoral_college.get(&cycle.opponent).copied(),
            Some(17)
        );
        assert_eq!(result.recounts, vec![state("OH")]);
    }

    #[test]
    fn unknown_modifier_state_aborts_resolution() {
        let mut cycle = cycle();
        cycle.state_modifiers.insert(state("ZZ"), 1.0);
        let table = table(&[("OH", -4.5, 17, 1.1)]);

        let result = resolve(&cycle, 2.0, &table, &ElectionConfig::default(), at("2025-03-01T00:00:00Z"));
        assert!(matches!(
            result,
            Err(ElectionError::IncompleteData { missing }) if missing == vec![state("ZZ")]
        ));
    }

    #[test]
    fn empty_table_is_rejected() {
        let result = resolve(
            &cycle(),
            2.0,
            &BaselineTable::default(),
            &ElectionConfig::default(),
            at("2025-03-01T00:00:00Z"),
        );
        assert!(matches!(result, Err(ElectionError::EmptyBaseline)));
    }

    #[test]
    fn higher_volatility_pulls_probabilities_toward_even() {
        let cycle = cycle();
        let table = table(&[("OH", 6.0, 17, 1.1)]);
        let config = ElectionConfig::default();

        let calm = resolve(&cycle, 1.0, &table, &config, at("2025-03-01T00:00:00Z")).unwrap();
        let volatile = resolve(&cycle, 8.0, &table, &config, at("2025-03-01T00:00:00Z")).unwrap();

        let p = |r: &ElectionResult| {
            r.state_win_probability
                .get(&state("OH"))
                .and_then(|m| m.get(&cycle.candidate))
                .copied()
                .unwrap()
        };
        assert!(p(&calm) > p(&volatile));
        assert!(p(&volatile) > 0.5);
    }

    #[test]
    fn ev_tie_reports_the_popular_leader_at_margin_zero() {
        // Two equal-elector states split one each; the candidate's win is
        // far wider, so they lead the turnout-weighted popular estimate.
        let cycle = cycle();
        let table = table(&[("CA", 20.0, 10, 1.0), ("TX", -2.0, 10, 1.0)]);

        let result = resolve(&cycle, 2.0, &table, &ElectionConfig::default(), at("2025-03-01T00:00:00Z")).unwrap();
        assert_eq!(result.summary.ev_lead.margin, 0);
        assert_eq!(result.summary.ev_lead.candidate, cycle.candidate);
        assert_eq!(result.summary.national_popular_leader, cycle.candidate);
    }

    #[test]
    fn college_and_popular_estimate_can_split() {
        // The opponent racks up a huge margin in one low-elector state
        // while the candidate narrowly takes the high-elector states.
        let mut cycle = cycle();
        cycle.state_modifiers.insert(state("WY"), -40.0);
        let table = table(&[
            ("WY", -10.0, 3, 3.0),
            ("PA", 1.0, 19, 1.0),
            ("OH", 1.0, 17, 1.0),
        ]);

        let result = resolve(&cycle, 2.0, &table, &ElectionConfig::default(), at("2025-03-01T00:00:00Z")).unwrap();
        assert_eq!(result.summary.ev_lead.candidate, cycle.candidate);
        assert_eq!(result.summary.national_popular_leader, cycle.opponent);
    }
}
