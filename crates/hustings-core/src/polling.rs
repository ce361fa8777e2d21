//! Polling snapshot generation and trend aggregation.
//!
//! Snapshot generation is the only stochastic part of the simulation. The
//! RNG is injected by the caller, so a seeded generator reproduces the
//! exact snapshot sequence and tests stay deterministic. Aggregation is
//! pure arithmetic over an in-memory snapshot slice; aggregates are
//! derived on demand and never stored.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use hustings_types::{CampaignCycle, PollingAggregate, PollingSnapshot, TrendDirection};
use rand::Rng;

use crate::config::PollingConfig;

/// Errors that can occur during polling operations.
#[derive(Debug, thiserror::Error)]
pub enum PollingError {
    /// The requested window holds too few snapshots for a meaningful
    /// aggregate (volatility is undefined at a single point).
    #[error("insufficient polling data: {found} snapshot(s) in window, need at least 2")]
    InsufficientData {
        /// Snapshots found inside the window.
        found: usize,
    },
}

/// Generate one public-opinion snapshot for the cycle.
///
/// The player's candidate starts from the configured national base plus
/// the mean of the cycle's accumulated state modifiers; the opponent
/// starts from the base alone. Bounded uniform jitter is applied to each,
/// with magnitude shrinking as the cycle nears election day. Support
/// values clamp to `[0, 100]`, and if the pair would exceed 100 combined
/// both are rescaled so the implicit undecided bucket never goes negative.
pub fn generate_snapshot(
    cycle: &CampaignCycle,
    config: &PollingConfig,
    rng: &mut impl Rng,
    captured_at: DateTime<Utc>,
) -> PollingSnapshot {
    let modifier_mean = if cycle.state_modifiers.is_empty() {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let count = cycle.state_modifiers.len() as f64;
        cycle.national_modifier_total() / count
    };

    let magnitude = config.max_jitter_pct * config.jitter_factor(cycle.phase);
    let candidate_base = config.national_base_pct + modifier_mean;
    let opponent_base = config.national_base_pct;

    let mut candidate = jittered(candidate_base, magnitude, rng);
    let mut opponent = jittered(opponent_base, magnitude, rng);

    // Keep room for the implicit undecided bucket.
    let total = candidate + opponent;
    if total > 100.0 {
        let scale = 100.0 / total;
        candidate *= scale;
        opponent *= scale;
    }

    let mut support_by_candidate = BTreeMap::new();
    support_by_candidate.insert(cycle.candidate, candidate);
    support_by_candidate.insert(cycle.opponent, opponent);

    PollingSnapshot {
        player_id: cycle.player_id,
        cycle_sequence: cycle.cycle_sequence,
        captured_at,
        support_by_candidate,
        sample_noise: magnitude,
    }
}

fn jittered(base: f64, magnitude: f64, rng: &mut impl Rng) -> f64 {
    let noise = if magnitude > 0.0 {
        rng.random_range(-magnitude..=magnitude)
    } else {
        0.0
    };
    (base + noise).clamp(0.0, 100.0)
}

/// Compute trend statistics over the snapshots captured within
/// `[now - window_hours, now]`.
///
/// The tracked series is the support of whichever candidate leads the
/// newest in-window snapshot. Volatility is the sample standard deviation
/// (n-1 denominator). The trend compares the newest sample against the
/// oldest: movement inside `epsilon` percentage points reads as `Stable`.
///
/// # Errors
///
/// Returns [`PollingError::InsufficientData`] if fewer than two snapshots
/// fall inside the window.
pub fn aggregate_trend(
    snapshots: &[PollingSnapshot],
    window_hours: u32,
    now: DateTime<Utc>,
    epsilon: f64,
) -> Result<PollingAggregate, PollingError> {
    let window_start = now
        .checked_sub_signed(Duration::hours(i64::from(window_hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut in_window: Vec<&PollingSnapshot> = snapshots
        .iter()
        .filter(|s| s.captured_at >= window_start && s.captured_at <= now)
        .collect();
    in_window.sort_by_key(|s| s.captured_at);

    let (Some(oldest), Some(newest)) = (in_window.first(), in_window.last()) else {
        return Err(PollingError::InsufficientData { found: 0 });
    };
    if in_window.len() < 2 {
        return Err(PollingError::InsufficientData {
            found: in_window.len(),
        });
    }

    let Some(tracked) = newest.leader() else {
        return Err(PollingError::InsufficientData { found: 0 });
    };
    let series: Vec<f64> = in_window
        .iter()
        .map(|s| s.support_by_candidate.get(&tracked).copied().unwrap_or(0.0))
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let volatility = variance.sqrt();

    let first = oldest.support_by_candidate.get(&tracked).copied().unwrap_or(0.0);
    let last = newest.support_by_candidate.get(&tracked).copied().unwrap_or(0.0);
    let delta = last - first;
    let trend_direction = if delta > epsilon {
        TrendDirection::Rising
    } else if delta < -epsilon {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    };

    let sample_count = u32::try_from(in_window.len()).unwrap_or(u32::MAX);
    Ok(PollingAggregate {
        average_support: mean,
        volatility,
        trend_direction,
        window_hours,
        sample_count,
    })
}

/// Sample standard deviation of the leading candidate's support across the
/// given snapshots, or `None` with fewer than two samples.
///
/// This is the volatility input to election resolution; the caller
/// substitutes a configured default when `None` comes back.
pub fn cycle_volatility(snapshots: &[PollingSnapshot]) -> Option<f64> {
    if snapshots.len() < 2 {
        return None;
    }
    let newest = snapshots.iter().max_by_key(|s| s.captured_at)?;
    let tracked = newest.leader()?;
    let series: Vec<f64> = snapshots
        .iter()
        .map(|s| s.support_by_candidate.get(&tracked).copied().unwrap_or(0.0))
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}
