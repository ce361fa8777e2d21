//! Campaign cycle persistence with optimistic concurrency.
//!
//! Each cycle row carries a `version` stamp. Saves are compare-and-swap:
//! the UPDATE only matches when the stored version equals the version the
//! caller loaded, and a zero-row result surfaces as
//! [`DbError::StaleWrite`] rather than silently clobbering a concurrent
//! writer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use hustings_types::{CampaignCycle, CampaignPhase, PlayerId, StateCode};

use crate::error::DbError;

/// Operations on the `campaign_cycles` table.
pub struct CycleStore<'a> {
    pool: &'a PgPool,
}

/// Raw row shape for `campaign_cycles`.
#[derive(Debug, sqlx::FromRow)]
struct CycleRow {
    player_id: Uuid,
    cycle_sequence: i64,
    phase: String,
    started_at: DateTime<Utc>,
    candidate_id: Uuid,
    opponent_id: Uuid,
    state_modifiers: serde_json::Value,
    version: i64,
}

impl CycleRow {
    fn into_cycle(self) -> Result<CampaignCycle, DbError> {
        let state_modifiers: BTreeMap<StateCode, f64> =
            serde_json::from_value(self.state_modifiers)?;
        Ok(CampaignCycle {
            player_id: self.player_id.into(),
            cycle_sequence: u32::try_from(self.cycle_sequence).unwrap_or(0),
            phase: phase_from_db(&self.phase)?,
            started_at: self.started_at,
            candidate: self.candidate_id.into(),
            opponent: self.opponent_id.into(),
            state_modifiers,
            version: u64::try_from(self.version).unwrap_or(0),
        })
    }
}

/// Map a phase to its `campaign_phase` database value.
const fn phase_to_db(phase: CampaignPhase) -> &'static str {
    match phase {
        CampaignPhase::Announcement => "announcement",
        CampaignPhase::Primary => "primary",
        CampaignPhase::GeneralCampaign => "general_campaign",
        CampaignPhase::ElectionDay => "election_day",
        CampaignPhase::Resolved => "resolved",
    }
}

fn phase_from_db(name: &str) -> Result<CampaignPhase, DbError> {
    match name {
        "announcement" => Ok(CampaignPhase::Announcement),
        "primary" => Ok(CampaignPhase::Primary),
        "general_campaign" => Ok(CampaignPhase::GeneralCampaign),
        "election_day" => Ok(CampaignPhase::ElectionDay),
        "resolved" => Ok(CampaignPhase::Resolved),
        other => Err(DbError::Config(format!("unknown campaign phase: {other}"))),
    }
}

impl<'a> CycleStore<'a> {
    /// Create a new cycle store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly-initialized cycle row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (including a
    /// duplicate (player, sequence) pair).
    pub async fn insert(&self, cycle: &CampaignCycle) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO campaign_cycles
              (player_id, cycle_sequence, phase, started_at, candidate_id, opponent_id, state_modifiers, version)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(cycle.player_id.into_inner())
        .bind(i64::from(cycle.cycle_sequence))
        .bind(phase_to_db(cycle.phase))
        .bind(cycle.started_at)
        .bind(cycle.candidate.into_inner())
        .bind(cycle.opponent.into_inner())
        .bind(serde_json::to_value(&cycle.state_modifiers)?)
        .bind(i64::try_from(cycle.version).unwrap_or(i64::MAX))
        .execute(self.pool)
        .await?;

        tracing::debug!(player_id = %cycle.player_id, sequence = cycle.cycle_sequence, "Inserted campaign cycle");
        Ok(())
    }

    /// Save a cycle's mutable state, compare-and-swap on `version`.
    ///
    /// On success the stored version becomes `cycle.version + 1` and the
    /// new version is returned; the caller is expected to carry it forward.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::StaleWrite`] if the stored version no longer
    /// matches `cycle.version`, or [`DbError::Postgres`] on query failure.
    pub async fn save(&self, cycle: &CampaignCycle) -> Result<u64, DbError> {
        let expected = i64::try_from(cycle.version).unwrap_or(i64::MAX);
        let next = expected.saturating_add(1);

        let result = sqlx::query(
            r"UPDATE campaign_cycles
              SET phase = $3, state_modifiers = $4, version = $5
              WHERE player_id = $1 AND cycle_sequence = $2 AND version = $6",
        )
        .bind(cycle.player_id.into_inner())
        .bind(i64::from(cycle.cycle_sequence))
        .bind(phase_to_db(cycle.phase))
        .bind(serde_json::to_value(&cycle.state_modifiers)?)
        .bind(next)
        .bind(expected)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::StaleWrite {
                player_id: cycle.player_id,
                cycle_sequence: cycle.cycle_sequence,
                expected: cycle.version,
            });
        }
        Ok(u64::try_from(next).unwrap_or(u64::MAX))
    }

    /// Load the player's active (non-resolved) cycle, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Serialization`] if a stored row does not decode.
    pub async fn load_active(&self, player_id: PlayerId) -> Result<Option<CampaignCycle>, DbError> {
        let row = sqlx::query_as::<_, CycleRow>(
            r"SELECT player_id, cycle_sequence, phase, started_at, candidate_id, opponent_id, state_modifiers, version
              FROM campaign_cycles
              WHERE player_id = $1 AND phase <> 'resolved'
              ORDER BY cycle_sequence DESC
              LIMIT 1",
        )
        .bind(player_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(CycleRow::into_cycle).transpose()
    }

    /// Load the player's full cycle history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Serialization`] if a stored row does not decode.
    pub async fn load_history(&self, player_id: PlayerId) -> Result<Vec<CampaignCycle>, DbError> {
        let rows = sqlx::query_as::<_, CycleRow>(
            r"SELECT player_id, cycle_sequence, phase, started_at, candidate_id, opponent_id, state_modifiers, version
              FROM campaign_cycles
              WHERE player_id = $1
              ORDER BY cycle_sequence ASC",
        )
        .bind(player_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CycleRow::into_cycle).collect()
    }
}
