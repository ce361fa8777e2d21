//! Polling snapshot persistence.
//!
//! Snapshots are append-only: rows are inserted as ticks generate them and
//! never updated. Window queries by `captured_at` back the trend endpoint
//! when history longer than the in-memory log is needed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use hustings_types::{CandidateId, PlayerId, PollingSnapshot};

use crate::error::DbError;

/// Operations on the `polling_snapshots` table.
pub struct PollStore<'a> {
    pool: &'a PgPool,
}

/// Raw row shape for `polling_snapshots`.
#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    player_id: Uuid,
    cycle_sequence: i64,
    captured_at: DateTime<Utc>,
    support: serde_json::Value,
    sample_noise: f64,
}

impl SnapshotRow {
    fn into_snapshot(self) -> Result<PollingSnapshot, DbError> {
        let support_by_candidate: BTreeMap<CandidateId, f64> =
            serde_json::from_value(self.support)?;
        Ok(PollingSnapshot {
            player_id: self.player_id.into(),
            cycle_sequence: u32::try_from(self.cycle_sequence).unwrap_or(0),
            captured_at: self.captured_at,
            support_by_candidate,
            sample_noise: self.sample_noise,
        })
    }
}

impl<'a> PollStore<'a> {
    /// Create a new poll store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a batch of snapshots, typically everything one tick produced.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails, or
    /// [`DbError::Serialization`] if a support map does not encode.
    pub async fn append(&self, snapshots: &[PollingSnapshot]) -> Result<(), DbError> {
        if snapshots.is_empty() {
            return Ok(());
        }

        let len = snapshots.len();
        let mut player_ids = Vec::with_capacity(len);
        let mut sequences = Vec::with_capacity(len);
        let mut captured = Vec::with_capacity(len);
        let mut supports = Vec::with_capacity(len);
        let mut noises = Vec::with_capacity(len);
        for snapshot in snapshots {
            player_ids.push(snapshot.player_id.into_inner());
            sequences.push(i64::from(snapshot.cycle_sequence));
            captured.push(snapshot.captured_at);
            supports.push(serde_json::to_value(&snapshot.support_by_candidate)?);
            noises.push(snapshot.sample_noise);
        }

        // Multi-row INSERT using UNNEST for batch efficiency.
        sqlx::query(
            r"INSERT INTO polling_snapshots (player_id, cycle_sequence, captured_at, support, sample_noise)
              SELECT * FROM UNNEST($1::UUID[], $2::BIGINT[], $3::TIMESTAMPTZ[], $4::JSONB[], $5::DOUBLE PRECISION[])",
        )
        .bind(&player_ids)
        .bind(&sequences)
        .bind(&captured)
        .bind(&supports)
        .bind(&noises)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "Inserted polling snapshots");
        Ok(())
    }

    /// Query a player's snapshots captured inside `[from, to]`, oldest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Serialization`] if a stored row does not decode.
    pub async fn window(
        &self,
        player_id: PlayerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PollingSnapshot>, DbError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            r"SELECT player_id, cycle_sequence, captured_at, support, sample_noise
              FROM polling_snapshots
              WHERE player_id = $1 AND captured_at BETWEEN $2 AND $3
              ORDER BY captured_at ASC",
        )
        .bind(player_id.into_inner())
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }
}
