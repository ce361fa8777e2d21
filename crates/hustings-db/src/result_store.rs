//! Election result persistence.
//!
//! A result is computed exactly once per (player, cycle) and never changes
//! afterwards, so the insert is `ON CONFLICT DO NOTHING`: replaying a tick
//! report after a crash is harmless.

use sqlx::PgPool;

use hustings_types::{ElectionResult, PlayerId};

use crate::error::DbError;

/// Operations on the `election_results` table.
pub struct ResultStore<'a> {
    pool: &'a PgPool,
}

/// Raw row shape for `election_results`; the typed result lives in the
/// JSONB column.
#[derive(Debug, sqlx::FromRow)]
struct ResultRow {
    result: serde_json::Value,
}

impl<'a> ResultStore<'a> {
    /// Create a new result store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a result, idempotent per (player, cycle).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails, or
    /// [`DbError::Serialization`] if the result does not encode.
    pub async fn insert(&self, result: &ElectionResult) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO election_results (player_id, cycle_sequence, resolved_at, result)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (player_id, cycle_sequence) DO NOTHING",
        )
        .bind(result.player_id.into_inner())
        .bind(i64::from(result.cycle_sequence))
        .bind(result.resolved_at)
        .bind(serde_json::to_value(result)?)
        .execute(self.pool)
        .await?;

        tracing::debug!(
            player_id = %result.player_id,
            sequence = result.cycle_sequence,
            "Inserted election result"
        );
        Ok(())
    }

    /// Load the player's most recent result, if any cycle has resolved.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Serialization`] if the stored result does not decode.
    pub async fn load_latest(&self, player_id: PlayerId) -> Result<Option<ElectionResult>, DbError> {
        let row = sqlx::query_as::<_, ResultRow>(
            r"SELECT result
              FROM election_results
              WHERE player_id = $1
              ORDER BY cycle_sequence DESC
              LIMIT 1",
        )
        .bind(player_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| serde_json::from_value(r.result).map_err(DbError::from))
            .transpose()
    }
}
