//! Fired-event audit trail.
//!
//! Events whose `persist` flag is set are recorded after they fire. The
//! table is append-only and keyed by the event ID, so replaying a tick
//! report never duplicates rows.

use sqlx::PgPool;

use hustings_types::ScheduledEvent;

use crate::error::DbError;

/// Operations on the `fired_events` table.
pub struct FiredEventStore<'a> {
    pool: &'a PgPool,
}

impl<'a> FiredEventStore<'a> {
    /// Create a new fired-event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record the persistable events from one tick.
    ///
    /// Events with `persist == false` are skipped; re-inserting an
    /// already-recorded event ID is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails, or
    /// [`DbError::Serialization`] if a payload does not encode.
    pub async fn record(&self, events: &[ScheduledEvent]) -> Result<(), DbError> {
        let persistable: Vec<&ScheduledEvent> = events.iter().filter(|e| e.persist).collect();
        if persistable.is_empty() {
            return Ok(());
        }

        let len = persistable.len();
        let mut ids = Vec::with_capacity(len);
        let mut due_times = Vec::with_capacity(len);
        let mut payloads = Vec::with_capacity(len);
        for event in &persistable {
            ids.push(event.id.into_inner());
            due_times.push(event.scheduled_for);
            payloads.push(serde_json::to_value(&event.payload)?);
        }

        sqlx::query(
            r"INSERT INTO fired_events (id, scheduled_for, payload)
              SELECT * FROM UNNEST($1::UUID[], $2::TIMESTAMPTZ[], $3::JSONB[])
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(&ids)
        .bind(&due_times)
        .bind(&payloads)
        .execute(self.pool)
        .await?;

        tracing::debug!(count = len, "Recorded fired events");
        Ok(())
    }
}
