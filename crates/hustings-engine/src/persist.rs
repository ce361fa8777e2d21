//! Tick report persistence.
//!
//! [`TickPersister`] writes everything durable a tick produced: fired
//! events, polling snapshots, election results, and campaign cycle rows.
//! Cycle rows use compare-and-swap on `version`; the persister owns the
//! database-side version for each row and carries it forward between
//! ticks, since the in-memory cycle never learns it.
//!
//! A [`DbError::StaleWrite`] is recovered by reloading the stored version
//! and saving once more. Every other error propagates to the caller,
//! which logs and keeps ticking; persistence is best-effort and never
//! stops the simulation.

use std::collections::BTreeMap;

use tracing::warn;

use hustings_core::simulation::TickReport;
use hustings_db::{CycleStore, DbError, FiredEventStore, PollStore, PostgresPool, ResultStore};
use hustings_types::{CampaignCycle, PlayerId};

/// Writes tick output to `PostgreSQL` and tracks cycle row versions.
pub struct TickPersister {
    pool: PostgresPool,
    /// Last state written per player, carrying the database version.
    cycles: BTreeMap<PlayerId, CampaignCycle>,
}

impl TickPersister {
    /// Create a persister around a connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self {
            pool,
            cycles: BTreeMap::new(),
        }
    }

    /// Consume the persister and hand back the pool for shutdown.
    pub fn into_pool(self) -> PostgresPool {
        self.pool
    }

    /// Persist one tick: fired events, snapshots, results, and any cycle
    /// rows that changed since the last write.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on the first store failure. Stale cycle writes
    /// are retried internally and only propagate if the retry also fails.
    pub async fn persist(
        &mut self,
        report: &TickReport,
        latest_cycles: &[CampaignCycle],
    ) -> Result<(), DbError> {
        // Clone the pool handle so the stores do not hold a borrow of
        // `self` across the version-map updates below.
        let pool = self.pool.pool().clone();

        FiredEventStore::new(&pool)
            .record(&report.fired_events)
            .await?;
        PollStore::new(&pool).append(&report.snapshots).await?;

        let results = ResultStore::new(&pool);
        for result in &report.resolutions {
            results.insert(result).await?;
        }

        let store = CycleStore::new(&pool);
        for cycle in latest_cycles {
            self.sync_cycle(&store, cycle).await?;
        }
        Ok(())
    }

    /// Bring one cycle row in line with in-memory state.
    async fn sync_cycle(
        &mut self,
        store: &CycleStore<'_>,
        cycle: &CampaignCycle,
    ) -> Result<(), DbError> {
        let known = self
            .cycles
            .get(&cycle.player_id)
            .filter(|prev| prev.cycle_sequence == cycle.cycle_sequence);

        let Some(prev) = known else {
            return self.insert_cycle(store, cycle).await;
        };

        if prev.phase == cycle.phase && prev.state_modifiers == cycle.state_modifiers {
            return Ok(());
        }

        let mut pending = cycle.clone();
        pending.version = prev.version;
        match store.save(&pending).await {
            Ok(version) => {
                pending.version = version;
                self.cycles.insert(pending.player_id, pending);
                Ok(())
            }
            Err(DbError::StaleWrite { expected, .. }) => {
                warn!(
                    player_id = %cycle.player_id,
                    sequence = cycle.cycle_sequence,
                    expected,
                    "stale cycle write, reloading stored version"
                );
                let Some(stored) = self.load_stored(store, cycle).await? else {
                    return self.insert_cycle(store, cycle).await;
                };
                pending.version = stored.version;
                let version = store.save(&pending).await?;
                pending.version = version;
                self.cycles.insert(pending.player_id, pending);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Insert a row the persister has not written before. A duplicate from
    /// a previous run of the process falls back to a CAS save against the
    /// stored version.
    async fn insert_cycle(
        &mut self,
        store: &CycleStore<'_>,
        cycle: &CampaignCycle,
    ) -> Result<(), DbError> {
        let mut pending = cycle.clone();
        pending.version = 0;
        match store.insert(&pending).await {
            Ok(()) => {
                self.cycles.insert(pending.player_id, pending);
                Ok(())
            }
            Err(DbError::Postgres(e)) => {
                warn!(
                    player_id = %cycle.player_id,
                    sequence = cycle.cycle_sequence,
                    error = %e,
                    "cycle insert failed, attempting save against stored row"
                );
                let Some(stored) = self.load_stored(store, cycle).await? else {
                    return Err(DbError::Postgres(e));
                };
                pending.version = stored.version;
                let version = store.save(&pending).await?;
                pending.version = version;
                self.cycles.insert(pending.player_id, pending);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Load the stored row matching this cycle's (player, sequence), if any.
    async fn load_stored(
        &self,
        store: &CycleStore<'_>,
        cycle: &CampaignCycle,
    ) -> Result<Option<CampaignCycle>, DbError> {
        let history = store.load_history(cycle.player_id).await?;
        Ok(history
            .into_iter()
            .find(|row| row.cycle_sequence == cycle.cycle_sequence))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // Every store short-circuits on empty input, so a lazy pool lets the
    // whole persist path run without a reachable database.
    #[tokio::test]
    async fn empty_report_persists_without_touching_the_database() {
        let pool =
            PostgresPool::connect_lazy("postgres://hustings@localhost:5432/hustings").unwrap();
        let mut persister = TickPersister::new(pool);

        let report = TickReport {
            game_time: "2025-01-01T00:00:00Z".parse().unwrap(),
            paused: false,
            fired_events: Vec::new(),
            snapshots: Vec::new(),
            phase_changes: Vec::new(),
            resolutions: Vec::new(),
            notices: Vec::new(),
            failures: Vec::new(),
        };
        persister.persist(&report, &[]).await.unwrap();
    }
}
