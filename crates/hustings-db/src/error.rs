//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and serde errors with additional context about which operation
//! failed.

use hustings_types::PlayerId;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An optimistic-concurrency save lost the race: the stored row's
    /// version no longer matches the expected one.
    #[error("stale write for player {player_id} cycle {cycle_sequence}: expected version {expected}")]
    StaleWrite {
        /// The player whose cycle was being saved.
        player_id: PlayerId,
        /// The cycle that was being saved.
        cycle_sequence: u32,
        /// The version the caller expected to replace.
        expected: u64,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
