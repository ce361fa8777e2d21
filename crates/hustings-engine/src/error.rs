//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the tick loop.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hustings_core::config::ConfigError,
    },

    /// State baseline loading failed.
    #[error("baseline error: {source}")]
    Baseline {
        /// The underlying baseline error.
        #[from]
        source: hustings_core::baseline::BaselineError,
    },

    /// Simulation construction or a tick failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: hustings_core::simulation::SimulationError,
    },

    /// A database operation failed during startup.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: hustings_db::DbError,
    },
}
