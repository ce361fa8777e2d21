//! `PostgreSQL` data layer for the Hustings campaign simulator.
//!
//! The core simulation is I/O-free; everything durable flows through this
//! crate from the engine binary's persist step at the end of each tick.
//!
//! ```text
//! Tick Report
//!     |
//!     +-- CycleStore       (campaign cycles, CAS on version)
//!     +-- PollStore        (append-only polling snapshots)
//!     +-- ResultStore      (immutable election results)
//!     +-- FiredEventStore  (audit trail of persistable events)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`cycle_store`] -- Campaign cycle rows with optimistic concurrency
//! - [`poll_store`] -- Polling snapshot append and window queries
//! - [`result_store`] -- Idempotent election result inserts
//! - [`event_store`] -- Fired-event audit trail
//! - [`error`] -- Shared error types

pub mod cycle_store;
pub mod error;
pub mod event_store;
pub mod poll_store;
pub mod postgres;
pub mod result_store;

// Re-export primary types for convenience.
pub use cycle_store::CycleStore;
pub use error::DbError;
pub use event_store::FiredEventStore;
pub use poll_store::PollStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use result_store::ResultStore;
