//! Observer API server for the Hustings campaign simulator.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/ticks`) for real-time tick summary
//!   streaming via [`tokio::sync::broadcast`]
//! - **Clock control endpoints** for runtime control (pause, resume,
//!   manual tick, fast-forward, absolute time set)
//! - **Campaign REST endpoints** for initializing cycles, recording
//!   state modifiers, and querying polling trends and election results
//! - **Minimal HTML status page** (`GET /`) showing game time, pause
//!   state, and pending events
//!
//! # Architecture
//!
//! The observer shares the live [`Simulation`] with the engine's tick
//! loop behind a single `Arc<RwLock<_>>`. Queries take the read lock;
//! control endpoints and campaign mutations take the write lock, so
//! manual ticks and loop ticks never interleave. `WebSocket` clients
//! receive tick summaries via a broadcast channel with automatic lag
//! handling.
//!
//! [`Simulation`]: hustings_core::simulation::Simulation

pub mod control;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use state::{AppState, TickBroadcast};
