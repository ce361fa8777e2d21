//! Game clock, due-event queue, campaign lifecycle, polling, and election
//! resolution for the Hustings simulation.
//!
//! This crate is the deterministic heart of the engine: everything in it
//! is synchronous, in-memory, and free of I/O. The engine binary drives it
//! through [`simulation::Simulation`] and handles persistence and the HTTP
//! surface elsewhere.
//!
//! # Modules
//!
//! - [`clock`] -- The game clock: current time, pause flag, tick step.
//! - [`schedule`] -- Due-event queue with FIFO tie-breaking and
//!   at-most-once firing.
//! - [`engine`] -- [`TimeEngine`], the single mutator of game time.
//! - [`campaign`] -- Per-player campaign cycles and the phase machine.
//! - [`polling`] -- Stochastic snapshot generation and trend aggregation.
//! - [`baseline`] -- The read-only state baseline table.
//! - [`election`] -- Margin, probability, and electoral college math.
//! - [`simulation`] -- Everything wired together behind one tick entry
//!   point.
//! - [`config`] -- Configuration loading from `hustings-config.yaml`.
//!
//! [`TimeEngine`]: engine::TimeEngine

pub mod baseline;
pub mod campaign;
pub mod clock;
pub mod config;
pub mod election;
pub mod engine;
pub mod polling;
pub mod schedule;
pub mod simulation;
