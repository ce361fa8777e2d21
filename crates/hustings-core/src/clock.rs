//! Game clock for the Hustings simulation.
//!
//! The clock is the single source of truth for game time. It holds the
//! current timestamp, the pause flag, and the configured tick step. One
//! clock exists per process; it is constructed explicitly and handed to
//! the [`TimeEngine`](crate::engine::TimeEngine), which is its only
//! mutator.
//!
//! # Design Principles
//!
//! - Game time never decreases except through the explicit administrative
//!   [`set_time`](GameClock::set_time) call. Ticking and fast-forwarding
//!   only move forward.
//! - All timestamp arithmetic is checked -- an unrepresentable result is
//!   an [`InvalidTime`](ClockError::InvalidTime) error, never a panic.
//! - Pausing freezes time advancement only; it has no effect on whether
//!   overdue events fire.

use chrono::{DateTime, Duration, Utc};

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// A timestamp computation produced an unrepresentable result.
    #[error("invalid time: {reason}")]
    InvalidTime {
        /// Explanation of what went wrong.
        reason: String,
    },

    /// Invalid clock configuration (e.g. a zero tick step).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// The authoritative game clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameClock {
    /// Current game time.
    current: DateTime<Utc>,

    /// Whether time advancement is frozen.
    paused: bool,

    /// Hours added per unpaused tick.
    step_hours: u32,
}

impl GameClock {
    /// Create a clock starting at `start` with the given tick step.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `step_hours` is 0.
    pub fn new(start: DateTime<Utc>, step_hours: u32) -> Result<Self, ClockError> {
        if step_hours == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "step_hours must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            current: start,
            paused: false,
            step_hours,
        })
    }

    /// Return the current game time.
    pub const fn game_time(&self) -> DateTime<Utc> {
        self.current
    }

    /// Whether time advancement is currently frozen.
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// The configured hours per tick.
    pub const fn step_hours(&self) -> u32 {
        self.step_hours
    }

    /// Freeze time advancement. Idempotent: pausing a paused clock is a
    /// no-op, not an error.
    pub const fn pause(&mut self) {
        self.paused = true;
    }

    /// Unfreeze time advancement. Idempotent.
    pub const fn resume(&mut self) {
        self.paused = false;
    }

    /// Advance by the configured step. Called by the engine at the end of
    /// an unpaused tick.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTime`] if the addition overflows the
    /// representable timestamp range.
    pub fn advance_step(&mut self) -> Result<DateTime<Utc>, ClockError> {
        self.jump_forward(self.step_hours)
    }

    /// Jump forward by a whole number of hours. Used by fast-forward;
    /// never moves backwards.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTime`] if the addition overflows.
    pub fn jump_forward(&mut self, hours: u32) -> Result<DateTime<Utc>, ClockError> {
        let advanced = self
            .current
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .ok_or_else(|| ClockError::InvalidTime {
                reason: format!("advancing {hours}h past {} overflows", self.current),
            })?;
        self.current = advanced;
        Ok(advanced)
    }

    /// Administrative absolute set. This is the only path that may move
    /// the clock backwards.
    pub const fn set_time(&mut self, time: DateTime<Utc>) {
        self.current = time;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn start() -> DateTime<Utc> {
        at("2025-01-01T00:00:00Z")
    }

    #[test]
    fn clock_starts_unpaused_at_start_time() {
        let clock = GameClock::new(start(), 1).unwrap();
        assert_eq!(clock.game_time(), start());
        assert!(!clock.is_paused());
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(GameClock::new(start(), 0).is_err());
    }

    #[test]
    fn advance_step_adds_configured_hours() {
        let mut clock = GameClock::new(start(), 6).unwrap();
        let advanced = clock.advance_step().unwrap();
        assert_eq!(advanced, at("2025-01-01T06:00:00Z"));
        assert_eq!(clock.game_time(), advanced);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let mut clock = GameClock::new(start(), 1).unwrap();
        clock.pause();
        clock.pause();
        assert!(clock.is_paused());
        clock.resume();
        clock.resume();
        assert!(!clock.is_paused());
    }

    #[test]
    fn set_time_may_move_backwards() {
        let mut clock = GameClock::new(start(), 1).unwrap();
        clock.jump_forward(48).unwrap();
        clock.set_time(start());
        assert_eq!(clock.game_time(), start());
    }

    #[test]
    fn jump_forward_accumulates() {
        let mut clock = GameClock::new(start(), 1).unwrap();
        clock.jump_forward(24).unwrap();
        clock.jump_forward(24).unwrap();
        assert_eq!(clock.game_time(), at("2025-01-03T00:00:00Z"));
    }
}
