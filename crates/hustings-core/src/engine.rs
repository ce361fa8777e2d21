//! The time engine: owner of the game clock and the due-event queue.
//!
//! Every simulated process in Hustings is driven from here. The engine is
//! the only mutator of game time, and ticking is the only way events leave
//! the queue. The engine itself performs no I/O and runs no handlers: a
//! tick returns the drained events and the caller dispatches them.
//!
//! # Access discipline
//!
//! The engine is a single-writer structure. The process wraps it (inside
//! [`Simulation`](crate::simulation::Simulation)) in one `Arc<RwLock<_>>`
//! handed to request handlers by dependency injection, so `tick_once`,
//! `set_game_time`, and `schedule_event` serialize in a single critical
//! section. That preserves the FIFO tie-break and at-most-once firing
//! invariants, and readers never observe the clock advanced with events
//! not yet drained.

use chrono::{DateTime, Utc};
use hustings_types::ScheduledEvent;
use tracing::debug;

use crate::clock::{ClockError, GameClock};
use crate::schedule::{EventQueue, ScheduleError};

/// Upper bound on a single fast-forward: one simulated year in hours
/// (365.25 days). Prevents runaway progression from a bad request.
pub const MAX_FAST_FORWARD_HOURS: u32 = 8_766;

/// Errors that can occur during time engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// An event could not be scheduled.
    #[error("schedule error: {source}")]
    Schedule {
        /// The underlying schedule error.
        #[from]
        source: ScheduleError,
    },

    /// A fast-forward request was out of range.
    #[error("invalid fast-forward: {hours} hours (must be 1..={MAX_FAST_FORWARD_HOURS})")]
    InvalidHours {
        /// The rejected hour count.
        hours: u32,
    },
}

/// The authoritative time engine.
#[derive(Debug)]
pub struct TimeEngine {
    /// The game clock.
    clock: GameClock,
    /// The due-event queue.
    queue: EventQueue,
}

impl TimeEngine {
    /// Create an engine around a clock with an empty queue.
    pub fn new(clock: GameClock) -> Self {
        Self {
            clock,
            queue: EventQueue::new(),
        }
    }

    /// Current game time. No side effects.
    pub const fn game_time(&self) -> DateTime<Utc> {
        self.clock.game_time()
    }

    /// Whether time advancement is frozen.
    pub const fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.queue.pending()
    }

    /// Freeze time advancement. Idempotent.
    pub const fn pause(&mut self) {
        self.clock.pause();
    }

    /// Unfreeze time advancement. Idempotent.
    pub const fn resume(&mut self) {
        self.clock.resume();
    }

    /// Administrative absolute time set. The only path that may move the
    /// clock backwards; ticking never does.
    ///
    /// # Errors
    ///
    /// Reserved for monotonicity policies stricter than the default; the
    /// default policy accepts any representable timestamp.
    pub fn set_game_time(&mut self, time: DateTime<Utc>) -> Result<(), EngineError> {
        debug!(%time, "administrative clock set");
        self.clock.set_time(time);
        Ok(())
    }

    /// Insert an event into the queue.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Schedule`] if the event ID collides with a
    /// queued or already-fired event.
    pub fn schedule_event(&mut self, event: ScheduledEvent) -> Result<(), EngineError> {
        self.queue.schedule(event)?;
        Ok(())
    }

    /// Process one tick.
    ///
    /// Drains every event with `scheduled_for <= current` -- **regardless
    /// of pause state**, since pausing freezes time advancement, not
    /// overdue-event processing -- then advances the clock by the
    /// configured step only if unpaused. Due events always drain before
    /// new time advances.
    ///
    /// Returns the drained events in firing order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Clock`] if the step advance overflows; the
    /// queue is not modified in that case beyond the completed drain.
    pub fn tick_once(&mut self) -> Result<Vec<ScheduledEvent>, EngineError> {
        let fired = self.queue.drain_due(self.clock.game_time());
        if !self.clock.is_paused() {
            self.clock.advance_step()?;
        }
        Ok(fired)
    }

    /// Drain events already due at the current game time without touching
    /// the clock. Callers that schedule follow-up events while handling a
    /// drained batch use this to pick up follow-ups that landed inside
    /// the already-elapsed window.
    pub fn drain_overdue(&mut self) -> Vec<ScheduledEvent> {
        self.queue.drain_due(self.clock.game_time())
    }

    /// Jump the clock forward by `hours` and drain everything that became
    /// due within the skipped interval, in `scheduled_for` order.
    ///
    /// The cadence step is not applied on top of the jump: after
    /// `fast_forward(h)` the clock reads exactly the old time plus `h`
    /// hours, with every event inside that window fired exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidHours`] unless
    /// `1 <= hours <= MAX_FAST_FORWARD_HOURS`, and [`EngineError::Clock`]
    /// if the jump overflows the timestamp range. Validation happens
    /// before any state is touched, so a rejected call changes nothing.
    pub fn fast_forward(&mut self, hours: u32) -> Result<Vec<ScheduledEvent>, EngineError> {
        if hours == 0 || hours > MAX_FAST_FORWARD_HOURS {
            return Err(EngineError::InvalidHours { hours });
        }
        let advanced = self.clock.jump_forward(hours)?;
        debug!(%advanced, hours, "fast-forward");
        Ok(self.queue.drain_due(advanced))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hustings_types::{EventId, EventPayload, PlayerId};

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn engine_at(start: &str, step_hours: u32) -> TimeEngine {
        TimeEngine::new(GameClock::new(at(start), step_hours).unwrap())
    }

    fn polling_event(due: &str) -> ScheduledEvent {
        ScheduledEvent {
            id: EventId::new(),
            scheduled_for: at(due),
            payload: EventPayload::PollingGeneration {
                player_id: PlayerId::new(),
            },
            persist: false,
        }
    }

    #[test]
    fn unpaused_tick_advances_by_step() {
        let mut engine = engine_at("2025-01-01T00:00:00Z", 1);
        let fired = engine.tick_once().unwrap();
        assert!(fired.is_empty());
        assert_eq!(engine.game_time(), at("2025-01-01T01:00:00Z"));
    }

    #[test]
    fn paused_tick_fires_due_events_without_advancing() {
        let mut engine = engine_at("2025-01-01T00:00:00Z", 1);
        engine
            .schedule_event(polling_event("2025-01-01T00:00:00Z"))
            .unwrap();
        engine.pause();

        let fired = engine.tick_once().unwrap();
        assert_eq!(fired.len(), 1);
        // Time is frozen, but overdue processing is not.
        assert_eq!(engine.game_time(), at("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn fast_forward_fires_skipped_events_and_lands_exactly() {
        // Clock at 2025-01-01T00:00:00Z, unpaused, one event due at +1h:
        // fast_forward(2) must land on exactly +2h with the event fired once.
        let mut engine = engine_at("2025-01-01T00:00:00Z", 1);
        engine
            .schedule_event(polling_event("2025-01-01T01:00:00Z"))
            .unwrap();

        let fired = engine.fast_forward(2).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(engine.game_time(), at("2025-01-01T02:00:00Z"));
        assert_eq!(engine.pending_events(), 0);
    }

    #[test]
    fn fast_forward_rejects_zero_and_over_cap() {
        let mut engine = engine_at("2025-01-01T00:00:00Z", 1);
        assert!(matches!(
            engine.fast_forward(0),
            Err(EngineError::InvalidHours { hours: 0 })
        ));
        assert!(engine
            .fast_forward(MAX_FAST_FORWARD_HOURS.saturating_add(1))
            .is_err());
        // A rejected call leaves the clock untouched.
        assert_eq!(engine.game_time(), at("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn fast_forward_fires_in_scheduled_order() {
        let mut engine = engine_at("2025-01-01T00:00:00Z", 1);
        engine
            .schedule_event(polling_event("2025-01-01T05:00:00Z"))
            .unwrap();
        engine
            .schedule_event(polling_event("2025-01-01T02:00:00Z"))
            .unwrap();

        let fired = engine.fast_forward(6).unwrap();
        let times: Vec<DateTime<Utc>> = fired.iter().map(|e| e.scheduled_for).collect();
        assert_eq!(
            times,
            vec![at("2025-01-01T02:00:00Z"), at("2025-01-01T05:00:00Z")]
        );
    }

    #[test]
    fn fast_forward_is_associative_over_draining() {
        // One big jump drains the same events as hourly jumps, each
        // followed by a tick. Paused clocks keep the cadence step out of
        // the comparison.
        let schedule = ["2025-01-01T01:00:00Z", "2025-01-01T03:00:00Z", "2025-01-01T04:00:00Z"];

        let mut bulk = engine_at("2025-01-01T00:00:00Z", 1);
        bulk.pause();
        for due in schedule {
            bulk.schedule_event(polling_event(due)).unwrap();
        }
        let mut bulk_fired = bulk.fast_forward(4).unwrap();
        bulk_fired.extend(bulk.tick_once().unwrap());

        let mut stepped = engine_at("2025-01-01T00:00:00Z", 1);
        stepped.pause();
        for due in schedule {
            stepped.schedule_event(polling_event(due)).unwrap();
        }
        let mut stepped_fired = Vec::new();
        for _ in 0..4 {
            stepped_fired.extend(stepped.fast_forward(1).unwrap());
            stepped_fired.extend(stepped.tick_once().unwrap());
        }

        assert_eq!(bulk.game_time(), stepped.game_time());
        let bulk_times: Vec<DateTime<Utc>> =
            bulk_fired.iter().map(|e| e.scheduled_for).collect();
        let stepped_times: Vec<DateTime<Utc>> =
            stepped_fired.iter().map(|e| e.scheduled_for).collect();
        assert_eq!(bulk_times, stepped_times);
        assert_eq!(bulk.pending_events(), 0);
        assert_eq!(stepped.pending_events(), 0);
    }

    #[test]
    fn set_game_time_may_rewind() {
        let mut engine = engine_at("2025-06-01T00:00:00Z", 1);
        engine.set_game_time(at("2025-01-01T00:00:00Z")).unwrap();
        assert_eq!(engine.game_time(), at("2025-01-01T00:00:00Z"));
    }
}
