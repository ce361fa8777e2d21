//! Due-event queue for the time engine.
//!
//! Events are ordered by `scheduled_for`, with a monotonic insertion
//! sequence breaking ties so that events due at the same instant fire in
//! FIFO order. This keeps ticks deterministic regardless of how the
//! backing heap rebalances.
//!
//! At-most-once firing is enforced structurally: draining removes events
//! from the heap, and both queued and recently-fired IDs are tracked so a
//! consumed event cannot be re-inserted under the same identity. The
//! fired-ID memory is bounded at [`FIRED_ID_RETENTION`] entries (oldest
//! evicted first) so a long-running process does not accumulate one entry
//! per event forever; IDs are freshly generated UUIDs, so an evicted ID
//! never reappears in practice.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, VecDeque};

use chrono::{DateTime, Utc};
use hustings_types::{EventId, ScheduledEvent};

/// Number of consumed event IDs retained for duplicate rejection.
pub const FIRED_ID_RETENTION: usize = 4096;

/// Errors that can occur when scheduling events.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// An event with this ID is already queued or has already fired.
    #[error("duplicate event id: {0}")]
    DuplicateEvent(EventId),
}

/// Heap entry wrapper providing the (due time, insertion sequence) order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedEvent {
    /// When the event becomes due.
    due: DateTime<Utc>,
    /// Monotonic insertion counter; FIFO tie-break for equal due times.
    seq: u64,
    /// The event itself.
    event: ScheduledEvent,
}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Ordered set of scheduled events keyed by due time.
///
/// Owned exclusively by the [`TimeEngine`](crate::engine::TimeEngine);
/// events leave the queue exactly once, through [`drain_due`](Self::drain_due).
#[derive(Debug, Default)]
pub struct EventQueue {
    /// Min-heap on (due, seq).
    heap: BinaryHeap<Reverse<QueuedEvent>>,
    /// IDs currently waiting in the heap.
    queued_ids: BTreeSet<EventId>,
    /// Recently consumed IDs; re-insertion is rejected while retained.
    fired_ids: BTreeSet<EventId>,
    /// Eviction order for `fired_ids`, oldest first.
    fired_order: VecDeque<EventId>,
    /// Next insertion sequence number.
    next_seq: u64,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events currently waiting.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    /// Whether any events are waiting.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Insert an event.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::DuplicateEvent`] if the ID is already
    /// queued or has already fired.
    pub fn schedule(&mut self, event: ScheduledEvent) -> Result<(), ScheduleError> {
        if self.queued_ids.contains(&event.id) || self.fired_ids.contains(&event.id) {
            return Err(ScheduleError::DuplicateEvent(event.id));
        }
        self.queued_ids.insert(event.id);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.heap.push(Reverse(QueuedEvent {
            due: event.scheduled_for,
            seq,
            event,
        }));
        Ok(())
    }

    /// Remove and return every event with `scheduled_for <= now`, in
    /// due-time order with FIFO tie-breaking.
    pub fn drain_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduledEvent> {
        let mut fired = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.due > now {
                break;
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                self.queued_ids.remove(&entry.event.id);
                self.remember_fired(entry.event.id);
                fired.push(entry.event);
            }
        }
        fired
    }

    /// Record a consumed ID, evicting the oldest once the retention
    /// window is full.
    fn remember_fired(&mut self, id: EventId) {
        if self.fired_ids.insert(id) {
            self.fired_order.push_back(id);
        }
        while self.fired_order.len() > FIRED_ID_RETENTION {
            if let Some(oldest) = self.fired_order.pop_front() {
                self.fired_ids.remove(&oldest);
            }
        }
    }
}
