//! Discrete-event calendar for the lifecourse model.
//!
//! Events come out in time order. Events scheduled for the same time come
//! out in the order they were scheduled, so a case replays identically
//! from its seed.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use microsim_types::EntityId;

/// What happens to a person at a scheduled time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The person crosses into the next age group.
    AgeGroup,
    /// The person gives birth.
    Birth,
    /// The person dies.
    Death,
}

/// One scheduled event.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    /// Simulated time of the event.
    pub time: f64,
    /// Person the event belongs to.
    pub person: EntityId,
    /// Event type.
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    event: Event,
    sequence: u64,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .time
            .total_cmp(&other.event.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Min-queue of pending events.
#[derive(Debug, Default)]
pub struct Calendar {
    queue: BinaryHeap<Reverse<Scheduled>>,
    sequence: u64,
}

impl Calendar {
    /// Empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` for `person` at `time`.
    pub fn schedule(&mut self, time: f64, person: EntityId, kind: EventKind) {
        let sequence = self.sequence;
        self.sequence = self.sequence.saturating_add(1);
        self.queue.push(Reverse(Scheduled {
            event: Event { time, person, kind },
            sequence,
        }));
    }

    /// Remove and return the earliest event.
    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop().map(|Reverse(scheduled)| scheduled.event)
    }

    /// Remove and return the earliest event if it happens no later than `until`.
    pub fn pop_until(&mut self, until: f64) -> Option<Event> {
        let Reverse(next) = self.queue.peek()?;
        if next.event.time > until {
            return None;
        }
        self.pop()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn person(serial: u64) -> EntityId {
        EntityId::from_parts(0, serial).unwrap()
    }

    #[test]
    fn events_come_out_in_time_order() {
        let mut calendar = Calendar::new();
        calendar.schedule(5.0, person(1), EventKind::Death);
        calendar.schedule(1.5, person(2), EventKind::Birth);
        calendar.schedule(3.0, person(1), EventKind::AgeGroup);

        let times: Vec<f64> = std::iter::from_fn(|| calendar.pop()).map(|e| e.time).collect();
        assert_eq!(times, vec![1.5, 3.0, 5.0]);
        assert_eq!(calendar.len(), 0);
    }

    #[test]
    fn ties_keep_scheduling_order() {
        let mut calendar = Calendar::new();
        calendar.schedule(2.0, person(3), EventKind::Death);
        calendar.schedule(2.0, person(1), EventKind::Birth);
        calendar.schedule(2.0, person(2), EventKind::AgeGroup);

        let order: Vec<EventKind> = std::iter::from_fn(|| calendar.pop()).map(|e| e.kind).collect();
        assert_eq!(
            order,
            vec![EventKind::Death, EventKind::Birth, EventKind::AgeGroup]
        );
    }

    #[test]
    fn pop_until_stops_at_horizon() {
        let mut calendar = Calendar::new();
        calendar.schedule(1.0, person(1), EventKind::Birth);
        calendar.schedule(4.0, person(1), EventKind::Death);

        assert!(calendar.pop_until(2.0).is_some());
        assert!(calendar.pop_until(2.0).is_none());
        assert_eq!(calendar.len(), 1);
    }
}
