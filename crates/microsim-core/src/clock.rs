//! Simulated time and the global event counter of one member.
//!
//! The clock is the single source of truth for temporal state within a
//! member. The scheduler advances it once per processed event; increments
//! only ever read the event counter.
//!
//! # Design Principles
//!
//! - The event counter uses checked arithmetic (no silent overflow).
//! - Time never moves backwards and is never NaN.

use serde::{Deserialize, Serialize};

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockError {
    /// Event counter would overflow.
    #[error("event counter overflow: cannot advance beyond u64::MAX")]
    CounterOverflow,

    /// An event was scheduled before the current time.
    #[error("time cannot move backwards from {current} to {requested}")]
    TimeReversal {
        /// Current simulated time.
        current: f64,
        /// Requested time.
        requested: f64,
    },

    /// A time value was NaN.
    #[error("simulated time must not be NaN")]
    NotANumber,
}

/// Simulated time plus the number of events processed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EventClock {
    time: f64,
    event_counter: u64,
}

impl EventClock {
    /// A clock at time zero with no events processed.
    pub const fn new() -> Self {
        Self {
            time: 0.0,
            event_counter: 0,
        }
    }

    /// Create a clock from explicit parameters (state restoration).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NotANumber`] if `time` is NaN.
    pub const fn from_parts(time: f64, event_counter: u64) -> Result<Self, ClockError> {
        if time.is_nan() {
            return Err(ClockError::NotANumber);
        }
        Ok(Self {
            time,
            event_counter,
        })
    }

    /// Begin the next event at `time`. Returns the new event counter.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TimeReversal`], [`ClockError::NotANumber`] or
    /// [`ClockError::CounterOverflow`]. The clock is unchanged on error.
    pub fn next_event(&mut self, time: f64) -> Result<u64, ClockError> {
        if time.is_nan() {
            return Err(ClockError::NotANumber);
        }
        if time < self.time {
            return Err(ClockError::TimeReversal {
                current: self.time,
                requested: time,
            });
        }
        self.event_counter = self
            .event_counter
            .checked_add(1)
            .ok_or(ClockError::CounterOverflow)?;
        self.time = time;
        Ok(self.event_counter)
    }

    /// Rewind time to zero for a new case. The event counter keeps
    /// running so that pending closes from an earlier case can never match.
    pub const fn reset_time(&mut self) {
        self.time = 0.0;
    }

    /// Current simulated time.
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Number of events processed.
    pub const fn event_counter(&self) -> u64 {
        self.event_counter
    }
}
