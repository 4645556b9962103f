//! Attribute values as they stood before the current event changed them.

use serde::{Deserialize, Serialize};

/// The value an attribute had before its first change in some event.
///
/// Increment hooks that run while resolving a deferred close read the
/// attribute through [`Lagged::resolve`], so the closing interval sees the
/// value as of the event that requested the close rather than any later
/// change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lagged<T> {
    value: T,
    event: Option<u64>,
}

impl<T: Copy> Lagged<T> {
    /// No recorded change yet.
    pub const fn new(value: T) -> Self {
        Self { value, event: None }
    }

    /// Record `old` as the pre-change value for event `event_counter`.
    /// Later changes within the same event keep the first recorded value.
    pub fn record(&mut self, old: T, event_counter: u64) {
        if self.event.is_none_or(|event| event_counter > event) {
            self.value = old;
            self.event = Some(event_counter);
        }
    }

    /// The lagged value if a pending close was requested in the event of
    /// the recorded change, otherwise `current`.
    pub fn resolve(&self, current: T, pending: bool, pending_event: u64) -> T {
        if pending && self.event == Some(pending_event) {
            self.value
        } else {
            current
        }
    }

    /// Event of the last recorded change.
    pub const fn event(&self) -> Option<u64> {
        self.event
    }
}
