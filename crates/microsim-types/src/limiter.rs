//! Rate limiting for usage-error warnings.
//!
//! Each call site that reports a recoverable usage error owns one
//! `static` [`WarningLimiter`]. The limiter hands out a bounded number of
//! permits; the caller logs only when a permit is granted.

use std::sync::atomic::{AtomicU32, Ordering};

/// Default number of warnings per call site.
pub const DEFAULT_WARNING_LIMIT: u32 = 1;

/// A countdown of remaining warnings for one call site.
#[derive(Debug)]
pub struct WarningLimiter {
    remaining: AtomicU32,
}

impl WarningLimiter {
    /// Create a limiter that grants `limit` permits.
    pub const fn new(limit: u32) -> Self {
        Self {
            remaining: AtomicU32::new(limit),
        }
    }

    /// Take one permit. Returns `false` once the limit is exhausted.
    pub fn allow(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Permits still available.
    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Relaxed)
    }
}

impl Default for WarningLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_exactly_limit_permits() {
        let limiter = WarningLimiter::new(2);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
        assert!(!limiter.allow());
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn static_limiter_defaults_to_single_warning() {
        static SITE: WarningLimiter = WarningLimiter::new(DEFAULT_WARNING_LIMIT);
        assert!(SITE.allow());
        assert!(!SITE.allow());
    }

    #[test]
    fn permits_are_shared_across_threads() {
        static SITE: WarningLimiter = WarningLimiter::new(3);
        let granted: u32 = (0..8)
            .map(|_| std::thread::spawn(|| u32::from(SITE.allow())))
            .map(|h| h.join().unwrap_or(0))
            .sum();
        assert_eq!(granted, 3);
    }
}
