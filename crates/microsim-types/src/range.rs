//! Bounded integer ranges.
//!
//! A [`Range`] is an inclusive span of integers `min..=max`, used for
//! attributes that must stay within fixed limits and for table dimensions
//! indexed by such an attribute. Values outside the span are clamped to the
//! nearest end.

/// Inclusive integer span `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    min: i32,
    max: i32,
}

impl Range {
    /// Span from `min` through `max`. Returns `None` if `min > max`.
    pub const fn new(min: i32, max: i32) -> Option<Self> {
        if min > max {
            return None;
        }
        Some(Self { min, max })
    }

    /// Smallest value.
    pub const fn min(self) -> i32 {
        self.min
    }

    /// Largest value.
    pub const fn max(self) -> i32 {
        self.max
    }

    /// Number of values in the span.
    pub fn size(self) -> u64 {
        u64::from(self.max.abs_diff(self.min)).saturating_add(1)
    }

    /// Whether `value` lies in the span.
    pub const fn within(self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Whether a real `value` lies in the span.
    pub fn within_real(self, value: f64) -> bool {
        value >= f64::from(self.min) && value <= f64::from(self.max)
    }

    /// Clamp `value` into the span.
    pub const fn bound(self, value: i32) -> i32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Clamp a real `value` into the span. NaN stays NaN.
    pub fn bound_real(self, value: f64) -> f64 {
        value.clamp(f64::from(self.min), f64::from(self.max))
    }

    /// Zero-based position of `value` after clamping it into the span.
    pub fn to_index(self, value: i32) -> usize {
        let offset = self.bound(value).abs_diff(self.min);
        usize::try_from(offset).unwrap_or(usize::MAX)
    }

    /// Value at zero-based position `index`, or `None` past the end.
    pub fn to_value(self, index: usize) -> Option<i32> {
        let value = i64::from(self.min).checked_add(i64::try_from(index).ok()?)?;
        i32::try_from(value).ok().filter(|&value| value <= self.max)
    }

    /// Every value in the span, ascending.
    pub fn values(self) -> std::ops::RangeInclusive<i32> {
        self.min..=self.max
    }
}
