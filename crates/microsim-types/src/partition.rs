//! Classification of real values into contiguous intervals.
//!
//! A [`Partition`] splits the real line at strictly ascending cut points.
//! `n` cut points give `n + 1` half-open intervals `[lower, upper)`; the
//! first interval starts at negative infinity and the last one ends at
//! positive infinity. A value equal to a cut point belongs to the interval
//! that starts there. Partitions are the usual way a continuous attribute
//! such as age becomes a table dimension.

/// Half-open intervals covering the real line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partition<'a> {
    cuts: &'a [f64],
}

impl<'a> Partition<'a> {
    /// Partition the real line at `cuts`.
    ///
    /// Returns `None` unless every cut point is finite and strictly greater
    /// than the one before it.
    pub const fn new(cuts: &'a [f64]) -> Option<Self> {
        let mut rest = cuts;
        let mut previous = f64::NEG_INFINITY;
        while let [cut, tail @ ..] = rest {
            if !cut.is_finite() || *cut <= previous {
                return None;
            }
            previous = *cut;
            rest = tail;
        }
        Some(Self { cuts })
    }

    /// Number of intervals.
    pub const fn size(&self) -> usize {
        self.cuts.len().saturating_add(1)
    }

    /// The cut points, ascending.
    pub const fn cuts(&self) -> &'a [f64] {
        self.cuts
    }

    /// Index of the interval holding `value`.
    ///
    /// NaN compares below every cut point and lands in the first interval.
    pub fn value_to_interval(&self, value: f64) -> usize {
        self.cuts.partition_point(|&cut| cut <= value)
    }

    /// Clamp an interval index into `0..size()`.
    pub const fn bound(&self, interval: usize) -> usize {
        if interval < self.cuts.len() {
            interval
        } else {
            self.cuts.len()
        }
    }

    /// Inclusive lower bound of `interval`, or `None` if there is no such
    /// interval.
    pub fn lower(&self, interval: usize) -> Option<f64> {
        interval
            .checked_sub(1)
            .map_or(Some(f64::NEG_INFINITY), |cut| self.cuts.get(cut).copied())
    }

    /// Exclusive upper bound of `interval`, or `None` if there is no such
    /// interval.
    pub fn upper(&self, interval: usize) -> Option<f64> {
        if interval == self.cuts.len() {
            return Some(f64::INFINITY);
        }
        self.cuts.get(interval).copied()
    }

    /// Width of `interval`; infinite for the two open-ended intervals.
    pub fn width(&self, interval: usize) -> Option<f64> {
        Some(self.upper(interval)? - self.lower(interval)?)
    }

    /// Lower bound of every interval, in order.
    pub fn lower_bounds(&self) -> Vec<f64> {
        std::iter::once(f64::NEG_INFINITY)
            .chain(self.cuts.iter().copied())
            .collect()
    }

    /// Upper bound of every interval, in order.
    pub fn upper_bounds(&self) -> Vec<f64> {
        self.cuts
            .iter()
            .copied()
            .chain(std::iter::once(f64::INFINITY))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const AGES: [f64; 3] = [18.0, 65.0, 85.0];

    #[test]
    fn cut_points_open_the_next_interval() {
        let ages = Partition::new(&AGES).unwrap();
        assert_eq!(ages.size(), 4);
        assert_eq!(ages.value_to_interval(-3.0), 0);
        assert_eq!(ages.value_to_interval(17.999), 0);
        assert_eq!(ages.value_to_interval(18.0), 1);
        assert_eq!(ages.value_to_interval(64.5), 1);
        assert_eq!(ages.value_to_interval(65.0), 2);
        assert_eq!(ages.value_to_interval(85.0), 3);
        assert_eq!(ages.value_to_interval(f64::INFINITY), 3);
        assert_eq!(ages.value_to_interval(f64::NAN), 0);
    }

    #[test]
    fn bounds_are_open_ended_at_both_extremes() {
        let ages = Partition::new(&AGES).unwrap();
        assert_eq!(ages.lower(0), Some(f64::NEG_INFINITY));
        assert_eq!(ages.upper(0), Some(18.0));
        assert_eq!(ages.lower(2), Some(65.0));
        assert_eq!(ages.upper(3), Some(f64::INFINITY));
        assert_eq!(ages.lower(4), None);
        assert_eq!(ages.upper(4), None);
        assert_eq!(ages.width(1), Some(47.0));
        assert_eq!(ages.width(0), Some(f64::INFINITY));
        assert_eq!(ages.lower_bounds(), vec![f64::NEG_INFINITY, 18.0, 65.0, 85.0]);
        assert_eq!(ages.upper_bounds(), vec![18.0, 65.0, 85.0, f64::INFINITY]);
    }

    #[test]
    fn every_value_lies_within_its_interval() {
        let ages = Partition::new(&AGES).unwrap();
        for value in [-1.0, 0.0, 18.0, 40.0, 65.0, 84.9, 100.0] {
            let interval = ages.value_to_interval(value);
            assert!(ages.lower(interval).unwrap() <= value);
            assert!(value < ages.upper(interval).unwrap());
        }
    }

    #[test]
    fn interval_index_is_clamped() {
        let ages = Partition::new(&AGES).unwrap();
        assert_eq!(ages.bound(2), 2);
        assert_eq!(ages.bound(9), 3);
    }

    #[test]
    fn unordered_or_non_finite_cuts_are_rejected() {
        assert!(Partition::new(&[1.0, 1.0]).is_none());
        assert!(Partition::new(&[2.0, 1.0]).is_none());
        assert!(Partition::new(&[0.0, f64::NAN]).is_none());
        assert!(Partition::new(&[f64::NEG_INFINITY]).is_none());
    }

    #[test]
    fn no_cuts_is_one_interval() {
        let all = Partition::new(&[]).unwrap();
        assert_eq!(all.size(), 1);
        assert_eq!(all.value_to_interval(1e300), 0);
        assert_eq!(all.width(0), Some(f64::INFINITY));
    }
}
