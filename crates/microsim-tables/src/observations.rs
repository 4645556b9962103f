//! Per-cell observation collections and the statistics computed from them.
//!
//! Statistics that need the whole sample (percentiles, Gini) cannot be
//! kept as a running value. Each distinct (increment, attribute) pair
//! feeding such statistics gets one collection slot, and every push
//! appends to that slot's collection for the cell.

use serde::{Deserialize, Serialize};

/// Append-only value collections indexed by slot, then cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationCollections {
    slots: Vec<Vec<Vec<f64>>>,
}

impl ObservationCollections {
    /// Empty collections for `slots` slots over `cells` cells.
    pub fn new(slots: usize, cells: usize) -> Self {
        Self {
            slots: vec![vec![Vec::new(); cells]; slots],
        }
    }

    /// Append `value` to the collection of (`slot`, `cell`). Returns
    /// `false` if either index is out of range.
    pub fn push(&mut self, slot: usize, cell: usize, value: f64) -> bool {
        let Some(collection) = self.slots.get_mut(slot).and_then(|s| s.get_mut(cell)) else {
            return false;
        };
        collection.push(value);
        true
    }

    /// Observed values of (`slot`, `cell`) in push order.
    pub fn get(&self, slot: usize, cell: usize) -> &[f64] {
        self.slots
            .get(slot)
            .and_then(|s| s.get(cell))
            .map_or(&[], Vec::as_slice)
    }

    /// Observed values of (`slot`, `cell`) in ascending order.
    pub fn sorted(&self, slot: usize, cell: usize) -> Vec<f64> {
        let mut values = self.get(slot, cell).to_vec();
        values.sort_by(f64::total_cmp);
        values
    }

    /// Drop every observation, keeping the slot and cell layout.
    pub fn clear(&mut self) {
        for collection in self.slots.iter_mut().flatten() {
            collection.clear();
        }
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Total number of observations across all slots and cells.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().map(Vec::len).sum()
    }

    /// Whether no observation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().flatten().all(Vec::is_empty)
    }
}

/// First value of an ascending sample whose cumulative count reaches
/// `n × q`. NaN for an empty sample.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let target = sample_size(sorted) * q;
    let mut cumulative = 0.0;
    for value in sorted {
        cumulative += 1.0;
        if cumulative >= target {
            return *value;
        }
    }
    sorted.last().copied().unwrap_or(f64::NAN)
}

/// Gini coefficient of an ascending sample:
/// `2 Σ(rank × value) / (n Σ value) − (n + 1) / n`.
///
/// NaN for an empty sample or one summing to zero.
pub fn gini(sorted: &[f64]) -> f64 {
    let n = sample_size(sorted);
    let mut total = 0.0;
    let mut ranked_total = 0.0;
    let mut rank = 0.0;
    for value in sorted {
        rank += 1.0;
        total += value;
        ranked_total += rank * value;
    }
    if sorted.is_empty() || total == 0.0 {
        return f64::NAN;
    }
    2.0 * ranked_total / (n * total) - (n + 1.0) / n
}

#[allow(clippy::cast_precision_loss)]
const fn sample_size(sample: &[f64]) -> f64 {
    sample.len() as f64
}
