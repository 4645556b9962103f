//! Discrete distributions sampled through cumulative probability tables.
//!
//! A [`CumrateDistribution`] orders its outcomes by descending frequency,
//! breaking ties by descending outcome index, and samples by locating a
//! uniform draw in the running sum of normalized frequencies. The
//! tie-break order is part of the numeric contract: two implementations
//! given the same frequencies and the same uniform must return the same
//! outcome.
//!
//! Distributions are immutable once built, so a table can never be
//! initialized twice.

use tracing::debug;

use crate::error::RandomError;

/// One distribution over `0..n`.
#[derive(Debug, Clone, PartialEq)]
pub struct CumrateDistribution {
    /// Outcome indices in sampling order.
    order: Vec<usize>,
    /// Running probability, parallel to `order`.
    cumulative: Vec<f64>,
    degenerate: bool,
}

impl CumrateDistribution {
    /// Build a distribution from non-negative frequency weights.
    ///
    /// When every weight is zero the distribution is degenerate: every
    /// cumulative probability is 1.0 and every draw returns the first
    /// outcome of the sorted order (the highest index).
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::EmptyDistribution`] for an empty slice and
    /// [`RandomError::InvalidFrequency`] for a negative or non-finite weight.
    pub fn new(frequencies: &[f64]) -> Result<Self, RandomError> {
        if frequencies.is_empty() {
            return Err(RandomError::EmptyDistribution);
        }
        if let Some((index, &value)) = frequencies
            .iter()
            .enumerate()
            .find(|(_, f)| !f.is_finite() || **f < 0.0)
        {
            return Err(RandomError::InvalidFrequency { index, value });
        }

        let total: f64 = frequencies.iter().sum();
        let degenerate = total <= 0.0;

        let mut weighted: Vec<(usize, f64)> = frequencies
            .iter()
            .enumerate()
            .map(|(index, &f)| (index, if degenerate { 0.0 } else { f / total }))
            .collect();
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));

        let cumulative = if degenerate {
            vec![1.0; weighted.len()]
        } else {
            weighted
                .iter()
                .scan(0.0, |running, (_, p)| {
                    *running += p;
                    Some(*running)
                })
                .collect()
        };
        let order = weighted.into_iter().map(|(index, _)| index).collect();

        if degenerate {
            debug!(outcomes = frequencies.len(), "Degenerate distribution built");
        }

        Ok(Self {
            order,
            cumulative,
            degenerate,
        })
    }

    /// Map a uniform draw in `(0, 1)` to an outcome index.
    ///
    /// A draw beyond the last cumulative value (possible only through
    /// rounding of the running sum) resolves to the last sorted outcome.
    pub fn draw(&self, uniform: f64) -> usize {
        let first = self.cumulative.first().copied().unwrap_or(1.0);
        if uniform <= first {
            return self.order.first().copied().unwrap_or(0);
        }
        let position = self.cumulative.partition_point(|&c| c < uniform);
        self.order
            .get(position)
            .or_else(|| self.order.last())
            .copied()
            .unwrap_or(0)
    }

    /// Outcome indices in sampling order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Cumulative probabilities, parallel to [`Self::order`].
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Whether every input frequency was zero.
    pub const fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Number of outcomes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always `false`: empty distributions are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A batch of independent distributions over the same outcome count,
/// keyed by distribution index.
#[derive(Debug, Clone, PartialEq)]
pub struct Cumrate {
    outcomes: usize,
    distributions: Vec<CumrateDistribution>,
}

impl Cumrate {
    /// Build `distributions` tables of `outcomes` entries each from a
    /// row-major frequency slice (one row per distribution).
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::ShapeMismatch`] if the slice length is not
    /// `distributions * outcomes`, or any error of
    /// [`CumrateDistribution::new`] for an individual row.
    pub fn from_frequencies(
        distributions: usize,
        outcomes: usize,
        frequencies: &[f64],
    ) -> Result<Self, RandomError> {
        let expected = distributions.saturating_mul(outcomes);
        if expected != frequencies.len() || outcomes == 0 {
            return Err(RandomError::ShapeMismatch {
                expected,
                actual: frequencies.len(),
            });
        }
        let distributions = frequencies
            .chunks_exact(outcomes)
            .map(CumrateDistribution::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            outcomes,
            distributions,
        })
    }

    /// Draw from distribution `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::UnknownDistribution`] if `index` is out of range.
    pub fn draw(&self, index: usize, uniform: f64) -> Result<usize, RandomError> {
        self.get(index).map(|d| d.draw(uniform))
    }

    /// Borrow distribution `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::UnknownDistribution`] if `index` is out of range.
    pub fn get(&self, index: usize) -> Result<&CumrateDistribution, RandomError> {
        self.distributions
            .get(index)
            .ok_or(RandomError::UnknownDistribution {
                index,
                count: self.distributions.len(),
            })
    }

    /// Number of distributions in the batch.
    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    /// Whether the batch holds no distributions.
    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    /// Outcome count shared by every distribution.
    pub const fn outcomes(&self) -> usize {
        self.outcomes
    }
}
