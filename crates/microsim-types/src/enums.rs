//! Enumeration types for the microsimulation runtime.
//!
//! Covers the storage types an attribute may have, the statistics an
//! entity table accumulator can compute, the kinds of increment an
//! accumulator is fed with, and the two simulation modes.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Attribute storage types
// ---------------------------------------------------------------------------

/// Fixed storage type of an attribute, as seen by microdata export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Boolean, stored as one byte.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
}

impl AttributeType {
    /// Size in bytes of one encoded value.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Int | Self::Float => 4,
            Self::Long | Self::Double => 8,
        }
    }

    /// Short lowercase tag used in descriptor lists.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

// ---------------------------------------------------------------------------
// Accumulator statistics
// ---------------------------------------------------------------------------

/// Statistic computed by one entity table accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Count of increments (each increment contributes 1).
    Unit,
    /// Sum of increments.
    Sum,
    /// Running mean of increments.
    Mean,
    /// Smallest increment.
    Minimum,
    /// Largest increment.
    Maximum,
    /// Gini coefficient of the observed increments.
    Gini,
    /// 1st percentile.
    P1,
    /// 2nd percentile.
    P2,
    /// 5th percentile.
    P5,
    /// 10th percentile.
    P10,
    /// 20th percentile.
    P20,
    /// 25th percentile.
    P25,
    /// 30th percentile.
    P30,
    /// 40th percentile.
    P40,
    /// Median.
    P50,
    /// 60th percentile.
    P60,
    /// 70th percentile.
    P70,
    /// 75th percentile.
    P75,
    /// 80th percentile.
    P80,
    /// 90th percentile.
    P90,
    /// 95th percentile.
    P95,
    /// 98th percentile.
    P98,
    /// 99th percentile.
    P99,
}

impl Statistic {
    /// Quantile level for percentile statistics, `None` otherwise.
    pub const fn quantile(self) -> Option<f64> {
        match self {
            Self::P1 => Some(0.01),
            Self::P2 => Some(0.02),
            Self::P5 => Some(0.05),
            Self::P10 => Some(0.10),
            Self::P20 => Some(0.20),
            Self::P25 => Some(0.25),
            Self::P30 => Some(0.30),
            Self::P40 => Some(0.40),
            Self::P50 => Some(0.50),
            Self::P60 => Some(0.60),
            Self::P70 => Some(0.70),
            Self::P75 => Some(0.75),
            Self::P80 => Some(0.80),
            Self::P90 => Some(0.90),
            Self::P95 => Some(0.95),
            Self::P98 => Some(0.98),
            Self::P99 => Some(0.99),
            Self::Unit | Self::Sum | Self::Mean | Self::Minimum | Self::Maximum | Self::Gini => {
                None
            }
        }
    }

    /// Whether the statistic needs the full sample rather than a running value.
    pub const fn needs_observations(self) -> bool {
        matches!(self, Self::Gini) || self.quantile().is_some()
    }

    /// Whether the statistic is additive and therefore subject to population scaling.
    pub const fn is_additive(self) -> bool {
        matches!(self, Self::Unit | Self::Sum)
    }

    /// Value an accumulator of this statistic holds before any increment.
    pub const fn initial_value(self) -> f64 {
        match self {
            Self::Unit | Self::Sum => 0.0,
            Self::Minimum => f64::INFINITY,
            Self::Maximum => f64::NEG_INFINITY,
            _ => f64::NAN,
        }
    }
}

// ---------------------------------------------------------------------------
// Increment kinds
// ---------------------------------------------------------------------------

/// How the closing increment of an interval is derived from the attribute
/// value at the start (`value_in`) and at the end (`value_out`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementKind {
    /// Value at interval start.
    ValueIn,
    /// 1 if the value at interval start is non-zero.
    NzValueIn,
    /// Square of the value at interval start.
    ValueIn2,
    /// Value at interval end.
    ValueOut,
    /// 1 if the value at interval end is non-zero.
    NzValueOut,
    /// Square of the value at interval end.
    ValueOut2,
    /// Change over the interval.
    Delta,
    /// 1 if the value changed over the interval.
    NzDelta,
    /// Square of the change over the interval.
    Delta2,
    /// Constant 1, independent of any attribute.
    Unit,
}

impl IncrementKind {
    /// Compute the increment from the interval's start and end values.
    pub fn compute(self, value_in: f64, value_out: f64) -> f64 {
        let nonzero = |v: f64| if v == 0.0 { 0.0 } else { 1.0 };
        match self {
            Self::ValueIn => value_in,
            Self::NzValueIn => nonzero(value_in),
            Self::ValueIn2 => value_in * value_in,
            Self::ValueOut => value_out,
            Self::NzValueOut => nonzero(value_out),
            Self::ValueOut2 => value_out * value_out,
            Self::Delta => value_out - value_in,
            Self::NzDelta => nonzero(value_out - value_in),
            Self::Delta2 => (value_out - value_in) * (value_out - value_in),
            Self::Unit => 1.0,
        }
    }

    /// Whether the increment reads the value at interval start.
    pub const fn uses_value_in(self) -> bool {
        !matches!(self, Self::ValueOut | Self::NzValueOut | Self::ValueOut2 | Self::Unit)
    }
}

// ---------------------------------------------------------------------------
// Simulation mode
// ---------------------------------------------------------------------------

/// How a run is divided into independently seeded units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// Each case is simulated from its own case seed; members split the cases.
    #[default]
    CaseBased,
    /// Each member simulates one interacting population over a time horizon.
    TimeBased,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes_match_storage() {
        assert_eq!(AttributeType::Bool.byte_size(), 1);
        assert_eq!(AttributeType::Int.byte_size(), 4);
        assert_eq!(AttributeType::Double.byte_size(), 8);
    }

    #[test]
    fn initial_values_follow_statistic() {
        assert!(Statistic::Sum.initial_value().abs() < f64::EPSILON);
        assert!(Statistic::Minimum.initial_value().is_infinite());
        assert!(Statistic::Minimum.initial_value() > 0.0);
        assert!(Statistic::Maximum.initial_value() < 0.0);
        assert!(Statistic::Mean.initial_value().is_nan());
        assert!(Statistic::P50.initial_value().is_nan());
    }

    #[test]
    fn observation_statistics_are_quantiles_and_gini() {
        assert!(Statistic::Gini.needs_observations());
        assert!(Statistic::P99.needs_observations());
        assert!(!Statistic::Sum.needs_observations());
        assert!(!Statistic::Maximum.needs_observations());
    }

    #[test]
    fn increment_kinds_compute_expected_values() {
        assert!((IncrementKind::Delta.compute(2.0, 5.0) - 3.0).abs() < f64::EPSILON);
        assert!((IncrementKind::Delta2.compute(2.0, 5.0) - 9.0).abs() < f64::EPSILON);
        assert!((IncrementKind::NzDelta.compute(2.0, 2.0)).abs() < f64::EPSILON);
        assert!((IncrementKind::NzValueOut.compute(0.0, -4.0) - 1.0).abs() < f64::EPSILON);
        assert!((IncrementKind::Unit.compute(7.0, 9.0) - 1.0).abs() < f64::EPSILON);
        assert!(!IncrementKind::ValueOut.uses_value_in());
        assert!(IncrementKind::Delta.uses_value_in());
    }

    #[test]
    fn enums_serialize_snake_case() {
        let json = serde_json::to_string(&Statistic::P50).ok();
        assert_eq!(json.as_deref(), Some("\"p50\""));
        let json = serde_json::to_string(&SimulationMode::TimeBased).ok();
        assert_eq!(json.as_deref(), Some("\"time_based\""));
    }
}
