//! Entity tables: accumulators fed by increments, measures computed from them.
//!
//! An [`EntityTable`] owns one accumulator column per [`AccumulatorSpec`]
//! plus a per-cell push count. When any accumulator needs the whole sample
//! (percentiles, Gini) the table also carries [`ObservationCollections`]
//! and behaves as an entity table with observations.

use microsim_types::{AccumulatorBlock, AccumulatorId, IncrementKind, MeasureId, Statistic, TableId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TableError;
use crate::observations::{ObservationCollections, gini, quantile};
use crate::table::{Table, TableLifecycle};

/// One accumulator: a statistic over an increment of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorSpec {
    /// How pushed values combine.
    pub statistic: Statistic,
    /// What is pushed for each closed interval.
    pub increment: IncrementKind,
    /// Name of the attribute being tabulated.
    pub attribute: &'static str,
}

/// Attribute values at the start and the end of a closed interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncrementValues {
    /// Value when the interval opened.
    pub value_in: f64,
    /// Value when the interval closed.
    pub value_out: f64,
}

impl IncrementValues {
    /// Values of one closed interval.
    pub const fn new(value_in: f64, value_out: f64) -> Self {
        Self {
            value_in,
            value_out,
        }
    }
}

/// A measure evaluated per cell from that cell's accumulator values.
#[derive(Debug, Clone, Copy)]
pub struct MeasureSpec {
    /// Measure name.
    pub name: &'static str,
    /// Expression over the cell's accumulator values, in accumulator order.
    pub expression: fn(&[f64]) -> f64,
}

/// Accumulating table over entity increments.
#[derive(Debug, Clone)]
pub struct EntityTable {
    table: Table,
    accumulators: Vec<AccumulatorSpec>,
    values: Vec<Vec<f64>>,
    counts: Vec<u64>,
    observation_slots: Vec<Option<usize>>,
    observations: Option<ObservationCollections>,
    measures: Vec<MeasureSpec>,
}

impl EntityTable {
    /// Create a table with the given shape, accumulators and measures.
    ///
    /// # Errors
    ///
    /// Returns any shape error from [`Table::new`].
    pub fn new(
        id: TableId,
        name: &str,
        extents: &[usize],
        accumulators: &[AccumulatorSpec],
        measures: &[MeasureSpec],
    ) -> Result<Self, TableError> {
        let measure_names: Vec<&str> = measures.iter().map(|m| m.name).collect();
        let table = Table::new(id, name, extents, &measure_names)?;
        let cells = table.shape().cells();

        // Accumulators over the same increment of the same attribute share
        // one collection.
        let mut keys: Vec<(IncrementKind, &str)> = Vec::new();
        let observation_slots: Vec<Option<usize>> = accumulators
            .iter()
            .map(|spec| {
                spec.statistic.needs_observations().then(|| {
                    let key = (spec.increment, spec.attribute);
                    keys.iter().position(|k| *k == key).unwrap_or_else(|| {
                        keys.push(key);
                        keys.len().saturating_sub(1)
                    })
                })
            })
            .collect();
        let observations = (!keys.is_empty()).then(|| ObservationCollections::new(keys.len(), cells));

        let mut entity_table = Self {
            table,
            accumulators: accumulators.to_vec(),
            values: vec![Vec::new(); accumulators.len()],
            counts: vec![0; cells],
            observation_slots,
            observations,
            measures: measures.to_vec(),
        };
        entity_table.initialize_accumulators();
        Ok(entity_table)
    }

    /// Add one closed interval to `cell`, one value pair per accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CellOutOfRange`], [`TableError::IncrementArity`]
    /// or [`TableError::InvalidIncrement`]. On error nothing is recorded.
    pub fn push(&mut self, cell: usize, increments: &[IncrementValues]) -> Result<(), TableError> {
        let cells = self.counts.len();
        if cell >= cells {
            return Err(TableError::CellOutOfRange {
                table: self.table.name().to_owned(),
                cell,
                cells,
            });
        }
        if increments.len() != self.accumulators.len() {
            return Err(TableError::IncrementArity {
                table: self.table.name().to_owned(),
                expected: self.accumulators.len(),
                actual: increments.len(),
            });
        }
        let computed: Vec<f64> = self
            .accumulators
            .iter()
            .zip(increments)
            .map(|(spec, values)| spec.increment.compute(values.value_in, values.value_out))
            .collect();
        for (accumulator, (spec, value)) in self.accumulators.iter().zip(&computed).enumerate() {
            if !accepts(spec.statistic, *value) {
                return Err(TableError::InvalidIncrement {
                    table: self.table.name().to_owned(),
                    accumulator,
                    value: *value,
                });
            }
        }

        let count = self.counts.get_mut(cell).map_or(0, |count| {
            *count = count.saturating_add(1);
            *count
        });
        for (accumulator, value) in computed.into_iter().enumerate() {
            let (Some(spec), Some(column)) =
                (self.accumulators.get(accumulator), self.values.get_mut(accumulator))
            else {
                continue;
            };
            let Some(slot) = column.get_mut(cell) else {
                continue;
            };
            match spec.statistic {
                Statistic::Unit => *slot += 1.0,
                Statistic::Sum => *slot += value,
                Statistic::Mean => *slot = running_mean(*slot, value, count),
                Statistic::Minimum => *slot = slot.min(value),
                Statistic::Maximum => *slot = slot.max(value),
                _ => {
                    let observed = self.observation_slots.get(accumulator).copied().flatten();
                    if let (Some(observations), Some(obs_slot)) = (self.observations.as_mut(), observed) {
                        observations.push(obs_slot, cell, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Measure storage.
    pub const fn inner(&self) -> &Table {
        &self.table
    }

    /// Accumulator definitions in index order.
    pub fn accumulators(&self) -> &[AccumulatorSpec] {
        &self.accumulators
    }

    /// Column of accumulator `accumulator`.
    pub fn accumulator(&self, accumulator: usize) -> Option<&[f64]> {
        self.values.get(accumulator).map(Vec::as_slice)
    }

    /// Number of pushes into `cell`.
    pub fn count(&self, cell: usize) -> u64 {
        self.counts.get(cell).copied().unwrap_or(0)
    }

    /// Observation collections, present only when some accumulator needs
    /// the full sample.
    pub const fn observations(&self) -> Option<&ObservationCollections> {
        self.observations.as_ref()
    }

    /// Whether this table keeps observation collections.
    pub const fn has_observations(&self) -> bool {
        self.observations.is_some()
    }
}

impl TableLifecycle for EntityTable {
    fn table(&self) -> &Table {
        &self.table
    }

    fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    fn initialize_accumulators(&mut self) {
        let cells = self.counts.len();
        for (column, spec) in self.values.iter_mut().zip(&self.accumulators) {
            column.clear();
            column.resize(cells, spec.statistic.initial_value());
        }
        self.counts.fill(0);
        if let Some(observations) = self.observations.as_mut() {
            observations.clear();
        }
    }

    fn extract_accumulators(&mut self) -> Result<(), TableError> {
        for (accumulator, (column, spec)) in self.values.iter_mut().zip(&self.accumulators).enumerate() {
            match spec.statistic {
                Statistic::Minimum | Statistic::Maximum => {
                    for (slot, count) in column.iter_mut().zip(&self.counts) {
                        if *count == 0 {
                            *slot = f64::NAN;
                        }
                    }
                }
                statistic if statistic.needs_observations() => {
                    let slot = self.observation_slots.get(accumulator).copied().flatten();
                    let (Some(observations), Some(slot)) = (self.observations.as_ref(), slot) else {
                        continue;
                    };
                    for (cell, value) in column.iter_mut().enumerate() {
                        let sample = observations.sorted(slot, cell);
                        *value = statistic
                            .quantile()
                            .map_or_else(|| gini(&sample), |q| quantile(&sample, q));
                    }
                }
                _ => {}
            }
        }
        debug!(table = self.table.name(), "Accumulators extracted");
        Ok(())
    }

    fn scale_accumulators(&mut self, factor: f64) {
        if (factor - 1.0).abs() <= f64::EPSILON {
            return;
        }
        for (column, spec) in self.values.iter_mut().zip(&self.accumulators) {
            if spec.statistic.is_additive() {
                for value in column.iter_mut() {
                    *value *= factor;
                }
            }
        }
    }

    fn compute_expressions(&mut self) {
        let cells = self.counts.len();
        let mut row = vec![0.0; self.values.len()];
        for cell in 0..cells {
            for (slot, column) in row.iter_mut().zip(&self.values) {
                *slot = column.get(cell).copied().unwrap_or(f64::NAN);
            }
            for (measure, spec) in self.measures.iter().enumerate() {
                let id = MeasureId::new(u32::try_from(measure).unwrap_or(u32::MAX));
                if let Some(target) = self.table.measure_mut(id).and_then(|c| c.get_mut(cell)) {
                    *target = (spec.expression)(&row);
                }
            }
        }
    }

    fn accumulator_blocks(&self) -> Vec<AccumulatorBlock> {
        self.values
            .iter()
            .enumerate()
            .map(|(accumulator, values)| AccumulatorBlock {
                table: self.table.id(),
                accumulator: AccumulatorId::new(u32::try_from(accumulator).unwrap_or(u32::MAX)),
                values: values.clone(),
            })
            .collect()
    }
}

fn accepts(statistic: Statistic, value: f64) -> bool {
    match statistic {
        Statistic::Unit | Statistic::Sum | Statistic::Mean | Statistic::Gini => value.is_finite(),
        Statistic::Minimum | Statistic::Maximum => true,
        _ => !value.is_nan(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn running_mean(mean: f64, value: f64, count: u64) -> f64 {
    if count <= 1 || mean.is_nan() {
        value
    } else {
        mean + (value - mean) / count as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SUM_DURATION: AccumulatorSpec = AccumulatorSpec {
        statistic: Statistic::Sum,
        increment: IncrementKind::Delta,
        attribute: "time",
    };

    fn spec(statistic: Statistic) -> AccumulatorSpec {
        AccumulatorSpec {
            statistic,
            increment: IncrementKind::ValueOut,
            attribute: "income",
        }
    }

    fn out(value: f64) -> IncrementValues {
        IncrementValues::new(0.0, value)
    }

    #[test]
    fn accumulators_start_at_statistic_initial_values() {
        let table = EntityTable::new(
            TableId::new(0),
            "T",
            &[2],
            &[spec(Statistic::Sum), spec(Statistic::Minimum), spec(Statistic::Mean)],
            &[],
        )
        .unwrap();
        assert_eq!(table.accumulator(0).unwrap(), &[0.0, 0.0]);
        assert!(table.accumulator(1).unwrap().iter().all(|v| v.is_infinite()));
        assert!(table.accumulator(2).unwrap().iter().all(|v| v.is_nan()));
        assert!(!table.has_observations());
    }

    #[test]
    fn push_applies_each_statistic() {
        let mut table = EntityTable::new(
            TableId::new(0),
            "T",
            &[2],
            &[
                spec(Statistic::Sum),
                spec(Statistic::Mean),
                spec(Statistic::Minimum),
                spec(Statistic::Maximum),
                spec(Statistic::Unit),
            ],
            &[],
        )
        .unwrap();
        for value in [4.0, 8.0, 3.0] {
            table.push(1, &[out(value); 5]).unwrap();
        }
        let at = |a: usize| table.accumulator(a).unwrap()[1];
        assert!((at(0) - 15.0).abs() < f64::EPSILON);
        assert!((at(1) - 5.0).abs() < 1e-12);
        assert!((at(2) - 3.0).abs() < f64::EPSILON);
        assert!((at(3) - 8.0).abs() < f64::EPSILON);
        assert!((at(4) - 3.0).abs() < f64::EPSILON);
        assert_eq!(table.count(1), 3);
        assert_eq!(table.count(0), 0);
    }

    #[test]
    fn delta_increment_sums_durations() {
        let mut table = EntityTable::new(TableId::new(0), "T", &[1], &[SUM_DURATION], &[]).unwrap();
        table.push(0, &[IncrementValues::new(2.0, 5.5)]).unwrap();
        table.push(0, &[IncrementValues::new(5.5, 6.0)]).unwrap();
        assert!((table.accumulator(0).unwrap()[0] - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_pushes_are_rejected_without_effect() {
        let mut table = EntityTable::new(TableId::new(0), "T", &[2], &[SUM_DURATION], &[]).unwrap();
        assert!(matches!(
            table.push(2, &[out(1.0)]),
            Err(TableError::CellOutOfRange { cell: 2, cells: 2, .. })
        ));
        assert!(matches!(
            table.push(0, &[]),
            Err(TableError::IncrementArity { expected: 1, actual: 0, .. })
        ));
        assert!(matches!(
            table.push(0, &[IncrementValues::new(0.0, f64::INFINITY)]),
            Err(TableError::InvalidIncrement { accumulator: 0, .. })
        ));
        assert_eq!(table.count(0), 0);
        assert!(table.accumulator(0).unwrap()[0].abs() < f64::EPSILON);
    }

    #[test]
    fn observation_statistics_share_collections() {
        let mut table = EntityTable::new(
            TableId::new(3),
            "Income",
            &[1],
            &[spec(Statistic::P50), spec(Statistic::P90), spec(Statistic::Gini)],
            &[],
        )
        .unwrap();
        assert!(table.has_observations());
        assert_eq!(table.observations().unwrap().slot_count(), 1);
        for value in [5.0, 1.0, 4.0, 2.0, 3.0] {
            table.push(0, &[out(value); 3]).unwrap();
        }
        table.extract_accumulators().unwrap();
        assert!((table.accumulator(0).unwrap()[0] - 3.0).abs() < f64::EPSILON);
        assert!((table.accumulator(1).unwrap()[0] - 5.0).abs() < f64::EPSILON);
        // 2 * 55 / (5 * 15) - 6 / 5
        assert!((table.accumulator(2).unwrap()[0] - (110.0 / 75.0 - 1.2)).abs() < 1e-12);
    }

    #[test]
    fn empty_cells_extract_to_nan() {
        let mut table = EntityTable::new(
            TableId::new(0),
            "T",
            &[2],
            &[spec(Statistic::P50), spec(Statistic::Maximum)],
            &[],
        )
        .unwrap();
        table.push(0, &[out(2.0); 2]).unwrap();
        table.extract_accumulators().unwrap();
        assert!((table.accumulator(0).unwrap()[0] - 2.0).abs() < f64::EPSILON);
        assert!(table.accumulator(0).unwrap()[1].is_nan());
        assert!(table.accumulator(1).unwrap()[1].is_nan());
    }

    #[test]
    fn scaling_touches_only_additive_accumulators() {
        let mut table = EntityTable::new(
            TableId::new(0),
            "T",
            &[1],
            &[spec(Statistic::Sum), spec(Statistic::Mean)],
            &[],
        )
        .unwrap();
        table.push(0, &[out(3.0); 2]).unwrap();
        table.scale_accumulators(10.0);
        assert!((table.accumulator(0).unwrap()[0] - 30.0).abs() < f64::EPSILON);
        assert!((table.accumulator(1).unwrap()[0] - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn expressions_fill_measures_per_cell() {
        let mut table = EntityTable::new(
            TableId::new(0),
            "T",
            &[2],
            &[SUM_DURATION, spec(Statistic::Unit)],
            &[MeasureSpec {
                name: "avg",
                expression: |acc| acc[0] / acc[1],
            }],
        )
        .unwrap();
        table.push(1, &[IncrementValues::new(0.0, 6.0), out(0.0)]).unwrap();
        table.push(1, &[IncrementValues::new(0.0, 2.0), out(0.0)]).unwrap();
        table.compute_expressions();
        let avg = table.table().measure_id("avg").unwrap();
        assert!((table.table().value(avg, &[1]).unwrap() - 4.0).abs() < f64::EPSILON);
        assert!(table.table().value(avg, &[0]).unwrap().is_nan());
    }

    #[test]
    fn initialize_resets_everything() {
        let mut table = EntityTable::new(TableId::new(0), "T", &[1], &[spec(Statistic::P50)], &[]).unwrap();
        table.push(0, &[out(1.0)]).unwrap();
        table.initialize_accumulators();
        assert_eq!(table.count(0), 0);
        assert!(table.observations().unwrap().is_empty());
        let blocks = table.accumulator_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].table, TableId::new(0));
    }
}
