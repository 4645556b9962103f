//! Dense N-dimensional measure storage and the table lifecycle contract.
//!
//! A [`Table`] owns its measures: one flat `f64` column per measure, one
//! entry per cell, initially NaN (the undefined marker). Concrete table
//! kinds wrap a `Table` and implement [`TableLifecycle`] to say what their
//! accumulators mean; the engine owns only the storage and the order in
//! which the four lifecycle steps run.

use microsim_types::{AccumulatorBlock, MeasureBlock, MeasureId, TableId};
use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::shape::TableShape;

/// Named table of measures over a fixed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    id: TableId,
    name: String,
    shape: TableShape,
    measure_names: Vec<String>,
    measures: Vec<Vec<f64>>,
}

impl Table {
    /// Create a table with every measure initialized to NaN.
    ///
    /// # Errors
    ///
    /// Returns any shape error from [`TableShape::new`].
    pub fn new(
        id: TableId,
        name: &str,
        extents: &[usize],
        measure_names: &[&str],
    ) -> Result<Self, TableError> {
        let shape = TableShape::new(name, extents)?;
        let measures = vec![vec![f64::NAN; shape.cells()]; measure_names.len()];
        Ok(Self {
            id,
            name: name.to_owned(),
            shape,
            measure_names: measure_names.iter().map(|m| (*m).to_owned()).collect(),
            measures,
        })
    }

    /// Reset every cell of every measure to NaN.
    pub fn initialize_measures(&mut self) {
        for column in &mut self.measures {
            column.fill(f64::NAN);
        }
    }

    /// Flatten one index per dimension into a cell index.
    ///
    /// # Errors
    ///
    /// See [`TableShape::cell_index`].
    pub fn cell_index(&self, indices: &[usize]) -> Result<usize, TableError> {
        self.shape.cell_index(indices)
    }

    /// Index of the measure called `name`.
    pub fn measure_id(&self, name: &str) -> Option<MeasureId> {
        self.measure_names
            .iter()
            .position(|m| m == name)
            .and_then(|p| u32::try_from(p).ok())
            .map(MeasureId::new)
    }

    /// Column of measure `measure`.
    pub fn measure(&self, measure: MeasureId) -> Option<&[f64]> {
        self.measures.get(position(measure)).map(Vec::as_slice)
    }

    /// Mutable column of measure `measure`.
    pub fn measure_mut(&mut self, measure: MeasureId) -> Option<&mut [f64]> {
        self.measures.get_mut(position(measure)).map(Vec::as_mut_slice)
    }

    /// Value of `measure` at the given indices.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownMeasure`], [`TableError::InvalidRank`]
    /// or [`TableError::InvalidIndex`].
    pub fn value(&self, measure: MeasureId, indices: &[usize]) -> Result<f64, TableError> {
        let cell = self.cell_index(indices)?;
        self.measure(measure)
            .and_then(|column| column.get(cell))
            .copied()
            .ok_or_else(|| self.unknown_measure(measure))
    }

    /// Overwrite `measure` at the given indices.
    ///
    /// # Errors
    ///
    /// See [`Self::value`].
    pub fn set_value(
        &mut self,
        measure: MeasureId,
        indices: &[usize],
        value: f64,
    ) -> Result<(), TableError> {
        let cell = self.cell_index(indices)?;
        let unknown = self.unknown_measure(measure);
        let slot = self
            .measure_mut(measure)
            .and_then(|column| column.get_mut(cell))
            .ok_or(unknown)?;
        *slot = value;
        Ok(())
    }

    fn unknown_measure(&self, measure: MeasureId) -> TableError {
        TableError::UnknownMeasure {
            table: self.name.clone(),
            measure: measure.to_string(),
        }
    }

    /// Every measure column with its qualified name.
    pub fn measure_blocks(&self) -> Vec<MeasureBlock> {
        self.measure_names
            .iter()
            .zip(&self.measures)
            .enumerate()
            .map(|(m, (name, values))| MeasureBlock {
                table: self.id,
                measure: MeasureId::new(u32::try_from(m).unwrap_or(u32::MAX)),
                name: format!("{}.{name}", self.name),
                shape: self.shape.extents().to_vec(),
                values: values.clone(),
            })
            .collect()
    }

    /// Table index.
    pub const fn id(&self) -> TableId {
        self.id
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table shape.
    pub const fn shape(&self) -> &TableShape {
        &self.shape
    }

    /// Measure names in index order.
    pub fn measure_names(&self) -> &[String] {
        &self.measure_names
    }
}

fn position(measure: MeasureId) -> usize {
    usize::try_from(measure.into_inner()).unwrap_or(usize::MAX)
}

/// Lifecycle every accumulating table kind implements.
///
/// Invoked once per run per table instance, in this order:
/// [`initialize_accumulators`](Self::initialize_accumulators) before the
/// simulation, then [`extract_accumulators`](Self::extract_accumulators),
/// [`scale_accumulators`](Self::scale_accumulators) and
/// [`compute_expressions`](Self::compute_expressions) after it.
pub trait TableLifecycle: Send {
    /// Measure storage.
    fn table(&self) -> &Table;

    /// Mutable measure storage.
    fn table_mut(&mut self) -> &mut Table;

    /// Reset accumulators to their statistic's starting value.
    fn initialize_accumulators(&mut self);

    /// Turn raw accumulator state (including observation collections)
    /// into final accumulator values.
    fn extract_accumulators(&mut self) -> Result<(), TableError>;

    /// Apply population scaling to additive accumulators.
    fn scale_accumulators(&mut self, factor: f64);

    /// Evaluate measure expressions from accumulator values.
    fn compute_expressions(&mut self);

    /// Flat accumulator arrays for persistence.
    fn accumulator_blocks(&self) -> Vec<AccumulatorBlock> {
        Vec::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(TableId::new(0), "Income", &[2, 3], &["mean", "total"]).unwrap()
    }

    #[test]
    fn measures_start_undefined() {
        let table = table();
        assert_eq!(table.shape().cells(), 6);
        for m in 0..2 {
            let column = table.measure(MeasureId::new(m)).unwrap();
            assert_eq!(column.len(), 6);
            assert!(column.iter().all(|v| v.is_nan()));
        }
    }

    #[test]
    fn set_then_read_by_indices() {
        let mut table = table();
        let total = table.measure_id("total").unwrap();
        table.set_value(total, &[1, 2], 42.0).unwrap();
        assert!((table.value(total, &[1, 2]).unwrap() - 42.0).abs() < f64::EPSILON);
        assert!((table.measure(total).unwrap()[5] - 42.0).abs() < f64::EPSILON);
        assert!(table.value(total, &[0, 0]).unwrap().is_nan());
    }

    #[test]
    fn initialize_measures_resets_to_nan() {
        let mut table = table();
        let mean = table.measure_id("mean").unwrap();
        table.set_value(mean, &[0, 1], 1.0).unwrap();
        table.initialize_measures();
        assert!(table.value(mean, &[0, 1]).unwrap().is_nan());
    }

    #[test]
    fn bad_addresses_are_errors() {
        let mut table = table();
        assert!(table.measure_id("median").is_none());
        assert!(matches!(
            table.value(MeasureId::new(7), &[0, 0]),
            Err(TableError::UnknownMeasure { .. })
        ));
        assert!(table.value(MeasureId::new(0), &[0]).is_err());
        assert!(table.set_value(MeasureId::new(0), &[2, 0], 1.0).is_err());
    }

    #[test]
    fn measure_blocks_carry_qualified_names() {
        let blocks = table().measure_blocks();
        let names: Vec<&str> = blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Income.mean", "Income.total"]);
        assert_eq!(blocks[1].shape, vec![2, 3]);
    }
}
