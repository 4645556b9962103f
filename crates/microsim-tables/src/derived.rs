//! Derived tables: measures computed from other tables after the run.

use microsim_types::TableId;

use crate::error::TableError;
use crate::set::TableSet;
use crate::table::Table;

/// Computes a derived table's measures from the finished table set.
///
/// Reads normally go through [`TableSet::get_table_value`], so a bad
/// reference yields NaN and a warning instead of aborting the run.
pub type DerivedCompute = fn(&TableSet, &mut Table);

/// A table with no accumulators whose measures are filled by a
/// [`DerivedCompute`] once every entity table is finished.
#[derive(Debug, Clone)]
pub struct DerivedTable {
    table: Table,
    compute: DerivedCompute,
}

impl DerivedTable {
    /// Create a derived table with NaN measures.
    ///
    /// # Errors
    ///
    /// Returns any shape error from [`Table::new`].
    pub fn new(
        id: TableId,
        name: &str,
        extents: &[usize],
        measure_names: &[&str],
        compute: DerivedCompute,
    ) -> Result<Self, TableError> {
        Ok(Self {
            table: Table::new(id, name, extents, measure_names)?,
            compute,
        })
    }

    /// Measure storage.
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// Mutable measure storage.
    pub const fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    /// The compute function.
    pub const fn compute(&self) -> DerivedCompute {
        self.compute
    }
}
