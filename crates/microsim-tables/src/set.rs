//! The per-member collection of tables and its run lifecycle.
//!
//! A [`TableSet`] is owned by exactly one simulated member. Entity hooks
//! reach their tables through it by [`TableId`]; derived tables and
//! external code address measures by `"table.measure"` name through the
//! shared [`TableCatalog`].

use std::sync::Arc;

use microsim_types::limiter::DEFAULT_WARNING_LIMIT;
use microsim_types::{AccumulatorBlock, MeasureBlock, TableAddress, TableId, WarningLimiter};
use tracing::{debug, warn};

use crate::catalog::TableCatalog;
use crate::derived::DerivedTable;
use crate::entity_table::EntityTable;
use crate::error::TableError;
use crate::table::{Table, TableLifecycle};

static GET_TABLE_VALUE_WARNING: WarningLimiter = WarningLimiter::new(DEFAULT_WARNING_LIMIT);
static SET_TABLE_VALUE_WARNING: WarningLimiter = WarningLimiter::new(DEFAULT_WARNING_LIMIT);

/// One table of a set, by kind.
pub enum TableKind {
    /// Accumulating table fed by entity increments.
    Entity(EntityTable),
    /// Table computed from other tables after the run.
    Derived(DerivedTable),
    /// Any other table kind supplying its own accumulator semantics.
    Custom(Box<dyn TableLifecycle>),
}

impl TableKind {
    /// Measure storage.
    pub fn table(&self) -> &Table {
        match self {
            Self::Entity(table) => table.table(),
            Self::Derived(table) => table.table(),
            Self::Custom(table) => table.table(),
        }
    }

    /// Mutable measure storage.
    pub fn table_mut(&mut self) -> &mut Table {
        match self {
            Self::Entity(table) => table.table_mut(),
            Self::Derived(table) => table.table_mut(),
            Self::Custom(table) => table.table_mut(),
        }
    }

    /// The accumulator lifecycle, absent for derived tables.
    pub fn lifecycle(&self) -> Option<&dyn TableLifecycle> {
        match self {
            Self::Entity(table) => Some(table),
            Self::Derived(_) => None,
            Self::Custom(table) => Some(table.as_ref()),
        }
    }

    /// Mutable accumulator lifecycle, absent for derived tables.
    pub fn lifecycle_mut(&mut self) -> Option<&mut dyn TableLifecycle> {
        match self {
            Self::Entity(table) => Some(table),
            Self::Derived(_) => None,
            Self::Custom(table) => Some(table.as_mut()),
        }
    }

    /// Short kind name for diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Entity(table) if table.has_observations() => "entity table with observations",
            Self::Entity(_) => "entity table",
            Self::Derived(_) => "derived table",
            Self::Custom(_) => "custom table",
        }
    }
}

impl std::fmt::Debug for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableKind")
            .field("kind", &self.kind_name())
            .field("name", &self.table().name())
            .finish()
    }
}

impl From<EntityTable> for TableKind {
    fn from(table: EntityTable) -> Self {
        Self::Entity(table)
    }
}

impl From<DerivedTable> for TableKind {
    fn from(table: DerivedTable) -> Self {
        Self::Derived(table)
    }
}

/// Every table of one simulated member.
#[derive(Debug)]
pub struct TableSet {
    catalog: Arc<TableCatalog>,
    tables: Vec<TableKind>,
}

impl TableSet {
    /// Build a set whose table ids equal their positions, compiling a
    /// fresh catalog.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::TableIdMismatch`] or
    /// [`TableError::DuplicateTable`].
    pub fn new(tables: Vec<TableKind>) -> Result<Self, TableError> {
        let catalog = TableCatalog::compile(tables.iter().map(TableKind::table))?;
        Self::with_catalog(tables, Arc::new(catalog))
    }

    /// Build a set sharing an already compiled catalog.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::TableIdMismatch`] if a table's id differs
    /// from its position, or [`TableError::CatalogMismatch`] if the
    /// catalog was compiled from different tables.
    pub fn with_catalog(tables: Vec<TableKind>, catalog: Arc<TableCatalog>) -> Result<Self, TableError> {
        for (position, kind) in tables.iter().enumerate() {
            let table = kind.table();
            if usize::try_from(table.id().into_inner()).ok() != Some(position) {
                return Err(TableError::TableIdMismatch {
                    table: table.name().to_owned(),
                    id: table.id(),
                    position,
                });
            }
        }
        catalog.verify(tables.iter().map(TableKind::table))?;
        Ok(Self { catalog, tables })
    }

    /// The shared name catalog.
    pub const fn catalog(&self) -> &Arc<TableCatalog> {
        &self.catalog
    }

    /// Table `id` of any kind.
    pub fn get(&self, id: TableId) -> Option<&TableKind> {
        usize::try_from(id.into_inner()).ok().and_then(|p| self.tables.get(p))
    }

    fn get_mut(&mut self, id: TableId) -> Option<&mut TableKind> {
        usize::try_from(id.into_inner())
            .ok()
            .and_then(|p| self.tables.get_mut(p))
    }

    /// Entity table `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownTable`] or [`TableError::WrongTableKind`].
    pub fn entity_table(&self, id: TableId) -> Result<&EntityTable, TableError> {
        match self.get(id) {
            Some(TableKind::Entity(table)) => Ok(table),
            Some(_) => Err(wrong_kind(id)),
            None => Err(TableError::UnknownTable(id.to_string())),
        }
    }

    /// Mutable entity table `id`, the target of increment pushes.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownTable`] or [`TableError::WrongTableKind`].
    pub fn entity_table_mut(&mut self, id: TableId) -> Result<&mut EntityTable, TableError> {
        match self.get_mut(id) {
            Some(TableKind::Entity(table)) => Ok(table),
            Some(_) => Err(wrong_kind(id)),
            None => Err(TableError::UnknownTable(id.to_string())),
        }
    }

    /// Value of the measure at `address` and `indices`.
    ///
    /// # Errors
    ///
    /// Returns usage errors for an unknown address or bad indices.
    pub fn table_value(&self, address: TableAddress, indices: &[usize]) -> Result<f64, TableError> {
        self.get(address.table)
            .ok_or_else(|| TableError::UnknownTable(address.table.to_string()))?
            .table()
            .value(address.measure, indices)
    }

    /// Overwrite the measure at `address` and `indices`.
    ///
    /// # Errors
    ///
    /// Returns usage errors for an unknown address or bad indices.
    pub fn set_table_value_at(
        &mut self,
        address: TableAddress,
        indices: &[usize],
        value: f64,
    ) -> Result<(), TableError> {
        self.get_mut(address.table)
            .ok_or_else(|| TableError::UnknownTable(address.table.to_string()))?
            .table_mut()
            .set_value(address.measure, indices, value)
    }

    /// Value of `"table.measure"` at `indices`, or NaN with a
    /// rate-limited warning if the name or indices are bad.
    pub fn get_table_value(&self, name: &str, indices: &[usize]) -> f64 {
        let result = self
            .resolve(name)
            .and_then(|address| self.table_value(address, indices));
        result.unwrap_or_else(|error| {
            if GET_TABLE_VALUE_WARNING.allow() {
                warn!(name, ?indices, %error, "Table value read failed, returning NaN");
            }
            f64::NAN
        })
    }

    /// Overwrite `"table.measure"` at `indices`; a bad name or indices
    /// is a rate-limited warning and no-op.
    pub fn set_table_value(&mut self, name: &str, indices: &[usize], value: f64) {
        let result = self
            .resolve(name)
            .and_then(|address| self.set_table_value_at(address, indices, value));
        let Err(error) = result else {
            return;
        };
        if SET_TABLE_VALUE_WARNING.allow() {
            warn!(name, ?indices, %error, "Table value write ignored");
        }
    }

    fn resolve(&self, name: &str) -> Result<TableAddress, TableError> {
        self.catalog.resolve(name).ok_or_else(|| {
            let (table, measure) = name.split_once('.').unwrap_or((name, ""));
            if self.catalog.table_id(table).is_some() {
                TableError::UnknownMeasure {
                    table: table.to_owned(),
                    measure: measure.to_owned(),
                }
            } else {
                TableError::UnknownTable(table.to_owned())
            }
        })
    }

    /// Start of run: undefined measures, fresh accumulators.
    pub fn initialize(&mut self) {
        for kind in &mut self.tables {
            kind.table_mut().initialize_measures();
            if let Some(lifecycle) = kind.lifecycle_mut() {
                lifecycle.initialize_accumulators();
            }
        }
    }

    /// End of run: extract, scale and compute every accumulating table,
    /// then compute derived tables in declaration order.
    ///
    /// # Errors
    ///
    /// Propagates extraction errors.
    pub fn finish(&mut self, scaling: f64) -> Result<(), TableError> {
        for kind in &mut self.tables {
            if let Some(lifecycle) = kind.lifecycle_mut() {
                lifecycle.extract_accumulators()?;
                lifecycle.scale_accumulators(scaling);
                lifecycle.compute_expressions();
            }
        }
        self.compute_derived();
        Ok(())
    }

    /// Evaluate every derived table against the current set.
    pub fn compute_derived(&mut self) {
        for position in 0..self.tables.len() {
            let Some(TableKind::Derived(derived)) = self.tables.get(position) else {
                continue;
            };
            let compute = derived.compute();
            let mut target = derived.table().clone();
            compute(self, &mut target);
            if let Some(kind) = self.tables.get_mut(position) {
                *kind.table_mut() = target;
            }
            debug!(position, "Derived table computed");
        }
    }

    /// Measure columns of every table.
    pub fn measure_blocks(&self) -> Vec<MeasureBlock> {
        self.tables
            .iter()
            .flat_map(|kind| kind.table().measure_blocks())
            .collect()
    }

    /// Accumulator columns of every accumulating table.
    pub fn accumulator_blocks(&self) -> Vec<AccumulatorBlock> {
        self.tables
            .iter()
            .filter_map(TableKind::lifecycle)
            .flat_map(|lifecycle| lifecycle.accumulator_blocks())
            .collect()
    }

    /// Tables in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TableKind> {
        self.tables.iter()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the set has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn wrong_kind(table: TableId) -> TableError {
    TableError::WrongTableKind {
        table,
        expected: "an entity table",
    }
}
