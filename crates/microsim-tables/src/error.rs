//! Error types for the microsim-tables crate.
//!
//! Two families share this enum. Usage errors (`InvalidRank`,
//! `InvalidIndex`, `UnknownTable`, `UnknownMeasure`) are recoverable: the
//! named-address API downgrades them to a rate-limited warning. Invariant
//! violations (`IncrementAlreadyActive`, `IncrementNotActive`,
//! `InvalidIncrement`, `CellOutOfRange`, `IncrementArity`) are programming
//! errors in model code and halt the member when propagated.

use microsim_types::TableId;

/// Errors raised by tables and increments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    /// Wrong number of indices for the table's rank.
    #[error("table {table}: expected {expected} indices, got {actual}")]
    InvalidRank {
        /// Table name.
        table: String,
        /// Table rank.
        expected: usize,
        /// Number of indices supplied.
        actual: usize,
    },

    /// An index fell outside its dimension.
    #[error("table {table}: index {index} out of range 0..{extent} in dimension {dimension}")]
    InvalidIndex {
        /// Table name.
        table: String,
        /// Zero-based dimension.
        dimension: usize,
        /// Offending index.
        index: usize,
        /// Extent of the dimension.
        extent: usize,
    },

    /// A dimension was declared with zero extent.
    #[error("table {table}: dimension {dimension} has zero extent")]
    EmptyDimension {
        /// Table name.
        table: String,
        /// Zero-based dimension.
        dimension: usize,
    },

    /// The product of the extents does not fit in `usize`.
    #[error("table {table}: cell count overflows")]
    ShapeOverflow {
        /// Table name.
        table: String,
    },

    /// No table has the given name.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The table has no measure with the given name.
    #[error("table {table} has no measure {measure}")]
    UnknownMeasure {
        /// Table name.
        table: String,
        /// Measure name.
        measure: String,
    },

    /// Two tables share a name.
    #[error("duplicate table name: {0}")]
    DuplicateTable(String),

    /// A table's id does not match its position in the table set.
    #[error("table {table} has id {id} but sits at position {position}")]
    TableIdMismatch {
        /// Table name.
        table: String,
        /// Declared id.
        id: TableId,
        /// Position in the set.
        position: usize,
    },

    /// A shared catalog does not describe the tables it was paired with.
    #[error("catalog does not match table {0}")]
    CatalogMismatch(String),

    /// A table id did not refer to a table of the expected kind.
    #[error("table {table} is not {expected}")]
    WrongTableKind {
        /// Table index.
        table: TableId,
        /// Expected kind.
        expected: &'static str,
    },

    /// `start` was called on an increment that is already active.
    #[error("increment {increment} started while already active")]
    IncrementAlreadyActive {
        /// Increment name.
        increment: &'static str,
    },

    /// `finish` was called on an increment that is not active.
    #[error("increment {increment} finished while not active")]
    IncrementNotActive {
        /// Increment name.
        increment: &'static str,
    },

    /// An increment value cannot be accumulated by its statistic.
    #[error("table {table}, accumulator {accumulator}: invalid increment {value}")]
    InvalidIncrement {
        /// Table name.
        table: String,
        /// Accumulator index.
        accumulator: usize,
        /// Offending value.
        value: f64,
    },

    /// A push named a cell beyond the table.
    #[error("table {table}: cell {cell} out of range 0..{cells}")]
    CellOutOfRange {
        /// Table name.
        table: String,
        /// Offending cell.
        cell: usize,
        /// Cell count.
        cells: usize,
    },

    /// A push supplied the wrong number of increment values.
    #[error("table {table}: expected {expected} increment values, got {actual}")]
    IncrementArity {
        /// Table name.
        table: String,
        /// Number of accumulators.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
}

impl TableError {
    /// Whether the error is a recoverable usage error rather than an
    /// invariant violation.
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRank { .. }
                | Self::InvalidIndex { .. }
                | Self::UnknownTable(_)
                | Self::UnknownMeasure { .. }
        )
    }
}
