//! Increments, tables and the tabulation lifecycle for the microsimulation runtime.
//!
//! Entities feed tables through [`Increment`]s: one per (entity, table),
//! opened when the entity enters the table's filter and closed when its
//! cell or filter changes. Closes are lagged by one event so that
//! simultaneous classificatory changes coalesce. Closed intervals are
//! pushed into [`EntityTable`] accumulators; at the end of a run the
//! [`TableSet`] extracts, scales and evaluates every table and then
//! computes [`DerivedTable`]s from the results.
//!
//! # Modules
//!
//! - [`shape`] -- Fixed-rank shapes and row-major cell flattening
//! - [`table`] -- Measure storage and the [`TableLifecycle`] contract
//! - [`increment`] -- The lagged increment state machine
//! - [`lagged`] -- Attribute values as of the event that requested a close
//! - [`observations`] -- Per-cell sample collections, quantiles and Gini
//! - [`entity_table`] -- Accumulating tables over entity increments
//! - [`derived`] -- Tables computed from other tables
//! - [`catalog`] -- Compiled `"table.measure"` name lookups
//! - [`set`] -- The per-member table collection and named access
//! - [`error`] -- Error types for table operations ([`TableError`])

pub mod catalog;
pub mod derived;
pub mod entity_table;
pub mod error;
pub mod increment;
pub mod lagged;
pub mod observations;
pub mod set;
pub mod shape;
pub mod table;

pub use catalog::TableCatalog;
pub use derived::{DerivedCompute, DerivedTable};
pub use entity_table::{AccumulatorSpec, EntityTable, IncrementValues, MeasureSpec};
pub use error::TableError;
pub use increment::{Increment, IncrementDef, IncrementHooks, IncrementState};
pub use lagged::Lagged;
pub use observations::ObservationCollections;
pub use set::{TableKind, TableSet};
pub use shape::TableShape;
pub use table::{Table, TableLifecycle};
