//! Shared type definitions for the microsimulation runtime.
//!
//! This crate is the single source of truth for identifiers and plain data
//! records exchanged between the entity model, the tabulation engine, the
//! random stream subsystem and the run orchestration layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe integer wrappers for entity, table and measure identifiers
//! - [`enums`] -- Enumeration types (attribute types, statistics, increment kinds, modes)
//! - [`structs`] -- Plain records handed across crate boundaries
//! - [`limiter`] -- Per-call-site caps on usage-error warnings
//! - [`partition`] -- Real-valued intervals for classifying continuous attributes
//! - [`range`] -- Bounded integer spans

pub mod enums;
pub mod ids;
pub mod limiter;
pub mod partition;
pub mod range;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AttributeType, IncrementKind, SimulationMode, Statistic};
pub use ids::{AccumulatorId, EntityId, MeasureId, TableId};
pub use limiter::WarningLimiter;
pub use partition::Partition;
pub use range::Range;
pub use structs::{AccumulatorBlock, AttributeDescriptor, MeasureBlock, StreamState, TableAddress};
