//! Error types raised while simulating a member.
//!
//! [`SimulationError`] is the error type model hooks return. It absorbs
//! the subsystem errors with `?`, so an invariant violation deep inside an
//! increment or a relationship halts the member that raised it.

use microsim_entity::EntityError;
use microsim_random::RandomError;
use microsim_tables::TableError;

use crate::clock::ClockError;

/// Errors that halt one member's simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Random stream failure.
    #[error("random error: {source}")]
    Random {
        /// The underlying random error.
        #[from]
        source: RandomError,
    },

    /// Table or increment failure.
    #[error("table error: {source}")]
    Table {
        /// The underlying table error.
        #[from]
        source: TableError,
    },

    /// Entity or relationship failure.
    #[error("entity error: {source}")]
    Entity {
        /// The underlying entity error.
        #[from]
        source: EntityError,
    },

    /// Clock failure.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A checkpoint belongs to a different member.
    #[error("checkpoint of member {checkpoint} cannot restore member {member}")]
    CheckpointMismatch {
        /// Member being restored.
        member: u32,
        /// Member the checkpoint was taken from.
        checkpoint: u32,
    },

    /// Model-specific failure.
    #[error("model error: {message}")]
    Model {
        /// Description of the failure.
        message: String,
    },
}
