//! Error types for the microsim-entity crate.
//!
//! Attribute and relationship operations themselves never fail; these
//! errors cover arena lookups, id allocation and microdata row encoding.

use microsim_types::{AttributeType, EntityId};

/// Errors that can occur during entity operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    /// No live entity has the given id.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The member's serial space is exhausted or the member index is too large.
    #[error("cannot allocate another entity id for member {member}")]
    IdSpaceExhausted {
        /// Member whose arena ran out of ids.
        member: u32,
    },

    /// A snapshot value did not match its descriptor's type.
    #[error("attribute {name}: expected {expected:?}, got {actual:?}")]
    SnapshotTypeMismatch {
        /// Attribute name from the descriptor.
        name: String,
        /// Type declared by the layout.
        expected: AttributeType,
        /// Type of the supplied value.
        actual: AttributeType,
    },

    /// A snapshot had the wrong number of values.
    #[error("snapshot has {actual} values, layout declares {expected}")]
    SnapshotArity {
        /// Number of attributes in the layout.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// An encoded row had the wrong length.
    #[error("encoded row is {actual} bytes, layout needs {expected}")]
    SnapshotLength {
        /// Row size declared by the layout.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },
}
