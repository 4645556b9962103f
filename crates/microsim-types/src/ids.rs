//! Type-safe identifier wrappers around plain integers.
//!
//! Entities, tables, measures and accumulators each get a distinct newtype
//! so identifiers cannot be mixed at compile time. Table, measure and
//! accumulator ids are positional indices assigned when the model is
//! built; entity ids are allocated by the entity arena of a single member.

use serde::{Deserialize, Serialize};

/// Number of low bits of an [`EntityId`] reserved for the per-member serial.
pub const ENTITY_SERIAL_BITS: u32 = 40;

/// Generates a newtype wrapper around an integer with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Wrap a raw value.
            pub const fn new(raw: $inner) -> Self {
                Self(raw)
            }

            /// Return the inner raw value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Process-unique 64-bit key of a simulated entity.
    ///
    /// The member (sub-sample) index occupies the high bits and a
    /// per-member serial the low [`ENTITY_SERIAL_BITS`] bits, so members
    /// running concurrently never hand out the same key.
    EntityId(u64)
}

define_id! {
    /// Index of a table in the compiled table catalog.
    TableId(u32)
}

define_id! {
    /// Index of a measure within its table.
    MeasureId(u32)
}

define_id! {
    /// Index of an accumulator within its entity table.
    AccumulatorId(u32)
}

const SERIAL_MASK: u64 = (1 << ENTITY_SERIAL_BITS) - 1;

/// Exclusive upper bound on the member index an [`EntityId`] can carry.
pub const MAX_MEMBERS: u32 = 1 << (64 - ENTITY_SERIAL_BITS);

impl EntityId {
    /// Compose an id from a member index and a per-member serial.
    ///
    /// Returns `None` if the serial does not fit in
    /// [`ENTITY_SERIAL_BITS`] bits or the member is not below
    /// [`MAX_MEMBERS`].
    pub const fn from_parts(member: u32, serial: u64) -> Option<Self> {
        if serial > SERIAL_MASK || member >= MAX_MEMBERS {
            return None;
        }
        Some(Self((member as u64).wrapping_shl(ENTITY_SERIAL_BITS) | serial))
    }

    /// Member index encoded in the high bits.
    pub const fn member(self) -> u64 {
        self.0.wrapping_shr(ENTITY_SERIAL_BITS)
    }

    /// Per-member serial encoded in the low bits.
    pub const fn serial(self) -> u64 {
        self.0 & SERIAL_MASK
    }
}
