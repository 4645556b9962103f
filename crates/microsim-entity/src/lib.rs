//! Entity attributes, relationships and arenas for the microsimulation runtime.
//!
//! This crate is the in-memory model of simulated entities. Generated model
//! code composes entity structs from [`Attribute`], [`Link`] and
//! [`Multilink`] fields and describes each field once, in a static
//! definition ([`AttributeDef`], [`LinkDef`], [`MultilinkDef`]) that names
//! accessor functions and change hooks. Operations take the owning entity
//! (or the arena plus the owner's id) explicitly; no field ever locates
//! its owner on its own.
//!
//! # Modules
//!
//! - [`attribute`] -- Plain attributes with change notification and side effects
//! - [`duration`] -- Time-integrated attributes advanced by `wait`
//! - [`expression`] -- Attributes recomputed from the owning entity on demand
//! - [`link`] -- Single weak references with reciprocal maintenance
//! - [`multilink`] -- Sets of weak references with first-fit slot reuse
//! - [`arena`] -- Per-member entity storage and the null entity
//! - [`entity_set`] -- Id-ordered sets of entities with positional and random access
//! - [`snapshot`] -- Attribute descriptor lists and row encoding for microdata
//! - [`error`] -- Error types for entity operations ([`EntityError`])

pub mod arena;
pub mod attribute;
pub mod duration;
pub mod entity_set;
pub mod error;
pub mod expression;
pub mod link;
pub mod multilink;
pub mod snapshot;

pub use arena::EntityArena;
pub use attribute::{Attribute, AttributeDef};
pub use duration::DurationDef;
pub use entity_set::EntitySet;
pub use error::EntityError;
pub use expression::ExpressionDef;
pub use link::{Link, LinkDef};
pub use multilink::{Multilink, MultilinkDef};
pub use snapshot::{AttributeValue, Microdata, SnapshotLayout};
