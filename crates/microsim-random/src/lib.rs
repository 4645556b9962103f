//! Deterministic randomness for the microsimulation runtime.
//!
//! Every concurrently simulated member owns one [`RandomStreams`] set. The
//! set holds a fixed number of independent multiplicative congruential
//! streams, all seeded from a single root: the case seed in case-based
//! runs, the run seed in time-based runs. Seeds are layered so that the
//! draw sequence of any one member (and any one case of that member)
//! depends only on the starting seed and the member index, never on how
//! many other members run alongside it.
//!
//! # Modules
//!
//! - [`generators`] -- Fixed generator constants and the congruential step
//! - [`streams`] -- Seed plans, case seed sequences and the stream set
//! - [`cumrate`] -- Discrete distributions sampled from cumulative rate tables
//! - [`error`] -- Error type shared by the modules above

pub mod cumrate;
pub mod error;
pub mod generators;
pub mod streams;

pub use cumrate::{Cumrate, CumrateDistribution};
pub use error::RandomError;
pub use streams::{CaseSeedSequence, RandomStreams, SeedPlan, StreamRng};
