//! Run orchestration for the microsimulation runtime.
//!
//! This crate turns a validated [`RunConfig`] and a [`Model`] into a
//! finished run: one [`MemberContext`] per sub-sample, simulated in
//! parallel, each with its own clock, random streams and tables.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `microsim-config.yaml` into
//!   strongly-typed structs, with environment overrides.
//! - [`clock`] -- Simulated time and the global event counter.
//! - [`context`] -- Per-member state passed through every entity hook,
//!   with checkpoint and restore.
//! - [`runner`] -- The [`Model`] trait and the parallel member runner.
//! - [`error`] -- [`SimulationError`], the error type of model hooks.
//!
//! [`Model`]: runner::Model
//! [`RunConfig`]: config::RunConfig
//! [`MemberContext`]: context::MemberContext
//! [`SimulationError`]: error::SimulationError

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod runner;
