//! Parallel runner executing every member of a run.
//!
//! This module provides [`run_members`], the top-level async function that
//! simulates all sub-samples of a run:
//!
//! - **One worker per member**: each member runs on a blocking task with
//!   its own [`MemberContext`]; nothing mutable is shared
//! - **Bounded parallelism**: a semaphore caps concurrent members at the
//!   configured thread count
//! - **Deterministic output**: results are collected in member order, and
//!   each member's draws depend only on its own seed plan
//!
//! Within a member the model runs strictly sequentially. The only shared
//! state is the compiled table catalog, built once before any member
//! starts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use microsim_tables::{TableCatalog, TableError, TableKind, TableSet};
use microsim_types::{AccumulatorBlock, MeasureBlock, SimulationMode};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::{ConfigError, RunConfig, RunSection};
use crate::context::MemberContext;
use crate::error::SimulationError;

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The configuration failed validation.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The model's table definitions are inconsistent.
    #[error("table definition error: {source}")]
    Tables {
        /// The underlying table error.
        #[from]
        source: TableError,
    },

    /// A member failed; the run is aborted.
    #[error("member {member} failed: {source}")]
    Member {
        /// Failing member index.
        member: u32,
        /// The underlying simulation error.
        #[source]
        source: SimulationError,
    },

    /// A member's worker task panicked or was cancelled.
    #[error("member {member} worker did not complete: {reason}")]
    Worker {
        /// Member index.
        member: u32,
        /// Join failure description.
        reason: String,
    },

    /// The concurrency limiter was closed.
    #[error("scheduling failed: {reason}")]
    Scheduling {
        /// Description of the failure.
        reason: String,
    },
}

/// A simulation model: table definitions plus the event logic that drives
/// entities through one case or one time span.
pub trait Model: Send + Sync + 'static {
    /// Model name for logs and output.
    fn name(&self) -> &str;

    /// Fresh table definitions; table ids must equal positions.
    ///
    /// Called once to compile the shared catalog and once per member.
    fn tables(&self) -> Result<Vec<TableKind>, TableError>;

    /// Simulate one case of a case-based run. The case's seed is already
    /// in effect on every stream.
    fn simulate_case(&self, ctx: &mut MemberContext) -> Result<(), SimulationError>;

    /// Simulate a time-based member up to `end_time`.
    fn simulate_time(&self, ctx: &mut MemberContext, end_time: f64) -> Result<(), SimulationError>;
}

/// Output of one member.
#[derive(Debug, Clone, Serialize)]
pub struct MemberResult {
    /// Member index.
    pub member: u32,
    /// Cases simulated (0 for time-based runs).
    pub cases: u64,
    /// Events processed.
    pub events: u64,
    /// Final measure columns of every table.
    pub measures: Vec<MeasureBlock>,
    /// Final accumulator columns of every accumulating table.
    pub accumulators: Vec<AccumulatorBlock>,
    /// Encoded microdata rows, in hand-off order.
    #[serde(skip)]
    pub microdata: Vec<Vec<u8>>,
}

/// Output of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run name.
    pub name: String,
    /// Model name.
    pub model: String,
    /// Case-based or time-based.
    pub mode: SimulationMode,
    /// Starting seed.
    pub starting_seed: u32,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the last member finished.
    pub finished_at: DateTime<Utc>,
    /// Member results in member order.
    pub members: Vec<MemberResult>,
}

impl RunSummary {
    /// Cases simulated across all members.
    pub fn total_cases(&self) -> u64 {
        self.members.iter().map(|m| m.cases).fold(0, u64::saturating_add)
    }

    /// Events processed across all members.
    pub fn total_events(&self) -> u64 {
        self.members.iter().map(|m| m.events).fold(0, u64::saturating_add)
    }

    /// Wall-clock milliseconds from start to finish.
    pub fn elapsed_ms(&self) -> i64 {
        self.finished_at.signed_duration_since(self.started_at).num_milliseconds()
    }
}

/// Simulate one member to completion on the current thread.
///
/// # Errors
///
/// Returns the first error raised by the model or the tables.
pub fn run_member<M: Model + ?Sized>(
    model: &M,
    run: &RunSection,
    member: u32,
    catalog: Arc<TableCatalog>,
) -> Result<MemberResult, SimulationError> {
    let tables = TableSet::with_catalog(model.tables()?, catalog)?;
    let mut ctx = MemberContext::new(run, member, tables)?;
    ctx.tables_mut().initialize();

    let cases = match run.mode {
        SimulationMode::CaseBased => {
            let cases = run.cases_for_member(member);
            for _ in 0..cases {
                ctx.start_case()?;
                model.simulate_case(&mut ctx)?;
            }
            cases
        }
        SimulationMode::TimeBased => {
            model.simulate_time(&mut ctx, run.end_time)?;
            0
        }
    };
    let events = ctx.event_counter();

    let (mut tables, microdata) = ctx.into_parts();
    tables.finish(run.population_scaling)?;
    info!(member, cases, events, rows = microdata.len(), "Member finished");

    Ok(MemberResult {
        member,
        cases,
        events,
        measures: tables.measure_blocks(),
        accumulators: tables.accumulator_blocks(),
        microdata,
    })
}

/// Run every member of the configured run in parallel.
///
/// # Errors
///
/// Returns [`RunnerError::Config`] for an invalid configuration,
/// [`RunnerError::Tables`] for inconsistent table definitions, or the
/// first member failure in member order.
pub async fn run_members<M: Model>(model: Arc<M>, config: &RunConfig) -> Result<RunSummary, RunnerError> {
    config.validate()?;
    let run = Arc::new(config.run.clone());
    let started_at = Utc::now();

    let definitions = model.tables()?;
    let catalog = Arc::new(TableCatalog::compile(definitions.iter().map(TableKind::table))?);
    let threads = run.worker_threads();
    let semaphore = Arc::new(Semaphore::new(threads));

    info!(
        run = %run.name,
        model = model.name(),
        mode = ?run.mode,
        sub_samples = run.sub_samples,
        threads,
        starting_seed = run.starting_seed,
        "Run starting"
    );

    let mut handles = Vec::new();
    for member in 0..run.sub_samples {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|err| RunnerError::Scheduling {
                reason: err.to_string(),
            })?;
        let model = Arc::clone(&model);
        let run = Arc::clone(&run);
        let catalog = Arc::clone(&catalog);
        let handle = tokio::task::spawn_blocking(move || {
            let result = run_member(model.as_ref(), &run, member, catalog);
            drop(permit);
            result
        });
        handles.push((member, handle));
    }

    let mut members = Vec::with_capacity(handles.len());
    for (member, handle) in handles {
        let result = handle.await.map_err(|err| RunnerError::Worker {
            member,
            reason: err.to_string(),
        })?;
        match result {
            Ok(output) => members.push(output),
            Err(source) => {
                warn!(member, error = %source, "Member failed, aborting run");
                return Err(RunnerError::Member { member, source });
            }
        }
    }

    let summary = RunSummary {
        name: run.name.clone(),
        model: model.name().to_owned(),
        mode: run.mode,
        starting_seed: run.starting_seed,
        started_at,
        finished_at: Utc::now(),
        members,
    };
    info!(
        cases = summary.total_cases(),
        events = summary.total_events(),
        elapsed_ms = summary.elapsed_ms(),
        "Run complete"
    );
    Ok(summary)
}
