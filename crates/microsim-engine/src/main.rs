//! Engine binary for the microsimulation runtime.
//!
//! Runs the lifecourse model over every configured member and prints the
//! run summary as JSON on stdout.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first argument, `MICROSIM_CONFIG`, or
//!    `microsim-config.yaml`; defaults when no file exists)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the configuration
//! 4. Build the model and run every member
//! 5. Print the summary, and write microdata rows as CSV when
//!    `MICROSIM_MICRODATA` names a file

mod calendar;
mod error;
mod model;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use microsim_core::config::RunConfig;
use microsim_core::runner::{RunSummary, run_members};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::model::{Lifecourse, person_layout};

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "microsim-config.yaml";
/// Environment variable naming the configuration file.
const ENV_CONFIG: &str = "MICROSIM_CONFIG";
/// Environment variable naming the microdata CSV output file.
const ENV_MICRODATA: &str = "MICROSIM_MICRODATA";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the run or output fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so where it came from
    //    is reported after the subscriber starts.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("microsim-engine starting");
    match &source {
        Some(path) => info!(path = %path.display(), "Configuration file read"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Validate.
    config.validate().map_err(EngineError::from)?;
    info!(
        run = %config.run.name,
        mode = ?config.run.mode,
        starting_seed = config.run.starting_seed,
        sub_samples = config.run.sub_samples,
        cases = config.run.cases,
        end_time = config.run.end_time,
        "Configuration loaded"
    );

    // 4. Run.
    let summary = execute(&config).await?;

    // 5. Output.
    let json = serde_json::to_string_pretty(&summary)?;
    println!("{json}");
    if let Ok(path) = std::env::var(ENV_MICRODATA) {
        write_microdata(Path::new(&path), &summary)?;
    }

    info!(
        members = summary.members.len(),
        cases = summary.total_cases(),
        events = summary.total_events(),
        elapsed_ms = summary.elapsed_ms(),
        "microsim-engine finished"
    );
    Ok(())
}

/// Load the run configuration.
///
/// Returns the configuration and the file it was read from, or `None`
/// when no file exists and defaults (plus environment overrides) apply.
fn load_config() -> Result<(RunConfig, Option<PathBuf>), EngineError> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(ENV_CONFIG).ok())
        .map_or_else(|| PathBuf::from(CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = RunConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let config = RunConfig::parse("{}")?;
        Ok((config, None))
    }
}

/// Build the model and simulate every member.
async fn execute(config: &RunConfig) -> Result<RunSummary, EngineError> {
    let model = Arc::new(Lifecourse::new()?);
    run_members(model, config).await.map_err(EngineError::from)
}

/// Write every member's microdata rows to `path` as CSV, member first.
fn write_microdata(path: &Path, summary: &RunSummary) -> Result<(), EngineError> {
    let layout = person_layout();
    let mut out = format!("member,{}\n", layout.header(","));
    let mut rows: usize = 0;
    for member in &summary.members {
        for row in &member.microdata {
            let line = layout.format_row(row, ",")?;
            writeln!(out, "{},{line}", member.member).map_err(|err| EngineError::Output {
                message: err.to_string(),
            })?;
            rows = rows.saturating_add(1);
        }
    }
    std::fs::write(path, out).map_err(|err| EngineError::Output {
        message: format!("failed to write {}: {err}", path.display()),
    })?;
    info!(path = %path.display(), rows, "Microdata written");
    Ok(())
}
