//! Configuration loading and typed config structures for a simulation run.
//!
//! The canonical configuration lives in `microsim-config.yaml`. Every field
//! has a default, so an empty document is a valid (single member,
//! case-based) run. A handful of run parameters can be overridden from the
//! environment, which is how batch scripts sweep seeds and sample sizes
//! without editing the file.

use std::path::Path;

use microsim_random::generators::{DEFAULT_STREAM_COUNT, is_valid_seed};
use microsim_types::SimulationMode;
use microsim_types::ids::MAX_MEMBERS;
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidOverride {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// A value is out of its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Environment variable overriding `run.starting_seed`.
pub const ENV_STARTING_SEED: &str = "MICROSIM_STARTING_SEED";
/// Environment variable overriding `run.sub_samples`.
pub const ENV_SUB_SAMPLES: &str = "MICROSIM_SUB_SAMPLES";
/// Environment variable overriding `run.cases`.
pub const ENV_CASES: &str = "MICROSIM_CASES";

/// Top-level run configuration.
///
/// Mirrors the structure of `microsim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run parameters (seeding, sample size, parallelism).
    #[serde(default)]
    pub run: RunSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RunConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for a malformed override.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for a malformed override.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.run.apply_env_overrides()?;
        Ok(config)
    }

    /// Check every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run.validate()
    }
}

/// Run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// Human-readable run name.
    #[serde(default = "default_run_name")]
    pub name: String,

    /// Case-based or time-based simulation.
    #[serde(default)]
    pub mode: SimulationMode,

    /// Run-level starting seed, in `1..2^31-1`.
    #[serde(default = "default_starting_seed")]
    pub starting_seed: u32,

    /// Number of independently seeded members (sub-samples).
    #[serde(default = "default_sub_samples")]
    pub sub_samples: u32,

    /// Total cases of a case-based run, split across members.
    #[serde(default = "default_cases")]
    pub cases: u64,

    /// Simulated end time of a time-based run.
    #[serde(default = "default_end_time")]
    pub end_time: f64,

    /// Random streams per member.
    #[serde(default = "default_streams")]
    pub streams: usize,

    /// Worker threads; 0 means one per member.
    #[serde(default)]
    pub threads: usize,

    /// Factor applied to additive accumulators at the end of the run.
    #[serde(default = "default_population_scaling")]
    pub population_scaling: f64,
}

impl RunSection {
    /// Override run parameters with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if a set variable does not
    /// parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override run parameters from `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if a present value does not
    /// parse.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(seed) = parse_override(&lookup, ENV_STARTING_SEED)? {
            self.starting_seed = seed;
        }
        if let Some(sub_samples) = parse_override(&lookup, ENV_SUB_SAMPLES)? {
            self.sub_samples = sub_samples;
        }
        if let Some(cases) = parse_override(&lookup, ENV_CASES)? {
            self.cases = cases;
        }
        Ok(())
    }

    /// Check every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_seed(self.starting_seed) {
            return Err(invalid(format!(
                "starting_seed {} must lie in 1..2147483647",
                self.starting_seed
            )));
        }
        if self.sub_samples == 0 || self.sub_samples > MAX_MEMBERS {
            return Err(invalid(format!(
                "sub_samples {} must lie in 1..={MAX_MEMBERS}",
                self.sub_samples
            )));
        }
        if self.streams == 0 {
            return Err(invalid("streams must be at least 1".to_owned()));
        }
        if !self.population_scaling.is_finite() || self.population_scaling <= 0.0 {
            return Err(invalid(format!(
                "population_scaling {} must be finite and positive",
                self.population_scaling
            )));
        }
        match self.mode {
            SimulationMode::CaseBased if self.cases == 0 => {
                Err(invalid("a case-based run needs at least one case".to_owned()))
            }
            SimulationMode::TimeBased if !self.end_time.is_finite() || self.end_time <= 0.0 => Err(invalid(
                format!("end_time {} must be finite and positive", self.end_time),
            )),
            _ => Ok(()),
        }
    }

    /// Cases simulated by `member`: an even split, with the remainder going
    /// to the lowest-numbered members.
    pub fn cases_for_member(&self, member: u32) -> u64 {
        let members = u64::from(self.sub_samples.max(1));
        let base = self.cases.checked_div(members).unwrap_or(0);
        let remainder = self.cases.checked_rem(members).unwrap_or(0);
        if u64::from(member) < remainder {
            base.saturating_add(1)
        } else {
            base
        }
    }

    /// Number of members allowed to run at once.
    pub fn worker_threads(&self) -> usize {
        let members = usize::try_from(self.sub_samples).unwrap_or(usize::MAX);
        if self.threads == 0 {
            members.max(1)
        } else {
            self.threads.min(members).max(1)
        }
    }
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            name: default_run_name(),
            mode: SimulationMode::default(),
            starting_seed: default_starting_seed(),
            sub_samples: default_sub_samples(),
            cases: default_cases(),
            end_time: default_end_time(),
            streams: default_streams(),
            threads: 0,
            population_scaling: default_population_scaling(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .ok()
                .ok_or(ConfigError::InvalidOverride { name, value })
        })
        .transpose()
}

const fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

fn default_run_name() -> String {
    "microsim".to_owned()
}

const fn default_starting_seed() -> u32 {
    16_807
}

const fn default_sub_samples() -> u32 {
    1
}

const fn default_cases() -> u64 {
    1_000
}

const fn default_end_time() -> f64 {
    100.0
}

const fn default_streams() -> usize {
    DEFAULT_STREAM_COUNT
}

const fn default_population_scaling() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_owned()
}
