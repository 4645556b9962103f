//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup, the run itself and output.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: microsim_core::config::ConfigError,
    },

    /// Model distributions could not be built.
    #[error("model error: {source}")]
    Model {
        /// The underlying random error.
        #[from]
        source: microsim_random::RandomError,
    },

    /// The run failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: microsim_core::runner::RunnerError,
    },

    /// A microdata row could not be decoded.
    #[error("microdata error: {source}")]
    Microdata {
        /// The underlying entity error.
        #[from]
        source: microsim_entity::EntityError,
    },

    /// Writing output failed.
    #[error("output error: {message}")]
    Output {
        /// Description of the output failure.
        message: String,
    },
}
