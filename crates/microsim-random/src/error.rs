//! Error types for stream seeding, stream state and distributions.

/// Errors raised by the random stream subsystem.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RandomError {
    /// A seed fell outside the open range `1..2^31-1`.
    #[error("seed {seed} is outside 1..{modulus}")]
    SeedOutOfRange {
        /// The offending seed.
        seed: u64,
        /// The generator modulus.
        modulus: u32,
    },

    /// A stream index beyond the configured stream count was requested.
    #[error("stream {stream} requested but only {count} streams exist")]
    UnknownStream {
        /// Requested stream index.
        stream: usize,
        /// Number of streams in the set.
        count: usize,
    },

    /// A stream set with zero streams was requested.
    #[error("a stream set needs at least one stream")]
    NoStreams,

    /// Stream state text or record could not be restored.
    #[error("malformed stream state: {reason}")]
    MalformedState {
        /// What was wrong with the state.
        reason: String,
    },

    /// A distribution was built from an empty frequency list.
    #[error("a distribution needs at least one outcome")]
    EmptyDistribution,

    /// A frequency was negative or not a number.
    #[error("frequency {value} at outcome {index} is not a finite non-negative number")]
    InvalidFrequency {
        /// Outcome index of the offending frequency.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// A batch frequency table did not have `distributions * outcomes` entries.
    #[error("expected {expected} frequencies, got {actual}")]
    ShapeMismatch {
        /// Required number of entries.
        expected: usize,
        /// Supplied number of entries.
        actual: usize,
    },

    /// A distribution index beyond the batch size was requested.
    #[error("distribution {index} requested but only {count} exist")]
    UnknownDistribution {
        /// Requested distribution index.
        index: usize,
        /// Number of distributions in the batch.
        count: usize,
    },
}
