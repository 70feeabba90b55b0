//! Error Types for the Ingestion Pipeline
//!
//! Each pipeline stage owns one error family:
//!
//! - [`DecodeError`]: the inbound payload could not be turned into a
//!   [`RawMeasurement`](crate::RawMeasurement). The caller logs and drops the
//!   message; live sensor data cannot be re-requested after the fact.
//! - [`FilterError`]: one filter invocation failed. The affected variant is
//!   simply absent from the channel set; scoring of the rest continues.
//! - [`ScoringError`]: one statistic could not be computed. The entry is flagged
//!   in the SQI record and the gate treats it as a reject (fail closed).
//! - [`AssemblyError`]: the accepted measurement violates a shape invariant, or a
//!   stored document cannot be read back.
//!
//! A gate rejection is NOT an error. It is an ordinary
//! [`PipelineOutcome::Rejected`](crate::PipelineOutcome) value.
//!
//! ```rust
//! use ppgguard_core::{decode, DecodeErrorKind};
//!
//! match decode("1700000000;2000") {
//!     Ok(_) => unreachable!(),
//!     Err(e) => assert_eq!(e.kind(), DecodeErrorKind::InsufficientFields),
//! }
//! ```

use thiserror::Error;

use crate::measurement::Channel;

/// Result type for decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type for statistic computation
pub type ScoringResult<T> = Result<T, ScoringError>;

/// Result type for assembling persisted measurements
pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// Result type for a full pipeline run
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for beat-level PPG analysis
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Coarse classification of a decode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    /// A field is present but unparseable or violates a measurement invariant
    MalformedMessage,
    /// The sensor configuration code is not in the lookup table
    UnknownSensorConfig,
    /// Fewer fields than any recognized layout
    InsufficientFields,
}

/// Payload could not be decoded into a measurement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Field present but malformed
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What was wrong with the payload
        reason: String,
    },

    /// Unmapped sensor configuration code
    #[error("Unknown sensor configuration code {code}")]
    UnknownSensorConfig {
        /// The code found in the payload
        code: i64,
    },

    /// Not enough delimited fields
    #[error("Insufficient fields: need at least {required}, found {found}")]
    InsufficientFields {
        /// Fields in the smallest recognized layout
        required: usize,
        /// Fields actually present
        found: usize,
    },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            Self::MalformedMessage { .. } => DecodeErrorKind::MalformedMessage,
            Self::UnknownSensorConfig { .. } => DecodeErrorKind::UnknownSensorConfig,
            Self::InsufficientFields { .. } => DecodeErrorKind::InsufficientFields,
        }
    }
}

/// A single filter invocation failed
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FilterError {
    /// Signal too short for the filter design
    #[error("Insufficient samples: need {required}, have {available}")]
    InsufficientSamples {
        /// Minimum number of samples the filter needs
        required: usize,
        /// Samples actually supplied
        available: usize,
    },

    /// NaN or infinity in the input
    #[error("Input contains non-finite samples")]
    NonFiniteInput,

    /// Band edges unusable for the given sample rate
    #[error("Invalid band [{low_hz}, {high_hz}] Hz for Nyquist {nyquist_hz} Hz")]
    InvalidBand {
        /// Lower cutoff
        low_hz: f64,
        /// Upper cutoff
        high_hz: f64,
        /// Half the sample rate
        nyquist_hz: f64,
    },

    /// Sample rate is zero, negative or not finite
    #[error("Invalid sample rate {rate_hz} Hz")]
    InvalidSampleRate {
        /// The rejected rate
        rate_hz: f64,
    },

    /// Moving-average window of zero
    #[error("Invalid moving-average window {window}")]
    InvalidWindow {
        /// The rejected window size
        window: usize,
    },

    /// Stopband attenuation zero, negative or not finite
    #[error("Invalid stopband attenuation {db} dB")]
    InvalidAttenuation {
        /// The rejected attenuation
        db: f64,
    },

    /// Filter order unsupported by the design routine
    #[error("Unsupported filter order {order}")]
    InvalidOrder {
        /// The rejected order
        order: usize,
    },

    /// Normalization target range inverted or non-finite
    #[error("Invalid normalization range [{min}, {max}]")]
    InvalidRange {
        /// Requested lower bound
        min: f64,
        /// Requested upper bound
        max: f64,
    },
}

/// A distribution statistic could not be computed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoringError {
    /// No samples
    #[error("Cannot score an empty signal")]
    EmptySignal,

    /// NaN or infinity in the input
    #[error("Signal contains non-finite samples")]
    NonFiniteInput,

    /// Zero variance, so skewness and kurtosis are undefined
    #[error("Degenerate distribution: zero variance")]
    DegenerateDistribution,
}

/// Accepted measurement could not be assembled or restored
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// A channel's raw series differs in length from the IR channel
    #[error("Channel {channel} has {found} samples, expected {expected}")]
    ChannelLengthMismatch {
        /// Offending channel
        channel: Channel,
        /// Length of the IR raw series
        expected: usize,
        /// Length actually found
        found: usize,
    },

    /// Sampling rate does not match sample count over duration
    #[error("Sampling rate {given} Hz inconsistent with derived {derived} Hz")]
    InconsistentSamplingRate {
        /// Rate handed to the assembler
        given: f64,
        /// Rate derived from the IR channel length and duration
        derived: f64,
    },

    /// Stored document does not describe a valid measurement
    #[error("Malformed stored record: {reason}")]
    MalformedRecord {
        /// What was wrong
        reason: String,
    },
}

/// Beat-level analysis could not be carried out
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Cleaning filter failed
    #[error("Cleaning failed: {0}")]
    Filter(#[from] FilterError),

    /// Not enough beats for the requested step
    #[error("Too few peaks: need {required}, found {found}")]
    TooFewPeaks {
        /// Peaks the step needs
        required: usize,
        /// Peaks supplied
        found: usize,
    },

    /// Peak index outside the signal or out of order
    #[error("Invalid peak index {index} for signal of {len} samples")]
    InvalidPeak {
        /// Offending index
        index: usize,
        /// Signal length
        len: usize,
    },
}

/// Failure of a full pipeline run
///
/// Rejection by the quality gate is not represented here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Payload could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Accepted measurement violated a shape invariant
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// Storage collaborator failed; no local retry
    #[error("Storage failed: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}
