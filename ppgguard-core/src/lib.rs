//! Core ingestion pipeline for PPGGuard
//!
//! Turns a raw photoplethysmography (PPG) payload pushed by a sensor device into
//! either a persisted, quality-scored measurement or a logged rejection.
//!
//! ```text
//! payload ─► decoder ─► filters (per channel, per method) ─► sqi ─► gate
//!                                                                   │
//!                                        reject: log and drop ◄─────┤
//!                                        accept: assembler ─► MeasurementStore
//! ```
//!
//! Every stage is a pure function of its inputs. The only shared mutable state is
//! the storage collaborator's per-configuration sequence counter, which lives behind
//! the [`MeasurementStore`] trait.
//!
//! ```no_run
//! use ppgguard_core::{decode, Pipeline, PipelineConfig};
//!
//! let measurement = decode("1700000000;2000;[1,2,3,4];[5,6,7,8]")?;
//! assert_eq!(measurement.sampling_rate(), 2.0);
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let evaluation = pipeline.evaluate(&measurement);
//! println!("accepted: {}", evaluation.decision.is_accept());
//! # Ok::<(), ppgguard_core::DecodeError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod logging;

pub mod analysis;
pub mod assembler;
pub mod constants;
pub mod decoder;
pub mod errors;
pub mod filters;
pub mod gate;
pub mod measurement;
pub mod pipeline;
pub mod sqi;
pub mod time;
pub mod traits;

// Public API
pub use assembler::{assemble, AcceptedMeasurement};
pub use decoder::{decode, MessageDecoder};
pub use errors::{
    AssemblyError, AssemblyResult, DecodeError, DecodeErrorKind, DecodeResult, FilterError,
    FilterResult, PipelineError, PipelineResult, ScoringError, ScoringResult,
};
pub use filters::{BandSpec, FilterBank, FilterBankConfig, FilterVariant, FilteredChannelSet};
pub use gate::{GateDecision, GatePolicy, QualityGate, RejectReason};
pub use measurement::{Channel, RawMeasurement, SensorConfig};
pub use pipeline::{Evaluation, Pipeline, PipelineConfig, PipelineOutcome};
pub use sqi::{DistributionShape, QualityScorer, SqiKey, SqiRecord, Statistic};
pub use traits::{MeasureId, MeasurementStore, PpgAnalysis};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
