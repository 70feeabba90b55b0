//! Collaborator seams
//!
//! The pipeline itself performs no I/O. Persistence and PPG-specific beat
//! analysis are reached through these traits:
//!
//! - [`store`]: append, load, delete accepted measurements per configuration
//! - [`analysis`]: clean, find peaks, segment beats, score beat quality

pub mod analysis;
pub mod store;

pub use analysis::PpgAnalysis;
pub use store::{MeasureId, MeasurementStore};
