//! Storage collaborators for PPGGuard
//!
//! Two implementations of [`MeasurementStore`]:
//!
//! - [`InMemoryStore`]: process-local, for tests and short sessions
//! - [`JsonFileStore`]: one JSON document on disk, grouped by sensor
//!   configuration name
//!
//! Both honour the numbering contract: ids are `measure_1..=measure_N` within a
//! configuration group and deleting a record renumbers the ones after it.
//!
//! ```rust
//! use ppgguard_core::{MeasurementStore, SensorConfig};
//! use ppgguard_store::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! assert_eq!(store.count(SensorConfig::Default)?, 0);
//! # Ok::<(), ppgguard_store::StoreError>(())
//! ```
//!
//! [`MeasurementStore`]: ppgguard_core::MeasurementStore

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::InMemoryStore;

use std::collections::BTreeMap;
use std::path::PathBuf;

use ppgguard_core::{AcceptedMeasurement, MeasureId, SensorConfig};
use thiserror::Error;

/// Storage failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No record with this id in the group
    #[error("No {id} under '{config}'")]
    NotFound {
        /// Group searched
        config: SensorConfig,
        /// Missing id
        id: MeasureId,
    },

    /// Group grew past the id space
    #[error("Group '{0}' is full")]
    GroupFull(SensorConfig),

    /// A writer panicked while holding the lock
    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Records of every group, each in id order
pub(crate) type Groups = BTreeMap<SensorConfig, Vec<AcceptedMeasurement>>;

/// Append to a group, returning the new record's id
pub(crate) fn push(
    groups: &mut Groups,
    config: SensorConfig,
    measurement: AcceptedMeasurement,
) -> StoreResult<MeasureId> {
    let group = groups.entry(config).or_default();
    let id = MeasureId::from_index(group.len()).ok_or(StoreError::GroupFull(config))?;
    group.push(measurement);
    Ok(id)
}

/// Remove a record; later records shift down one id
pub(crate) fn remove(
    groups: &mut Groups,
    config: SensorConfig,
    id: MeasureId,
) -> StoreResult<AcceptedMeasurement> {
    let group = groups
        .get_mut(&config)
        .filter(|g| id.index() < g.len())
        .ok_or(StoreError::NotFound { config, id })?;
    let removed = group.remove(id.index());
    if group.is_empty() {
        groups.remove(&config);
    }
    Ok(removed)
}

/// A group keyed by id
pub(crate) fn numbered(records: &[AcceptedMeasurement]) -> BTreeMap<MeasureId, AcceptedMeasurement> {
    records
        .iter()
        .enumerate()
        .filter_map(|(i, m)| MeasureId::from_index(i).map(|id| (id, m.clone())))
        .collect()
}

/// Groups holding at least one record
pub(crate) fn populated(groups: &Groups) -> Vec<SensorConfig> {
    groups
        .iter()
        .filter(|(_, records)| !records.is_empty())
        .map(|(config, _)| *config)
        .collect()
}
