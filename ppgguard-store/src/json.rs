//! JSON document store
//!
//! The whole store is one JSON object on disk:
//!
//! ```json
//! {
//!   "Default": {
//!     "measure_1": { "sensorConfig": "Default", "timestamp": "...", "signals": {...}, "sqi": {...} },
//!     "measure_2": { ... }
//!   },
//!   "800 Hz - 4 samples": { "measure_1": { ... } }
//! }
//! ```
//!
//! The document is held in memory behind a mutex and rewritten after every
//! change. Writes go to a sibling temporary file that is then renamed over the
//! original, so a crash mid-write leaves the previous document intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ppgguard_core::{AcceptedMeasurement, MeasureId, MeasurementStore, SensorConfig};

use crate::{numbered, populated, push, remove, Groups, StoreError, StoreResult};

type Document = BTreeMap<SensorConfig, BTreeMap<MeasureId, AcceptedMeasurement>>;

/// Store persisted as a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    groups: Mutex<Groups>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let groups = load(&path)?;
        log::debug!(
            "Opened {} with {} record(s)",
            path.display(),
            groups.values().map(Vec::len).sum::<usize>()
        );
        Ok(Self {
            path,
            groups: Mutex::new(groups),
        })
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, groups: &Groups) -> StoreResult<()> {
        let document: Document = groups
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(config, records)| (*config, numbered(records)))
            .collect();
        let bytes = serde_json::to_vec_pretty(&document)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn load(path: &Path) -> StoreResult<Groups> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Groups::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if text.trim().is_empty() {
        return Ok(Groups::new());
    }

    let document: Document = serde_json::from_str(&text)?;
    let mut groups = Groups::new();
    for (config, records) in document {
        let dense = records
            .keys()
            .enumerate()
            .all(|(i, id)| id.index() == i);
        if !dense {
            log::warn!("Group '{}' in {} has gaps, renumbering", config, path.display());
        }
        groups.insert(config, records.into_values().collect());
    }
    Ok(groups)
}

impl MeasurementStore for JsonFileStore {
    type Error = StoreError;

    fn append(
        &self,
        config: SensorConfig,
        measurement: AcceptedMeasurement,
    ) -> StoreResult<MeasureId> {
        let mut groups = self.groups.lock().map_err(|_| StoreError::LockPoisoned)?;
        let id = push(&mut groups, config, measurement)?;
        if let Err(e) = self.persist(&groups) {
            if let Some(group) = groups.get_mut(&config) {
                group.pop();
                if group.is_empty() {
                    groups.remove(&config);
                }
            }
            return Err(e);
        }
        Ok(id)
    }

    fn load_all(
        &self,
        config: SensorConfig,
    ) -> StoreResult<BTreeMap<MeasureId, AcceptedMeasurement>> {
        let groups = self.groups.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(groups.get(&config).map(|g| numbered(g)).unwrap_or_default())
    }

    fn delete(&self, config: SensorConfig, id: MeasureId) -> StoreResult<()> {
        let mut groups = self.groups.lock().map_err(|_| StoreError::LockPoisoned)?;
        let removed = remove(&mut groups, config, id)?;
        if let Err(e) = self.persist(&groups) {
            groups.entry(config).or_default().insert(id.index(), removed);
            return Err(e);
        }
        log::info!("Deleted {} from '{}'", id, config);
        Ok(())
    }

    fn configs(&self) -> StoreResult<Vec<SensorConfig>> {
        let groups = self.groups.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(populated(&groups))
    }
}
