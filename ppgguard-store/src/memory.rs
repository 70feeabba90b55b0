//! Process-local store

use std::collections::BTreeMap;
use std::sync::RwLock;

use ppgguard_core::{AcceptedMeasurement, MeasureId, MeasurementStore, SensorConfig};

use crate::{numbered, populated, push, remove, Groups, StoreError, StoreResult};

/// Store backed by a map behind an `RwLock`
///
/// Appends take the write lock, so numbering is atomic across threads.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    groups: RwLock<Groups>,
}

impl InMemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across every group
    pub fn len(&self) -> StoreResult<usize> {
        let groups = self.groups.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(groups.values().map(Vec::len).sum())
    }

    /// No records at all
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }
}

impl MeasurementStore for InMemoryStore {
    type Error = StoreError;

    fn append(
        &self,
        config: SensorConfig,
        measurement: AcceptedMeasurement,
    ) -> StoreResult<MeasureId> {
        let mut groups = self.groups.write().map_err(|_| StoreError::LockPoisoned)?;
        push(&mut groups, config, measurement)
    }

    fn load_all(
        &self,
        config: SensorConfig,
    ) -> StoreResult<BTreeMap<MeasureId, AcceptedMeasurement>> {
        let groups = self.groups.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(groups.get(&config).map(|g| numbered(g)).unwrap_or_default())
    }

    fn delete(&self, config: SensorConfig, id: MeasureId) -> StoreResult<()> {
        let mut groups = self.groups.write().map_err(|_| StoreError::LockPoisoned)?;
        remove(&mut groups, config, id).map(|_| ())
    }

    fn configs(&self) -> StoreResult<Vec<SensorConfig>> {
        let groups = self.groups.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(populated(&groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppgguard_core::{assemble, FilteredChannelSet, SqiRecord};
    use ppgguard_core::time::CaptureTime;
    use std::sync::Arc;

    fn measurement(first: f64) -> AcceptedMeasurement {
        assemble(
            SensorConfig::Default,
            CaptureTime::from_epoch_seconds(1_700_000_000),
            2000,
            2.0,
            None,
            FilteredChannelSet::from_raw(vec![first, -6.0, -7.0, -8.0]),
            SqiRecord::new(),
        )
        .unwrap()
    }

    fn first_sample(m: &AcceptedMeasurement) -> f64 {
        m.channel(ppgguard_core::Channel::Ir).unwrap().raw[0]
    }

    #[test]
    fn numbering_is_per_group() {
        let store = InMemoryStore::new();
        let a = store.append(SensorConfig::Default, measurement(-1.0)).unwrap();
        let b = store.append(SensorConfig::Hz800Avg4, measurement(-2.0)).unwrap();
        let c = store.append(SensorConfig::Default, measurement(-3.0)).unwrap();
        assert_eq!((a.get(), b.get(), c.get()), (1, 1, 2));
        assert_eq!(
            store.configs().unwrap(),
            vec![SensorConfig::Default, SensorConfig::Hz800Avg4]
        );
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn delete_renumbers_densely() {
        let store = InMemoryStore::new();
        for v in [-1.0, -2.0, -3.0] {
            store.append(SensorConfig::Default, measurement(v)).unwrap();
        }
        store
            .delete(SensorConfig::Default, MeasureId::new(2).unwrap())
            .unwrap();

        let all = store.load_all(SensorConfig::Default).unwrap();
        let ids: Vec<String> = all.keys().map(|id| id.to_string()).collect();
        assert_eq!(ids, ["measure_1", "measure_2"]);
        assert_eq!(first_sample(&all[&MeasureId::new(2).unwrap()]), -3.0);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = InMemoryStore::new();
        store.append(SensorConfig::Default, measurement(-1.0)).unwrap();
        let err = store
            .delete(SensorConfig::Default, MeasureId::new(5).unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        let err = store
            .delete(SensorConfig::Hz1600Avg8, MeasureId::FIRST)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn emptied_group_disappears() {
        let store = InMemoryStore::new();
        store.append(SensorConfig::Hz1000Avg8, measurement(-1.0)).unwrap();
        store.delete(SensorConfig::Hz1000Avg8, MeasureId::FIRST).unwrap();
        assert!(store.configs().unwrap().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn concurrent_appends_get_distinct_ids() {
        let store = Arc::new(InMemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..10)
                        .map(|j| {
                            store
                                .append(SensorConfig::Default, measurement(-((i * 10 + j) as f64)))
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(|id| id.get())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=80).collect::<Vec<_>>());
    }
}
