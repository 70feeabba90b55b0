//! Storage collaborator interface
//!
//! Records are grouped by [`SensorConfig`] and numbered densely within each
//! group: `measure_1`, `measure_2`, ... Deleting a record renumbers the ones
//! after it so the sequence stays `1..=N`.
//!
//! Implementations must make "next number, then append" atomic; two
//! concurrent appends to the same group must never receive the same id.

use core::fmt;
use core::str::FromStr;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::assembler::AcceptedMeasurement;
use crate::measurement::SensorConfig;

/// Prefix of the persisted record key
pub const MEASURE_ID_PREFIX: &str = "measure_";

/// Position of a record within its configuration group, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeasureId(u32);

impl MeasureId {
    /// Id for ordinal `n`; `None` for 0
    pub const fn new(n: u32) -> Option<Self> {
        if n == 0 {
            None
        } else {
            Some(Self(n))
        }
    }

    /// Id of the first record in a group
    pub const FIRST: MeasureId = MeasureId(1);

    /// Ordinal, starting at 1
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Zero-based position
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    /// Id of the record at zero-based `index`
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok()?.checked_add(1).and_then(Self::new)
    }
}

impl fmt::Display for MeasureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MEASURE_ID_PREFIX}{}", self.0)
    }
}

/// Error parsing a `measure_N` key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid measure id '{0}'")]
pub struct ParseMeasureIdError(String);

impl FromStr for MeasureId {
    type Err = ParseMeasureIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(MEASURE_ID_PREFIX)
            .and_then(|n| n.parse::<u32>().ok())
            .and_then(Self::new)
            .ok_or_else(|| ParseMeasureIdError(s.to_string()))
    }
}

impl Serialize for MeasureId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MeasureId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(de::Error::custom)
    }
}

/// Persistence for accepted measurements
///
/// Methods take `&self`; implementations synchronize internally so a store
/// can be shared between concurrent pipeline runs.
pub trait MeasurementStore {
    /// Backend failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append to the group and return the id it was assigned
    fn append(
        &self,
        config: SensorConfig,
        measurement: AcceptedMeasurement,
    ) -> Result<MeasureId, Self::Error>;

    /// Every record of one group, by id
    fn load_all(
        &self,
        config: SensorConfig,
    ) -> Result<BTreeMap<MeasureId, AcceptedMeasurement>, Self::Error>;

    /// Remove one record and renumber the rest of its group
    fn delete(&self, config: SensorConfig, id: MeasureId) -> Result<(), Self::Error>;

    /// Groups holding at least one record
    fn configs(&self) -> Result<Vec<SensorConfig>, Self::Error>;

    /// Number of records in a group
    fn count(&self, config: SensorConfig) -> Result<usize, Self::Error> {
        self.load_all(config).map(|all| all.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let id = MeasureId::new(12).unwrap();
        assert_eq!(id.to_string(), "measure_12");
        assert_eq!("measure_12".parse::<MeasureId>(), Ok(id));
        assert!("measure_0".parse::<MeasureId>().is_err());
        assert!("entry_3".parse::<MeasureId>().is_err());
        assert!("measure_x".parse::<MeasureId>().is_err());
    }

    #[test]
    fn numeric_ordering() {
        let nine = MeasureId::new(9).unwrap();
        let ten = MeasureId::new(10).unwrap();
        assert!(nine < ten);
    }

    #[test]
    fn index_conversion() {
        assert_eq!(MeasureId::from_index(0), Some(MeasureId::FIRST));
        assert_eq!(MeasureId::new(3).unwrap().index(), 2);
    }

    #[test]
    fn serde_as_string_key() {
        let mut map = BTreeMap::new();
        map.insert(MeasureId::new(2).unwrap(), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"measure_2":1}"#);
        let back: BTreeMap<MeasureId, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
