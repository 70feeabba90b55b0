//! Capture time handling
//!
//! The device stamps each measurement with Unix epoch seconds. Persisted records
//! keep that value and a human-readable rendering for the review UI.

use chrono::DateTime;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch
pub type Timestamp = i64;

/// Rendering used by persisted records: `dd/mm/YYYY HH:MM:SS`
pub const CAPTURE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Instant a measurement was captured on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureTime(Timestamp);

impl CaptureTime {
    /// Wrap epoch seconds
    pub const fn from_epoch_seconds(seconds: Timestamp) -> Self {
        Self(seconds)
    }

    /// Epoch seconds
    pub const fn epoch_seconds(&self) -> Timestamp {
        self.0
    }

    /// UTC rendering in [`CAPTURE_TIME_FORMAT`]
    ///
    /// Falls back to the raw seconds when the value is outside chrono's range.
    pub fn formatted(&self) -> String {
        match DateTime::from_timestamp(self.0, 0) {
            Some(dt) => dt.format(CAPTURE_TIME_FORMAT).to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Display for CaptureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}
