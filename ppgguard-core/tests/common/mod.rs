//! Shared fixtures for integration tests
//!
//! - synthetic PPG generators (clean pulse, spike artifacts)
//! - payload builder in the device wire format
//! - a minimal in-process [`MeasurementStore`]

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Mutex;

use ppgguard_core::{AcceptedMeasurement, MeasureId, MeasurementStore, SensorConfig};

/// Capture start used by every fixture (2023-11-14 22:13:20 UTC)
pub const CAPTURED_AT: i64 = 1_700_000_000;

/// Ten seconds at 100 Hz
pub const SAMPLES: usize = 1000;
pub const DURATION_MS: u32 = 10_000;

/// Pulse wave as the photodiode reports it: large DC level, 1.2 Hz
/// fundamental and a weaker first harmonic
pub fn pulse(n: usize, rate_hz: f64, baseline: f64, amplitude: f64) -> Vec<i64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / rate_hz;
            let v = baseline
                + amplitude * (2.0 * PI * 1.2 * t).sin()
                + 0.1875 * amplitude * (2.0 * PI * 2.4 * t + 0.3).sin();
            v.round() as i64
        })
        .collect()
}

/// Flat baseline with a motion-artifact spike every `period` samples
pub fn spike_train(n: usize, baseline: i64, spike: i64, period: usize) -> Vec<i64> {
    (0..n)
        .map(|i| {
            if i % period == period / 2 {
                baseline + spike
            } else {
                baseline
            }
        })
        .collect()
}

pub fn clean_red() -> Vec<i64> {
    pulse(SAMPLES, 100.0, 42_000.0, 500.0)
}

pub fn clean_ir() -> Vec<i64> {
    pulse(SAMPLES, 100.0, 50_000.0, 800.0)
}

pub fn artifact_ir() -> Vec<i64> {
    spike_train(SAMPLES, 50_000, 20_000, 500)
}

/// Payload in the device format; samples are written as positive counts and
/// `red` may be empty for IR-only captures
pub struct PayloadBuilder {
    config: Option<u8>,
    captured_at: i64,
    duration_ms: u32,
    red: Option<Vec<i64>>,
    ir: Vec<i64>,
}

impl PayloadBuilder {
    pub fn new(ir: Vec<i64>) -> Self {
        Self {
            config: None,
            captured_at: CAPTURED_AT,
            duration_ms: DURATION_MS,
            red: None,
            ir,
        }
    }

    pub fn red(mut self, red: Vec<i64>) -> Self {
        self.red = Some(red);
        self
    }

    pub fn config(mut self, code: u8) -> Self {
        self.config = Some(code);
        self
    }

    pub fn duration_ms(mut self, duration_ms: u32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn build(&self) -> String {
        let mut fields = Vec::with_capacity(5);
        if let Some(code) = self.config {
            fields.push(code.to_string());
        }
        fields.push(self.captured_at.to_string());
        fields.push(self.duration_ms.to_string());
        if let Some(red) = &self.red {
            fields.push(list(red));
        }
        fields.push(list(&self.ir));
        fields.join(";")
    }
}

fn list(samples: &[i64]) -> String {
    let items: Vec<String> = samples.iter().map(i64::to_string).collect();
    format!("[{}]", items.join(","))
}

#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
pub struct Unavailable;

/// Records appended in order, grouped by configuration
#[derive(Default)]
pub struct RecordingStore {
    groups: Mutex<BTreeMap<SensorConfig, Vec<AcceptedMeasurement>>>,
}

impl RecordingStore {
    pub fn total(&self) -> usize {
        self.groups
            .lock()
            .map(|g| g.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl MeasurementStore for RecordingStore {
    type Error = Unavailable;

    fn append(
        &self,
        config: SensorConfig,
        measurement: AcceptedMeasurement,
    ) -> Result<MeasureId, Unavailable> {
        let mut groups = self.groups.lock().map_err(|_| Unavailable)?;
        let group = groups.entry(config).or_default();
        group.push(measurement);
        MeasureId::from_index(group.len() - 1).ok_or(Unavailable)
    }

    fn load_all(
        &self,
        config: SensorConfig,
    ) -> Result<BTreeMap<MeasureId, AcceptedMeasurement>, Unavailable> {
        let groups = self.groups.lock().map_err(|_| Unavailable)?;
        Ok(groups
            .get(&config)
            .into_iter()
            .flatten()
            .enumerate()
            .filter_map(|(i, m)| MeasureId::from_index(i).map(|id| (id, m.clone())))
            .collect())
    }

    fn delete(&self, config: SensorConfig, id: MeasureId) -> Result<(), Unavailable> {
        let mut groups = self.groups.lock().map_err(|_| Unavailable)?;
        let group = groups.get_mut(&config).ok_or(Unavailable)?;
        if id.index() >= group.len() {
            return Err(Unavailable);
        }
        group.remove(id.index());
        Ok(())
    }

    fn configs(&self) -> Result<Vec<SensorConfig>, Unavailable> {
        let groups = self.groups.lock().map_err(|_| Unavailable)?;
        Ok(groups
            .iter()
            .filter(|(_, g)| !g.is_empty())
            .map(|(c, _)| *c)
            .collect())
    }
}
