//! Ingest service
//!
//! Glue between a payload source and the pipeline. Each payload is processed
//! independently; failures are logged and the payload dropped, so one bad
//! message never stops the stream.

use ppgguard_core::{
    MeasurementStore, Pipeline, PipelineError, PipelineOutcome, SensorConfig,
};

/// Running totals since the service started
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// Payloads handed to the service
    pub received: u64,
    /// Persisted
    pub accepted: u64,
    /// Dropped by the quality gate
    pub rejected: u64,
    /// Dropped as undecodable
    pub decode_failures: u64,
    /// Dropped because assembly or storage failed
    pub storage_failures: u64,
}

/// Pipeline plus store
#[derive(Debug)]
pub struct IngestService<S> {
    pipeline: Pipeline,
    store: S,
    stats: IngestStats,
}

impl<S: MeasurementStore> IngestService<S> {
    pub fn new(pipeline: Pipeline, store: S) -> Self {
        Self {
            pipeline,
            store,
            stats: IngestStats::default(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Record that the device was switched to `config`
    ///
    /// Payloads without a configuration prefix are filed under it from now on.
    pub fn set_active_config(&mut self, config: SensorConfig) {
        log::info!("Active sensor configuration is now '{}'", config);
        self.pipeline.set_active_config(config);
    }

    /// Process one payload, logging and dropping any failure
    pub fn handle(&mut self, payload: &str) -> Option<PipelineOutcome> {
        self.stats.received += 1;
        match self.pipeline.process(payload, &self.store) {
            Ok(outcome) => {
                match &outcome {
                    PipelineOutcome::Accepted { .. } => self.stats.accepted += 1,
                    PipelineOutcome::Rejected { .. } => self.stats.rejected += 1,
                }
                Some(outcome)
            }
            Err(PipelineError::Decode(e)) => {
                self.stats.decode_failures += 1;
                log::warn!("Dropping undecodable payload ({:?}): {}", e.kind(), e);
                None
            }
            Err(e) => {
                self.stats.storage_failures += 1;
                log::error!("Dropping measurement: {}", e);
                None
            }
        }
    }

    /// Process payloads in order; returns how many were accepted
    pub fn handle_all<I>(&mut self, payloads: I) -> usize
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        payloads
            .into_iter()
            .filter_map(|p| self.handle(p.as_ref()))
            .filter(PipelineOutcome::is_accepted)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppgguard_store::InMemoryStore;
    use std::f64::consts::PI;

    fn series(spiky: bool) -> String {
        let items: Vec<String> = (0..1000)
            .map(|i| {
                let v = if spiky {
                    if i % 500 == 250 { 70_000.0 } else { 50_000.0 }
                } else {
                    50_000.0 + 800.0 * (2.0 * PI * 1.2 * i as f64 / 100.0).sin()
                };
                (v as i64).to_string()
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    fn payload(spiky: bool) -> String {
        format!("1700000000;10000;{};{}", series(false), series(spiky))
    }

    #[test]
    fn counts_every_outcome() {
        let mut service = IngestService::new(Pipeline::default(), InMemoryStore::new());
        let accepted = service.handle_all([payload(false), "nonsense".into(), payload(true)]);
        assert_eq!(accepted, 1);
        assert_eq!(
            service.stats(),
            IngestStats {
                received: 3,
                accepted: 1,
                rejected: 1,
                decode_failures: 1,
                storage_failures: 0,
            }
        );
        assert_eq!(service.store().len().unwrap(), 1);
    }

    #[test]
    fn active_config_routes_unprefixed_payloads() {
        let mut service = IngestService::new(Pipeline::default(), InMemoryStore::new());
        service.set_active_config(SensorConfig::Hz1000Avg8);
        service.handle(&payload(false));
        assert_eq!(service.store().count(SensorConfig::Hz1000Avg8).unwrap(), 1);
        assert_eq!(service.store().count(SensorConfig::Default).unwrap(), 0);
    }
}
