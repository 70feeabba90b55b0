//! Ingestion pipeline
//!
//! One run per inbound message, no state carried between runs:
//!
//! 1. decode the payload ([`MessageDecoder`])
//! 2. filter every captured channel ([`FilterBank`])
//! 3. score every series ([`QualityScorer`])
//! 4. gate ([`QualityGate`])
//! 5. on accept, assemble and append to the store
//!
//! A gate rejection is a normal outcome, not an error.

use serde::{Deserialize, Serialize};

use crate::assembler::assemble;
use crate::decoder::MessageDecoder;
use crate::errors::{PipelineError, PipelineResult};
use crate::filters::{BandSpec, FilterBank, FilterBankConfig, FilteredChannelSet};
use crate::gate::{GateDecision, GatePolicy, QualityGate, RejectReason};
use crate::measurement::{Channel, RawMeasurement, SensorConfig};
use crate::sqi::{QualityScorer, SqiRecord};
use crate::traits::{MeasureId, MeasurementStore};

/// Filter and gate settings
///
/// Every field has a default, so an empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Filters run on each channel
    #[serde(flatten)]
    pub filters: FilterBankConfig,
    /// Accept/reject policy
    #[serde(default)]
    pub gate: GatePolicy,
}

impl PipelineConfig {
    /// Chebyshev passband
    pub fn with_chebyshev_band(mut self, band: BandSpec) -> Self {
        self.filters.chebyshev_band = band;
        self
    }

    /// Chebyshev prototype order and stopband attenuation
    pub fn with_chebyshev_design(mut self, order: usize, stopband_db: f64) -> Self {
        self.filters.chebyshev_order = order;
        self.filters.chebyshev_stopband_db = stopband_db;
        self
    }

    /// Moving-average window; `None` disables the variant
    pub fn with_moving_average_window(mut self, window: Option<usize>) -> Self {
        self.filters.moving_average_window = window;
        self
    }

    /// Fourier-mask passband; `None` disables the variant
    pub fn with_fourier_band(mut self, band: Option<BandSpec>) -> Self {
        self.filters.fourier_band = band;
        self
    }

    /// Gate policy
    pub fn with_gate(mut self, gate: GatePolicy) -> Self {
        self.gate = gate;
        self
    }
}

/// Everything computed for one measurement up to the gate
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Red series, absent in IR-only mode
    pub red: Option<FilteredChannelSet>,
    /// IR series
    pub ir: FilteredChannelSet,
    /// Quality indices of every series
    pub sqi: SqiRecord,
    /// Gate verdict
    pub decision: GateDecision,
}

/// Result of a pipeline run that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Persisted under `id`
    Accepted {
        /// Id assigned by the store
        id: MeasureId,
        /// Group the record was stored in
        sensor_config: SensorConfig,
    },
    /// Dropped by the gate
    Rejected {
        /// Why
        reason: RejectReason,
        /// Indices the decision was based on
        sqi: SqiRecord,
    },
}

impl PipelineOutcome {
    /// Whether the measurement was persisted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Decoder, filter bank, scorer and gate wired together
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    decoder: MessageDecoder,
    bank: FilterBank,
    scorer: QualityScorer,
    gate: QualityGate,
}

impl Pipeline {
    /// Pipeline with the given settings and a default decoder
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            decoder: MessageDecoder::new(),
            bank: FilterBank::new(config.filters),
            scorer: QualityScorer::new(),
            gate: QualityGate::new(config.gate),
        }
    }

    /// Replace the decoder
    pub fn with_decoder(mut self, decoder: MessageDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Active decoder
    pub fn decoder(&self) -> &MessageDecoder {
        &self.decoder
    }

    /// Record that the device was switched to another configuration
    pub fn set_active_config(&mut self, config: SensorConfig) {
        self.decoder.set_active_config(config);
    }

    /// Filter bank
    pub fn filter_bank(&self) -> &FilterBank {
        &self.bank
    }

    /// Gate
    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    /// Filter, score and gate without touching storage
    pub fn evaluate(&self, measurement: &RawMeasurement) -> Evaluation {
        let rate = measurement.sampling_rate();

        let red = measurement
            .samples(Channel::Red)
            .map(|samples| self.bank.apply(Channel::Red, samples, rate));
        let ir = self.bank.apply(Channel::Ir, measurement.ir_samples(), rate);

        let channels = red
            .as_ref()
            .map(|set| (Channel::Red, set))
            .into_iter()
            .chain(core::iter::once((Channel::Ir, &ir)));
        let sqi = self.scorer.score(channels);
        let decision = self.gate.evaluate(&sqi);

        Evaluation {
            red,
            ir,
            sqi,
            decision,
        }
    }

    /// Run a decoded measurement through to storage
    pub fn process_measurement<S>(
        &self,
        measurement: &RawMeasurement,
        store: &S,
    ) -> PipelineResult<PipelineOutcome>
    where
        S: MeasurementStore + ?Sized,
    {
        let Evaluation {
            red,
            ir,
            sqi,
            decision,
        } = self.evaluate(measurement);

        if let GateDecision::Reject(reason) = decision {
            log_info!(
                "Measurement captured {} rejected: {}",
                measurement.captured_at(),
                reason
            );
            return Ok(PipelineOutcome::Rejected { reason, sqi });
        }

        let sensor_config = measurement.sensor_config();
        let accepted = assemble(
            sensor_config,
            measurement.captured_at(),
            measurement.duration_ms(),
            measurement.sampling_rate(),
            red,
            ir,
            sqi,
        )?;

        let id = store
            .append(sensor_config, accepted)
            .map_err(|e| PipelineError::Storage(Box::new(e)))?;
        log_info!("Measurement stored as {} under '{}'", id, sensor_config);

        Ok(PipelineOutcome::Accepted { id, sensor_config })
    }

    /// Decode a payload and run it through to storage
    pub fn process<S>(&self, payload: &str, store: &S) -> PipelineResult<PipelineOutcome>
    where
        S: MeasurementStore + ?Sized,
    {
        let measurement = self.decoder.decode(payload)?;
        log_debug!(
            "Decoded {} samples per channel at {:.2} Hz ({})",
            measurement.ir_samples().len(),
            measurement.sampling_rate(),
            measurement.sensor_config()
        );
        self.process_measurement(&measurement, store)
    }
}
