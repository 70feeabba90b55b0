//! End-to-end tests for the ingestion pipeline
//!
//! Payload in, store contents out: decode, filter, score, gate, assemble and
//! append.

mod common;

use ppgguard_core::{
    decode, BandSpec, Channel, FilterVariant, MeasureId, MeasurementStore, MessageDecoder, Pipeline,
    PipelineConfig, PipelineError, PipelineOutcome, RejectReason, SensorConfig, Statistic,
};

use common::{artifact_ir, clean_ir, clean_red, PayloadBuilder, RecordingStore, SAMPLES};

#[test]
fn clean_measurement_is_persisted_with_all_series() {
    let store = RecordingStore::default();
    let payload = PayloadBuilder::new(clean_ir()).red(clean_red()).build();

    let outcome = Pipeline::default().process(&payload, &store).unwrap();
    assert_eq!(
        outcome,
        PipelineOutcome::Accepted {
            id: MeasureId::FIRST,
            sensor_config: SensorConfig::Default,
        }
    );

    let stored = store.load_all(SensorConfig::Default).unwrap();
    assert_eq!(stored.len(), 1);
    let record = &stored[&MeasureId::FIRST];

    // raw, moving average and Chebyshev for both channels
    let keys: Vec<String> = record.signals().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        [
            "redMeasure",
            "redFilteredMA",
            "redFilteredCheby",
            "irMeasure",
            "irFilteredMA",
            "irFilteredCheby",
        ]
    );
    assert_eq!(record.sampling_rate(), 100.0);

    let ir = record.channel(Channel::Ir).unwrap();
    assert_eq!(ir.raw.len(), SAMPLES);
    assert_eq!(ir.chebyshev.as_ref().map(Vec::len), Some(SAMPLES));
    assert_eq!(ir.moving_average.as_ref().map(Vec::len), Some(SAMPLES - 9));
    // Decoder negates the photodiode counts
    assert!(ir.raw.iter().all(|v| *v < 0.0));

    let kurt = record
        .sqi()
        .get(Channel::Ir, FilterVariant::Chebyshev, Statistic::Kurtosis)
        .unwrap();
    assert!(kurt > -2.0 && kurt < 5.0, "{kurt}");
}

#[test]
fn artifact_measurement_is_dropped() {
    let store = RecordingStore::default();
    let payload = PayloadBuilder::new(artifact_ir()).red(clean_red()).build();

    let outcome = Pipeline::default().process(&payload, &store).unwrap();
    match outcome {
        PipelineOutcome::Rejected {
            reason: RejectReason::OutOfBounds { channel, value, .. },
            sqi,
        } => {
            assert_eq!(channel, Channel::Ir);
            assert!(value >= 5.0, "{value}");
            assert!(sqi.has_channel(Channel::Red));
        }
        other => panic!("expected out-of-bounds rejection, got {other:?}"),
    }
    assert_eq!(store.total(), 0);
}

#[test]
fn ir_only_capture_is_gated_on_ir() {
    let store = RecordingStore::default();

    let clean = PayloadBuilder::new(clean_ir()).build();
    assert!(Pipeline::default().process(&clean, &store).unwrap().is_accepted());

    let noisy = PayloadBuilder::new(artifact_ir()).build();
    assert!(!Pipeline::default().process(&noisy, &store).unwrap().is_accepted());

    let stored = store.load_all(SensorConfig::Default).unwrap();
    assert_eq!(stored.len(), 1);
    let record = &stored[&MeasureId::FIRST];
    assert!(record.channel(Channel::Red).is_none());
    assert_eq!(record.signals().count(), 3);
}

#[test]
fn ids_are_sequential_per_configuration() {
    let store = RecordingStore::default();
    let pipeline = Pipeline::default();
    let base = PayloadBuilder::new(clean_ir()).red(clean_red());

    let first = pipeline.process(&base.build(), &store).unwrap();
    let second = pipeline.process(&base.build(), &store).unwrap();
    let prefixed = PayloadBuilder::new(clean_ir()).red(clean_red()).config(4);
    let other = pipeline.process(&prefixed.build(), &store).unwrap();

    let id = |o: &PipelineOutcome| match o {
        PipelineOutcome::Accepted { id, .. } => id.get(),
        PipelineOutcome::Rejected { .. } => 0,
    };
    assert_eq!((id(&first), id(&second), id(&other)), (1, 2, 1));
    assert_eq!(
        store.configs().unwrap(),
        vec![SensorConfig::Default, SensorConfig::Hz1600Avg16]
    );
}

#[test]
fn active_configuration_applies_to_unprefixed_payloads() {
    let store = RecordingStore::default();
    let decoder = MessageDecoder::new().with_active_config(SensorConfig::Hz800Avg4);
    let pipeline = Pipeline::default().with_decoder(decoder);

    let payload = PayloadBuilder::new(clean_ir()).red(clean_red()).build();
    let outcome = pipeline.process(&payload, &store).unwrap();
    assert_eq!(
        outcome,
        PipelineOutcome::Accepted {
            id: MeasureId::FIRST,
            sensor_config: SensorConfig::Hz800Avg4,
        }
    );
}

#[test]
fn malformed_payload_stores_nothing() {
    let store = RecordingStore::default();
    let payloads = [
        "",
        "1700000000;1000",
        "x;1000;[1,2];[3,4]",
        "9;1700000000;1000;[1];[2]",
    ];
    for payload in payloads {
        let err = Pipeline::default().process(payload, &store).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)), "{payload}: {err}");
    }
    assert_eq!(store.total(), 0);
}

#[test]
fn fourier_variant_is_scored_when_enabled() {
    let config = PipelineConfig::default().with_fourier_band(Some(BandSpec::HEART_RATE));
    let payload = PayloadBuilder::new(clean_ir()).red(clean_red()).build();
    let measurement = decode(&payload).unwrap();

    let evaluation = Pipeline::new(config).evaluate(&measurement);
    assert!(evaluation.decision.is_accept());
    assert_eq!(evaluation.sqi.len(), 8);
    assert_eq!(evaluation.ir.fourier.as_ref().map(Vec::len), Some(SAMPLES));
}

#[test]
fn stricter_gate_rejects_clean_pulse() {
    use ppgguard_core::GatePolicy;

    // Sinusoid-like beats sit near -1.35 excess kurtosis
    let config = PipelineConfig::default().with_gate(GatePolicy::default().bounds(-1.0, 5.0));
    let payload = PayloadBuilder::new(clean_ir()).red(clean_red()).build();
    let store = RecordingStore::default();

    let outcome = Pipeline::new(config).process(&payload, &store).unwrap();
    assert!(!outcome.is_accepted());
    assert_eq!(store.total(), 0);
}

#[test]
fn persisted_document_round_trips() {
    let store = RecordingStore::default();
    let payload = PayloadBuilder::new(clean_ir()).red(clean_red()).duration_ms(10_000).build();
    Pipeline::default().process(&payload, &store).unwrap();

    let record = store.load_all(SensorConfig::Default).unwrap()[&MeasureId::FIRST].clone();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["sensorConfig"], "Default");
    assert_eq!(json["measureFrequency"], 100.0);
    assert!(json["signals"]["irFilteredCheby"].is_string());
    assert!(json["sqi"]["red_cheby_kurt"].is_number());

    let back: ppgguard_core::AcceptedMeasurement = serde_json::from_value(json).unwrap();
    assert_eq!(back.sqi(), record.sqi());
    assert_eq!(back.channel(Channel::Ir).map(|c| c.raw.len()), Some(SAMPLES));
}
