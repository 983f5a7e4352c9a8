// Copyright (c) 2025 - Cowboy AI, Inc.
//! End-to-end tests for the emission engine
//!
//! All tests run on a paused tokio clock, so tick counts are exact. Sleeps end
//! between tick boundaries to keep ordering unambiguous.

use cim_random_emitter::{
    ChannelSink, CollectingSink, DisplayState, DistributionParameters, EmissionConfig,
    EmitterError, EngineController, EngineSettings, EngineState, ReconcilePlan, SampleValue,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::time;
use tokio_test::{assert_err, assert_ok};

fn sin(frequency: f64, increment: f64) -> EmissionConfig {
    EmissionConfig::new(frequency, DistributionParameters::Sin { increment }, false)
}

fn uniform(frequency: f64, min: f64, max: f64, show_output: bool) -> EmissionConfig {
    EmissionConfig::new(
        frequency,
        DistributionParameters::Uniform { min, max },
        show_output,
    )
}

fn numbers(sink: &CollectingSink) -> Vec<f64> {
    sink.values().iter().filter_map(SampleValue::as_f64).collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-12, "{} != {}", a, e);
    }
}

fn running(sink: &CollectingSink, config: EmissionConfig) -> EngineController {
    let mut engine = EngineController::new(sink.clone());
    assert_eq!(assert_ok!(engine.apply(config)), ReconcilePlan::Start);
    engine
}

// ============================================================================
// Emission
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_constant_uniform_emits_and_displays_every_tick() {
    let sink = CollectingSink::new();
    let engine = running(&sink, uniform(2.0, 5.0, 5.0, true));
    let mut display = engine.subscribe_display();

    time::sleep(Duration::from_millis(1_250)).await;

    assert_eq!(
        sink.values(),
        vec![SampleValue::Number(5.0), SampleValue::Number(5.0)]
    );
    assert_eq!(engine.ticks(), 2);
    assert_eq!(engine.display(), DisplayState::Value("5".to_string()));
    assert!(assert_ok!(display.has_changed()));
    assert_eq!(display.borrow_and_update().to_string(), "5");
}

#[tokio::test(start_paused = true)]
async fn test_sin_sequence_at_one_hertz() {
    let sink = CollectingSink::new();
    let engine = running(&sink, sin(1.0, 0.01));

    time::sleep(Duration::from_millis(500)).await;
    assert!(sink.is_empty());

    time::sleep(Duration::from_millis(2_000)).await;
    assert_close(&numbers(&sink), &[0.02f64.sin(), 0.03f64.sin()]);
    assert_eq!(engine.display(), DisplayState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_output_keeps_indicator_but_still_publishes() {
    let sink = CollectingSink::new();
    let engine = running(&sink, uniform(4.0, 0.0, 1.0, false));

    time::sleep(Duration::from_millis(1_100)).await;

    assert_eq!(sink.len(), 4);
    assert_eq!(engine.display(), DisplayState::Active);
    assert_eq!(engine.last_value(), sink.values().last().copied());
}

#[tokio::test(start_paused = true)]
async fn test_channel_sink_receives_keyed_values() {
    let (sink, mut rx) = ChannelSink::channel();
    let settings = EngineSettings::default()
        .with_output_key("rand")
        .with_initial_config(EmissionConfig::new(
            10.0,
            DistributionParameters::UniformInt { min: 1.5, max: 3.9 },
            false,
        ));
    let _engine = assert_ok!(EngineController::mount(sink, settings));

    for _ in 0..20 {
        let published = rx.recv().await.unwrap();
        assert_eq!(published.key, "rand");
        match published.value {
            SampleValue::Integer(i) => assert!((1..=3).contains(&i), "{}", i),
            other => panic!("expected integer, got {:?}", other),
        }
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_identical_snapshot_keeps_timer() {
    let sink = CollectingSink::new();
    let config = uniform(1.0, 0.0, 1.0, false);
    let mut engine = running(&sink, config);
    let handle = engine.handle_id();
    let sampler = engine.sampler_id();

    time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(assert_ok!(engine.apply(config)), ReconcilePlan::Keep);
    assert_eq!(engine.handle_id(), handle);
    assert_eq!(engine.sampler_id(), sampler);

    time::sleep(Duration::from_millis(2_000)).await;
    assert_eq!(sink.len(), 3);
    assert_eq!(engine.ticks(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_frequency_change_keeps_sampler_and_phase() {
    let sink = CollectingSink::new();
    let mut engine = running(&sink, sin(1.0, 0.01));
    let sampler = engine.sampler_id();
    let handle = engine.handle_id();

    time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(
        assert_ok!(engine.apply(sin(2.0, 0.01))),
        ReconcilePlan::RestartTimer
    );
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.sampler_id(), sampler);
    assert_ne!(engine.handle_id(), handle);

    // new timer starts counting from the change: ticks at +500ms and +1000ms
    time::sleep(Duration::from_millis(1_100)).await;
    assert_close(
        &numbers(&sink),
        &[0.02f64.sin(), 0.03f64.sin(), 0.04f64.sin(), 0.05f64.sin()],
    );
    let phase = engine.sampler_phase().unwrap();
    assert!((phase - 0.05).abs() < 1e-12, "{}", phase);
}

#[tokio::test(start_paused = true)]
async fn test_parameter_change_rebuilds_sampler() {
    let sink = CollectingSink::new();
    let mut engine = running(&sink, sin(1.0, 0.01));
    let sampler = engine.sampler_id();

    time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(
        assert_ok!(engine.apply(sin(1.0, 0.02))),
        ReconcilePlan::RebuildSampler
    );
    assert_ne!(engine.sampler_id(), sampler);
    assert_eq!(engine.sampler_phase(), Some(0.01));

    time::sleep(Duration::from_millis(1_100)).await;
    assert_close(
        &numbers(&sink),
        &[0.02f64.sin(), 0.03f64.sin(), 0.03f64.sin()],
    );
}

#[tokio::test(start_paused = true)]
async fn test_kind_change_switches_value_type() {
    let sink = CollectingSink::new();
    let mut engine = running(&sink, uniform(2.0, 0.0, 1.0, false));

    time::sleep(Duration::from_millis(600)).await;
    let plan = assert_ok!(engine.apply_json(r#"{"frequency": 2, "distribution": "uniformBoolean"}"#));
    assert_eq!(plan, ReconcilePlan::RebuildSampler);

    time::sleep(Duration::from_millis(1_100)).await;
    let values = sink.values();
    assert_eq!(values.len(), 3);
    assert!(matches!(values[0], SampleValue::Number(_)));
    assert!(values[1..].iter().all(|v| v.as_bool().is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_snapshots_leave_engine_untouched() {
    let sink = CollectingSink::new();
    let config = uniform(2.0, 0.0, 1.0, false);
    let mut engine = running(&sink, config);
    let handle = engine.handle_id();
    let sampler = engine.sampler_id();

    time::sleep(Duration::from_millis(600)).await;

    let err = assert_err!(engine.apply(uniform(0.0, 0.0, 1.0, false)));
    assert_eq!(err, EmitterError::InvalidFrequency(0.0));

    let err = assert_err!(engine.apply_json(r#"{"frequency": 2, "distribution": "poisson"}"#));
    assert_eq!(err, EmitterError::UnknownDistribution("poisson".to_string()));

    let err = assert_err!(engine.apply(EmissionConfig::new(
        2.0,
        DistributionParameters::UniformInt { min: 5.0, max: 2.0 },
        false,
    )));
    assert!(err.is_configuration(), "{:?}", err);

    assert_err!(engine.apply_json("{not json"));

    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.config(), Some(config));
    assert_eq!(engine.handle_id(), handle);
    assert_eq!(engine.sampler_id(), sampler);

    time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(sink.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_show_output_toggle_does_not_restart_timer() {
    let sink = CollectingSink::new();
    let mut engine = running(&sink, uniform(2.0, 7.0, 7.0, false));
    let handle = engine.handle_id();

    time::sleep(Duration::from_millis(1_250)).await;
    assert_eq!(engine.display(), DisplayState::Active);

    assert_eq!(
        assert_ok!(engine.apply(uniform(2.0, 7.0, 7.0, true))),
        ReconcilePlan::ToggleDisplay
    );
    assert_eq!(engine.handle_id(), handle);
    assert_eq!(engine.display(), DisplayState::Value("7".to_string()));

    // the 1500ms tick still lands on the original cadence
    time::sleep(Duration::from_millis(350)).await;
    assert_eq!(sink.len(), 3);

    assert_eq!(
        assert_ok!(engine.apply(uniform(2.0, 7.0, 7.0, false))),
        ReconcilePlan::ToggleDisplay
    );
    assert_eq!(engine.display(), DisplayState::Active);
    assert_eq!(engine.config().map(|c| c.show_output), Some(false));
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_emission_for_good() {
    let sink = CollectingSink::new();
    let mut engine = running(&sink, uniform(4.0, 0.0, 1.0, false));

    time::sleep(Duration::from_millis(600)).await;
    engine.shutdown();
    engine.shutdown();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(!engine.is_running());

    let emitted = sink.len();
    assert_eq!(emitted, 2);
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(sink.len(), emitted);

    let err = assert_err!(engine.apply(uniform(1.0, 0.0, 1.0, false)));
    assert_eq!(err, EmitterError::Shutdown);
    assert_eq!(sink.len(), emitted);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_emission() {
    let sink = CollectingSink::new();
    let engine = running(&sink, uniform(4.0, 0.0, 1.0, false));

    time::sleep(Duration::from_millis(600)).await;
    drop(engine);
    time::sleep(Duration::from_secs(5)).await;

    assert_eq!(sink.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_snapshot_after_shutdown_reports_shutdown() {
    let mut engine = running(&CollectingSink::new(), uniform(2.0, 0.0, 1.0, false));
    engine.shutdown();

    let err = assert_err!(engine.apply(uniform(0.0, 0.0, 1.0, false)));
    assert_eq!(err, EmitterError::Shutdown);

    let err = assert_err!(engine.apply_json(r#"{"distribution": "poisson"}"#));
    assert_eq!(err, EmitterError::Shutdown);

    let err = assert_err!(engine.apply_json("{not json"));
    assert_eq!(err, EmitterError::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_drive_stops_at_shutdown() {
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let sink = CollectingSink::new();
    let mut engine = running(&sink, sin(1.0, 0.01));
    engine.shutdown();

    let pulled = AtomicUsize::new(0);
    let configs = futures::stream::iter(vec![sin(0.0, 0.01), sin(2.0, 0.01), sin(-1.0, 0.01)])
        .inspect(|_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        });
    let rejected = engine.drive(configs).await;

    assert!(rejected.is_empty());
    assert_eq!(pulled.load(Ordering::SeqCst), 1);
    assert_eq!(engine.state(), EngineState::Stopped);
}
