// tests/async_source.rs
//! Tokio interval source feeding a processor from an async task
#![cfg(feature = "async")]

use emg_pipeline::config::ProcessorConfig;
use emg_pipeline::hal::{IntervalSource, SignalProfile, SimulatorConfig, SourceEvent};
use emg_pipeline::SampleProcessor;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn config(profile: SignalProfile) -> SimulatorConfig {
    SimulatorConfig {
        profile,
        interval_ms: 5,
        seed: 21,
    }
}

#[tokio::test]
async fn test_async_readings_reach_processor() {
    let mut source = IntervalSource::new(&config(SignalProfile::CalibrationFlexed)).unwrap();
    let (tx, mut rx) = mpsc::channel(32);
    let mut handle = source.start(tx).unwrap();

    let mut processor = SampleProcessor::new("quadriceps-left", &ProcessorConfig::live_view())
        .with_interval(source.interval());
    for _ in 0..25 {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event in time")
            .expect("source alive");
        processor.handle_event(event).unwrap();
    }
    handle.stop().await;

    // live view keeps the last 20 readings
    assert_eq!(processor.history().len(), 20);
    assert!(processor.history().iter().all(|r| (550..=650).contains(&r.raw_value)));

    let stats = processor.stats();
    assert!((stats.duration_seconds - 25.0 * 0.005).abs() < 1e-9);
}

#[tokio::test]
async fn test_channel_closes_after_stop() {
    let mut source = IntervalSource::new(&config(SignalProfile::Dashboard)).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    let mut handle = source.start(tx).unwrap();

    let first = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert!(matches!(first, Some(SourceEvent::Sample(_))));

    handle.stop().await;
    assert!(!handle.is_running());

    // buffered events drain, then the sender is gone
    let drained = timeout(Duration::from_secs(2), async {
        let mut count = 0;
        while rx.recv().await.is_some() {
            count += 1;
        }
        count
    })
    .await
    .expect("channel closed");
    assert!(drained <= 4);
}

#[tokio::test]
async fn test_task_ends_when_receiver_dropped() {
    let mut source = IntervalSource::new(&config(SignalProfile::Session)).unwrap();
    let (tx, rx) = mpsc::channel(1);
    let handle = source.start(tx).unwrap();
    drop(rx);

    timeout(Duration::from_secs(2), async {
        while handle.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("task finished after receiver dropped");
}
