// tests/source_integration.rs
//! Sample sources driving the pipeline from their worker threads

use emg_pipeline::hal::{
    SampleSource, SignalGenerator, SignalProfile, SimulatorConfig, SyntheticSource, TransportReading, TransportSource,
};
use emg_pipeline::processing::LinkState;
use emg_pipeline::{EmgPipeline, PipelineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn fast_source(profile: SignalProfile, seed: u64) -> SyntheticSource {
    SyntheticSource::new(SimulatorConfig {
        profile,
        interval_ms: 5,
        seed,
    })
    .expect("valid simulator config")
}

fn wait_for<F: Fn() -> bool>(cond: F) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !cond() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert!(cond(), "condition not reached in time");
}

fn frame(muscle: &str, value: f64) -> Vec<u8> {
    serde_json::to_vec(&TransportReading {
        device_id: "HC-05".to_string(),
        muscle_group: muscle.to_string(),
        emg_value: value,
        voltage: value / 1024.0 * 5.0,
        timestamp: "2024-05-01T10:00:00.000Z".to_string(),
        session_id: "session-1".to_string(),
        user_id: "user-1".to_string(),
    })
    .unwrap()
}

#[test]
fn test_synthetic_source_feeds_processor() {
    let mut pipeline = EmgPipeline::new(PipelineConfig::default()).unwrap();
    let mut source = fast_source(SignalProfile::CalibrationRelaxed, 7);

    pipeline.attach_source("bicep-left", &mut source).unwrap();
    assert!(pipeline.is_source_running("bicep-left"));
    wait_for(|| pipeline.get_history("bicep-left").unwrap().len() >= 10);
    assert!(pipeline.detach_source("bicep-left"));

    let history = pipeline.get_history("bicep-left").unwrap();
    assert!(history.iter().all(|r| (150..=250).contains(&r.raw_value)));
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let stats = pipeline.get_stats("bicep-left").unwrap();
    assert!(stats.peak >= 150 && stats.peak <= 250);
    // each reading adds the source's 5ms interval
    assert!(stats.duration_seconds > 0.0);
}

#[test]
fn test_no_callbacks_after_stop() {
    let mut pipeline = EmgPipeline::new(PipelineConfig::default()).unwrap();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    let _subscription = pipeline
        .on_reading(
            "bicep-left",
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    let mut source = fast_source(SignalProfile::Dashboard, 11);
    pipeline.attach_source("bicep-left", &mut source).unwrap();
    wait_for(|| delivered.load(Ordering::SeqCst) >= 5);

    assert!(pipeline.detach_source("bicep-left"));
    let after_stop = delivered.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(delivered.load(Ordering::SeqCst), after_stop);
    assert!(!pipeline.is_source_running("bicep-left"));
    assert!(!pipeline.detach_source("bicep-left"));
}

#[test]
fn test_handle_stop_is_idempotent() {
    let mut source = fast_source(SignalProfile::Session, 3);
    let count = Arc::new(AtomicUsize::new(0));
    let sink = count.clone();
    let mut handle = source
        .start(Box::new(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

    wait_for(|| count.load(Ordering::SeqCst) > 0);
    handle.stop();
    handle.stop();
    assert!(!handle.is_running());

    let stopped_at = count.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(count.load(Ordering::SeqCst), stopped_at);
}

#[test]
fn test_same_seed_same_signal() {
    let config = SimulatorConfig::for_profile(SignalProfile::CalibrationFlexed, 99);
    let mut a = SignalGenerator::new(&config).unwrap();
    let mut b = SignalGenerator::new(&config).unwrap();

    let first: Vec<u16> = (0..50).map(|_| a.next_value()).collect();
    let second: Vec<u16> = (0..50).map(|_| b.next_value()).collect();
    assert_eq!(first, second);
    assert!(first.iter().all(|v| (550..=650).contains(v)));
}

#[test]
fn test_transport_source_through_pipeline() {
    let mut pipeline = EmgPipeline::new(PipelineConfig::default()).unwrap();
    let (mut source, feed) = TransportSource::new("ble", Some("tricep-left"), Duration::from_millis(100));
    pipeline.attach_source("tricep-left", &mut source).unwrap();

    assert!(feed.push_json(&frame("tricep-left", 512.0)));
    assert!(feed.push_json(b"{ not json"));
    assert!(feed.push_json(&frame("bicep-left", 900.0)));
    assert!(feed.push_json(&frame("tricep-left", 2000.0)));
    wait_for(|| pipeline.get_history("tricep-left").unwrap().len() == 2);

    let history = pipeline.get_history("tricep-left").unwrap();
    assert_eq!(history[0].raw_value, 512);
    assert_eq!(history[0].voltage, 2.5);
    // out of range transport values are clamped by the source
    assert_eq!(history[1].raw_value, 1023);

    feed.disconnect("link lost");
    let processor = pipeline.processor("tricep-left").unwrap();
    wait_for(|| !processor.lock().link_state().is_connected());
    assert_eq!(
        *processor.lock().link_state(),
        LinkState::Disconnected {
            reason: "link lost".to_string()
        }
    );

    // last known stats stay readable
    let stats = pipeline.get_stats("tricep-left").unwrap();
    assert_eq!(stats.peak, 1023);
    wait_for(|| !pipeline.is_source_running("tricep-left"));
}

#[test]
fn test_dropped_feed_reports_disconnect() {
    let mut pipeline = EmgPipeline::new(PipelineConfig::default()).unwrap();
    let (mut source, feed) = TransportSource::new("serial", None, Duration::from_millis(100));
    pipeline.attach_source("bicep-left", &mut source).unwrap();
    drop(feed);

    let processor = pipeline.processor("bicep-left").unwrap();
    wait_for(|| !processor.lock().link_state().is_connected());
}

#[test]
fn test_reattach_replaces_source_and_reconnects() {
    let mut pipeline = EmgPipeline::new(PipelineConfig::default()).unwrap();
    let (mut first, feed) = TransportSource::new("ble", None, Duration::from_millis(100));
    pipeline.attach_source("bicep-left", &mut first).unwrap();
    feed.disconnect("gone");

    let processor = pipeline.processor("bicep-left").unwrap();
    wait_for(|| !processor.lock().link_state().is_connected());

    let mut second = fast_source(SignalProfile::Dashboard, 5);
    pipeline.attach_source("bicep-left", &mut second).unwrap();
    assert!(processor.lock().link_state().is_connected());
    wait_for(|| !pipeline.get_history("bicep-left").unwrap().is_empty());

    pipeline.shutdown();
    assert!(!pipeline.is_source_running("bicep-left"));
}

#[test]
fn test_channel_subscription_receives_readings() {
    let mut pipeline = EmgPipeline::new(PipelineConfig::default()).unwrap();
    let (subscription, readings) = pipeline.subscribe_channel("bicep-left", 16).unwrap();

    let mut source = fast_source(SignalProfile::CalibrationRelaxed, 1);
    pipeline.attach_source("bicep-left", &mut source).unwrap();

    let reading = readings.recv_timeout(Duration::from_secs(2)).expect("reading delivered");
    assert!((150..=250).contains(&reading.raw_value));

    subscription.unsubscribe();
    pipeline.detach_source("bicep-left");
}
