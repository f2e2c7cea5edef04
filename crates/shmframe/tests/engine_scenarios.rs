#![cfg(unix)]

//! End-to-end scenarios against real shared-memory segments.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use shmframe::channel::FrameProducer;
use shmframe::{
    AnalyticsSettings, DetectionResult, Engine, FrameEvent, IntervalStage, Roi, TuningPair,
};

const TICK: Duration = Duration::from_millis(2);
const SETTLE: Duration = Duration::from_millis(100);
const DEADLINE: Duration = Duration::from_secs(5);

fn unique_channel_id() -> u32 {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    920_000_000u32
        .wrapping_add((std::process::id() % 100_000) * 1_000)
        .wrapping_add(n)
}

#[derive(Debug, Clone)]
struct Captured {
    channel_id: u32,
    width: u32,
    height: u32,
    size: usize,
    timestamp: u64,
    payload_uniform: Option<u8>,
    rois: Vec<Roi>,
    node_count: usize,
}

fn capturing_sink(store: Arc<Mutex<Vec<Captured>>>) -> Arc<dyn shmframe::FrameSink> {
    Arc::new(move |event: &FrameEvent<'_>| {
        let first = event.payload.first().copied();
        let uniform = match first {
            Some(byte) if event.payload.iter().all(|b| *b == byte) => Some(byte),
            _ => None,
        };
        store.lock().unwrap().push(Captured {
            channel_id: event.channel_id,
            width: event.width,
            height: event.height,
            size: event.size(),
            timestamp: event.timestamp,
            payload_uniform: uniform,
            rois: event.flatten_rois(),
            node_count: event.node_count(),
        });
    })
}

fn wait_for<F: FnMut() -> bool>(mut condition: F) -> bool {
    let deadline = Instant::now() + DEADLINE;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

fn settings() -> AnalyticsSettings {
    AnalyticsSettings {
        version: "1.2".to_string(),
        event_endpoint: "http://127.0.0.1:9000/events".to_string(),
        image_width: 640,
        image_height: 480,
        jpg_quality: 50,
        tuning: vec![TuningPair {
            sensitivity: 5,
            threshold: 70,
        }],
        roi_grid: vec![],
    }
}

#[test]
fn produced_frame_reaches_callback_with_exact_fields() {
    let channel_id = unique_channel_id();
    let mut producer = FrameProducer::create(channel_id).expect("producer should create");
    let payload = vec![0xAB; 921_600];
    assert!(producer.publish(640, 480, 1000, &payload).unwrap());

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(IntervalStage::new(1)).with_interval(TICK);
    engine.register_callback(capturing_sink(events.clone()));
    engine.apply_settings(settings()).expect("settings should apply");
    engine.initialize(channel_id).expect("engine should start");

    assert!(wait_for(|| !events.lock().unwrap().is_empty()));
    engine.shutdown().expect("shutdown should succeed");

    let captured = events.lock().unwrap();
    let event = &captured[0];
    assert_eq!(event.channel_id, channel_id);
    assert_eq!(event.width, 640);
    assert_eq!(event.height, 480);
    assert_eq!(event.size, 921_600);
    assert_eq!(event.timestamp, 1000);
    assert_eq!(event.payload_uniform, Some(0xAB));

    // The stand-in stage reports two nodes of four regions each.
    assert_eq!(event.node_count, 2);
    assert_eq!(event.rois.len(), 8);
    assert_eq!(event.rois[0], Roi { x: 0, y: 0 });
    assert_eq!(event.rois[7], Roi { x: 80, y: 80 });
}

#[test]
fn no_dispatch_before_settings_arrive() {
    let channel_id = unique_channel_id();
    let mut producer = FrameProducer::create(channel_id).expect("producer should create");
    assert!(producer.publish(4, 4, 1, &[1u8; 48]).unwrap());

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(IntervalStage::new(1)).with_interval(TICK);
    engine.register_callback(capturing_sink(events.clone()));
    engine.initialize(channel_id).expect("engine should start");

    // Frames are consumed but discarded while detection is unconfigured.
    std::thread::sleep(SETTLE);
    assert!(events.lock().unwrap().is_empty());

    engine.apply_settings(settings()).expect("settings should apply");
    assert!(wait_for(|| producer.publish(4, 4, 2, &[2u8; 48]).unwrap()));
    assert!(wait_for(|| !events.lock().unwrap().is_empty()));

    engine.shutdown().expect("shutdown should succeed");
}

#[test]
fn settings_before_initialize_enable_detection_from_the_start() {
    let channel_id = unique_channel_id();
    let mut producer = FrameProducer::create(channel_id).expect("producer should create");
    assert!(producer.publish(8, 8, 77, &[3u8; 192]).unwrap());

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(IntervalStage::new(1)).with_interval(TICK);
    engine.apply_settings(settings()).expect("settings should apply");
    engine.register_callback(capturing_sink(events.clone()));
    engine.initialize(channel_id).expect("engine should start");

    // The frame published before start is the first one polled; it must be
    // dispatched, proving detection was enabled from the first tick.
    assert!(wait_for(|| !events.lock().unwrap().is_empty()));
    engine.shutdown().expect("shutdown should succeed");

    assert_eq!(events.lock().unwrap()[0].timestamp, 77);
}

#[test]
fn unregister_stops_all_further_dispatch() {
    let channel_id = unique_channel_id();
    let mut producer = FrameProducer::create(channel_id).expect("producer should create");

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(IntervalStage::new(1)).with_interval(TICK);
    engine.register_callback(capturing_sink(events.clone()));
    engine.apply_settings(settings()).expect("settings should apply");
    engine.initialize(channel_id).expect("engine should start");

    assert!(producer.publish(4, 4, 1, &[1u8; 48]).unwrap());
    assert!(wait_for(|| !events.lock().unwrap().is_empty()));

    engine.unregister_callback();
    let seen = events.lock().unwrap().len();

    for ts in 2..10u64 {
        assert!(wait_for(|| producer.publish(4, 4, ts, &[9u8; 48]).unwrap()));
    }
    std::thread::sleep(SETTLE);

    assert_eq!(events.lock().unwrap().len(), seen);
    engine.shutdown().expect("shutdown should succeed");
}

#[test]
fn poller_survives_absent_segment_and_attaches_later() {
    let channel_id = unique_channel_id();

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(IntervalStage::new(1)).with_interval(TICK);
    engine.register_callback(capturing_sink(events.clone()));
    engine.apply_settings(settings()).expect("settings should apply");
    engine.initialize(channel_id).expect("engine should start");

    // No producer yet: ticks see NotYetAvailable and keep going.
    std::thread::sleep(SETTLE);
    assert!(events.lock().unwrap().is_empty());

    let mut producer = FrameProducer::create(channel_id).expect("producer should create");
    assert!(producer.publish(16, 16, 5, &[7u8; 768]).unwrap());

    assert!(wait_for(|| !events.lock().unwrap().is_empty()));
    engine.shutdown().expect("shutdown should succeed");

    assert_eq!(events.lock().unwrap()[0].timestamp, 5);
}

#[test]
fn failing_stage_skips_frame_and_polling_continues() {
    let channel_id = unique_channel_id();
    let mut producer = FrameProducer::create(channel_id).expect("producer should create");

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut failed_once = false;
    let stage = move |_frame: &shmframe::codec::FrameSnapshot| -> Result<DetectionResult, shmframe::DetectionError> {
        if !failed_once {
            failed_once = true;
            return Err("synthetic stage failure".into());
        }
        Ok(DetectionResult::from_nodes(vec![vec![Roi { x: 1, y: 2 }]]))
    };

    let mut engine = Engine::new(stage).with_interval(TICK);
    engine.register_callback(capturing_sink(events.clone()));
    engine.apply_settings(settings()).expect("settings should apply");
    engine.initialize(channel_id).expect("engine should start");

    // First frame hits the failure path and is skipped without dispatch.
    assert!(producer.publish(4, 4, 1, &[1u8; 48]).unwrap());
    assert!(wait_for(|| producer.publish(4, 4, 2, &[2u8; 48]).unwrap()));

    assert!(wait_for(|| !events.lock().unwrap().is_empty()));
    engine.shutdown().expect("shutdown should succeed");

    let captured = events.lock().unwrap();
    assert_eq!(captured[0].timestamp, 2);
}
