// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Detector adapters over the loopback graph.

mod common;

use std::sync::Arc;
use std::time::Duration;

use handlink::core::Clock;
use handlink::exchange::detect_bgr;
use handlink::pipeline::{
    GL_DEFAULT_ALIGNMENT_BOUNDARY, GraphConfig, ImageFormat, LoopbackGraph, Packet, Payload,
    Timestamp, VisionGraph, color,
};
use handlink::{Backend, Detector, HandlinkConfig, HandlinkError, LandmarkDetector, MonotonicClock};

use common::{graph_for, ramp_coordinates, test_image};

struct FrozenClock(i64);

impl Clock for FrozenClock {
    fn now_us(&self) -> i64 {
        self.0
    }

    fn description(&self) -> &str {
        "Frozen Clock"
    }
}

fn detector(backend: Backend, graph_source: &str) -> Detector {
    let config = HandlinkConfig {
        backend,
        ..Default::default()
    };
    Detector::new(
        backend,
        Box::new(LoopbackGraph::new()),
        graph_source,
        &config,
        Arc::new(MonotonicClock::new()),
    )
    .expect("detector")
}

#[test]
fn test_cpu_detect_echoes_image() {
    let image = test_image(37, 11);
    let mut detector = detector(Backend::Cpu, graph_for(Backend::Cpu));

    let detection = detect_bgr(&mut detector, &image.as_view()).expect("detect");
    assert_eq!(detection.image, image);
    assert_eq!(detection.coordinates(21), ramp_coordinates(21));
    detector.finish().expect("finish");
}

#[test]
fn test_gpu_detect_echoes_image() {
    let image = test_image(603, 621);
    let mut detector = detector(Backend::Gpu, graph_for(Backend::Gpu));
    assert_eq!(detector.backend(), Backend::Gpu);

    let detection = detect_bgr(&mut detector, &image.as_view()).expect("detect");
    assert_eq!(detection.image, image);
    assert_eq!(detection.coordinates(21), ramp_coordinates(21));
}

#[test]
fn test_gpu_detector_with_rgb_input() {
    let image = test_image(9, 4);
    let rgb = color::convert(&image.as_view(), ImageFormat::Srgb, GL_DEFAULT_ALIGNMENT_BOUNDARY)
        .expect("convert");
    let mut detector = detector(Backend::Gpu, graph_for(Backend::Gpu));

    let output = detector.detect(&rgb).expect("detect");
    assert_eq!(output, image);
}

#[test]
fn test_landmarks_tagged_with_frame_timestamp() {
    let image = test_image(4, 4);
    let mut detector = detector(Backend::Cpu, graph_for(Backend::Cpu));

    let first = detect_bgr(&mut detector, &image.as_view()).expect("first");
    let second = detect_bgr(&mut detector, &image.as_view()).expect("second");

    assert!(second.timestamp > first.timestamp);
    assert_eq!(first.landmarks.expect("landmarks").timestamp, first.timestamp);
    assert_eq!(second.landmarks.expect("landmarks").timestamp, second.timestamp);
    assert_eq!(detector.last_timestamp(), Some(second.timestamp));
}

#[test]
fn test_frozen_clock_still_feeds_increasing_timestamps() {
    let graph = LoopbackGraph::new();
    let stats = graph.stats();
    let mut detector = Detector::new(
        Backend::Cpu,
        Box::new(graph),
        graph_for(Backend::Cpu),
        &HandlinkConfig::default(),
        Arc::new(FrozenClock(42)),
    )
    .expect("detector");

    let image = test_image(3, 3);
    for _ in 0..3 {
        detect_bgr(&mut detector, &image.as_view()).expect("detect");
    }
    detector.finish().expect("finish");

    assert_eq!(
        stats.accepted(),
        vec![
            Timestamp::from_micros(42),
            Timestamp::from_micros(43),
            Timestamp::from_micros(44)
        ]
    );
    assert!(stats.rejected().is_empty());
}

#[test]
fn test_graph_records_non_increasing_timestamp() {
    let mut graph = LoopbackGraph::new();
    let stats = graph.stats();
    let config = GraphConfig::parse(graph_for(Backend::Cpu)).expect("parse");
    graph.initialize(&config).expect("initialize");
    let poller = graph.add_output_stream_poller("output_video").expect("poller");
    graph.start_run().expect("start");

    let frame = color::convert(&test_image(2, 2).as_view(), ImageFormat::Srgba, 4).expect("convert");
    let packet = Packet::new(Payload::ImageFrame(frame), Timestamp::from_micros(100));

    graph
        .add_packet_to_input_stream("input_video", packet.clone())
        .expect("first packet");
    let err = graph
        .add_packet_to_input_stream("input_video", packet.at(Timestamp::from_micros(100)))
        .expect_err("repeated timestamp");
    assert!(matches!(err, HandlinkError::Graph(_)));
    assert_eq!(stats.rejected(), vec![Timestamp::from_micros(100)]);

    poller.next().expect("echo of the accepted packet");
    graph.close_input_stream("input_video").expect("close");
    graph.wait_until_done().expect("drain");
    assert_eq!(stats.processed(), 1);
}

#[test]
fn test_drain_before_teardown_keeps_outputs_and_late_landmarks() {
    let source = format!("{}\nlandmark_delay_ms: 50\n", graph_for(Backend::Cpu));
    let config = HandlinkConfig {
        landmark_wait_ms: 0,
        ..Default::default()
    };
    let graph = LoopbackGraph::new();
    let stats = graph.stats();
    let mut detector = Detector::new(
        Backend::Cpu,
        Box::new(graph),
        &source,
        &config,
        Arc::new(MonotonicClock::new()),
    )
    .expect("detector");

    let image = test_image(5, 5);
    let rgba = color::convert(&image.as_view(), ImageFormat::Srgba, 4).expect("convert");
    let outputs: Vec<_> = (0..3)
        .map(|_| detector.detect(&rgba).expect("detect"))
        .collect();
    assert_eq!(outputs.len(), 3);
    assert!(outputs.iter().all(|output| *output == image));

    let last = detector.last_timestamp().expect("timestamp");
    detector.finish().expect("finish");
    assert_eq!(stats.processed(), 3);
    assert_eq!(detector.landmarks().expect("late landmarks").timestamp, last);

    detector.finish().expect("finish is idempotent");
}

#[test]
fn test_drop_with_pending_landmarks_does_not_hang() {
    let source = format!("{}\nlandmark_delay_ms: 20\n", graph_for(Backend::Cpu));
    let graph = LoopbackGraph::new();
    let stats = graph.stats();
    let mut detector = Detector::new(
        Backend::Cpu,
        Box::new(graph),
        &source,
        &HandlinkConfig::default(),
        Arc::new(MonotonicClock::new()),
    )
    .expect("detector");

    let rgba = color::convert(&test_image(2, 2).as_view(), ImageFormat::Srgba, 4).expect("convert");
    detector.detect(&rgba).expect("detect");
    drop(detector);
    assert_eq!(stats.processed(), 1);
}

#[test]
fn test_no_landmarks_leaves_zero_coordinates() {
    let source = format!("{}\nemit_landmarks: false\n", graph_for(Backend::Cpu));
    let config = HandlinkConfig {
        landmark_wait_ms: 20,
        ..Default::default()
    };
    let mut detector = Detector::new(
        Backend::Cpu,
        Box::new(LoopbackGraph::new()),
        &source,
        &config,
        Arc::new(MonotonicClock::new()),
    )
    .expect("detector");

    let detection = detect_bgr(&mut detector, &test_image(3, 2).as_view()).expect("detect");
    assert!(detection.landmarks.is_none());
    assert_eq!(detection.coordinates(21), vec![0.0; 42]);
}

#[test]
fn test_extra_hands_use_first() {
    let source = format!(
        "{}\nhands: 2\nlandmark {{ x: 0.5 y: 0.75 }}\n",
        graph_for(Backend::Cpu)
    );
    let mut detector = detector(Backend::Cpu, &source);
    let detection = detect_bgr(&mut detector, &test_image(2, 2).as_view()).expect("detect");

    let landmarks = detection.landmarks.clone().expect("landmarks");
    assert_eq!(landmarks.hands.len(), 2);
    let mut expected = vec![0.0; 42];
    expected[0] = 0.5;
    expected[1] = 0.75;
    assert_eq!(detection.coordinates(21), expected);
}

#[test]
fn test_malformed_config_is_parse_error() {
    let result = Detector::new(
        Backend::Cpu,
        Box::new(LoopbackGraph::new()),
        "input_stream: \"input_video\"\nnode {",
        &HandlinkConfig::default(),
        Arc::new(MonotonicClock::new()),
    );
    assert!(matches!(result, Err(HandlinkError::ConfigParse(_))));
}

#[test]
fn test_missing_stream_is_init_error() {
    let result = Detector::new(
        Backend::Cpu,
        Box::new(LoopbackGraph::new()),
        "output_stream: \"output_video\"",
        &HandlinkConfig::default(),
        Arc::new(MonotonicClock::new()),
    );
    assert!(matches!(result, Err(HandlinkError::GraphInit(_))));
}

#[test]
fn test_landmark_stream_mismatch_is_init_error() {
    // The GPU backend observes "hand_landmarks"; the CPU graph only emits "landmarks".
    let result = Detector::new(
        Backend::Gpu,
        Box::new(LoopbackGraph::new()),
        graph_for(Backend::Cpu),
        &HandlinkConfig {
            backend: Backend::Gpu,
            ..Default::default()
        },
        Arc::new(MonotonicClock::new()),
    );
    assert!(matches!(result, Err(HandlinkError::GraphInit(_))));
}

#[test]
fn test_landmark_wait_bound() {
    let detector = detector(Backend::Cpu, graph_for(Backend::Cpu));
    assert_eq!(detector.landmark_wait(), Duration::from_millis(500));
}
