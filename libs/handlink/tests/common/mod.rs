// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use handlink::pipeline::loopback::ramp_landmarks;
use handlink::pipeline::{ImageFormat, ImageFrame};
use handlink::{Backend, HandlinkConfig};

pub const CPU_GRAPH: &str = r#"
# Loopback stand-in for the hand tracking CPU graph
input_stream: "input_video"
output_stream: "output_video"
landmark_stream: "landmarks"
"#;

pub const GPU_GRAPH: &str = r#"
input_stream: "input_video"
output_stream: "output_video"
landmark_stream: "hand_landmarks"
"#;

pub fn graph_for(backend: Backend) -> &'static str {
    match backend {
        Backend::Cpu => CPU_GRAPH,
        Backend::Gpu => GPU_GRAPH,
    }
}

pub fn unique_region(tag: &str) -> String {
    format!("handlink-test-{}-{}", tag, std::process::id())
}

pub fn config(region_name: &str, backend: Backend) -> HandlinkConfig {
    HandlinkConfig {
        region_name: region_name.to_string(),
        backend,
        ..Default::default()
    }
}

/// Deterministic packed BGR test pattern.
pub fn test_image(width: u32, height: u32) -> ImageFrame {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x % 256) as u8);
            pixels.push((y % 256) as u8);
            pixels.push(((x * 7 + y * 13) % 251) as u8);
        }
    }
    ImageFrame::from_packed(ImageFormat::Bgr, width, height, pixels).expect("test image")
}

/// The loopback graph's default landmarks, flattened.
pub fn ramp_coordinates(count: usize) -> Vec<f32> {
    ramp_landmarks(count)
        .iter()
        .flat_map(|landmark| [landmark.x, landmark.y])
        .collect()
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

pub fn write_settings(dir: &Path, config: &HandlinkConfig) -> PathBuf {
    let yaml = serde_yaml::to_string(config).expect("serialize settings");
    write_file(dir, "handlink.yaml", &yaml)
}
