// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Producer and consumer roles of one image/landmark exchange.
//!
//! The producer writes the image into the shared region, runs the consumer
//! to completion and reads the results back. Process exit is the only
//! ordering between the two: the producer touches the region again only
//! after the consumer has exited.

mod consumer;
mod image_io;
mod in_process;
mod producer;

pub use consumer::{detect_bgr, run_consumer, settle_landmarks};
pub use image_io::{load_image, save_image};
pub use in_process::{InProcessExchange, run_in_process};
pub use producer::run_producer;

use crate::pipeline::ImageFrame;

/// What the producer gets back from one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeReport {
    /// Flattened `[x0, y0, x1, y1, ...]` of the first hand.
    pub coordinates: Vec<f32>,
    /// Graph output, packed BGR.
    pub output_image: ImageFrame,
}

impl ExchangeReport {
    pub fn points(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.coordinates.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// One `Landmark i: x=.. y=..` line per point.
    pub fn landmark_lines(&self) -> Vec<String> {
        self.points()
            .enumerate()
            .map(|(i, (x, y))| format!("Landmark {}: x={} y={}", i, x, y))
            .collect()
    }
}
