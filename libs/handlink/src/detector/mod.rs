// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Synchronous per-frame detection over an asynchronous graph.
//!
//! The graph delivers output images through a poller and landmarks through
//! an observer callback on its own thread. `detect` blocks on the poller
//! only; landmarks land in a [`LandmarkSlot`] tagged with the frame
//! timestamp, so a caller that needs them for the same frame waits on the
//! slot with [`LandmarkDetector::detect_with_landmarks`].

mod cpu;
mod gpu;
mod landmark_slot;
mod landmarks;
mod session;

use std::sync::Arc;
use std::time::Duration;

pub use cpu::CpuDetector;
pub use gpu::GpuDetector;
pub use landmark_slot::LandmarkSlot;
pub use landmarks::LandmarkSet;
pub use session::GraphSession;

use crate::core::{Backend, Clock, HandlinkConfig, HandlinkError, Result};
use crate::pipeline::{ImageFrame, Timestamp, VisionGraph};

/// Result of one frame with its landmarks, if they arrived in time.
#[derive(Debug, Clone)]
pub struct Detection {
    pub timestamp: Timestamp,
    /// Graph output converted to BGR with packed rows.
    pub image: ImageFrame,
    pub landmarks: Option<LandmarkSet>,
}

impl Detection {
    /// Coordinate block contents for this frame; zeros when no hand was seen.
    pub fn coordinates(&self, num_landmarks: usize) -> Vec<f32> {
        self.landmarks
            .as_ref()
            .map(|set| set.flatten(num_landmarks))
            .unwrap_or_else(|| vec![0.0; num_landmarks * 2])
    }
}

pub trait LandmarkDetector {
    /// Run one frame through the graph and return its output image as BGR.
    ///
    /// Blocks until the graph emits an output image, without a timeout.
    /// Landmarks for the frame may arrive before or after this returns.
    fn detect(&mut self, image: &ImageFrame) -> Result<ImageFrame>;

    fn landmark_slot(&self) -> &Arc<LandmarkSlot>;

    /// Timestamp of the most recent frame sent to the graph.
    fn last_timestamp(&self) -> Option<Timestamp>;

    /// How long `detect_with_landmarks` waits for the observer.
    fn landmark_wait(&self) -> Duration;

    /// Wait until the graph has processed every frame sent so far, keeping
    /// the input open for more.
    fn wait_until_idle(&mut self) -> Result<()>;

    /// Close the graph input and wait for the graph to drain.
    fn finish(&mut self) -> Result<()>;

    /// Latest landmark set observed, for whichever frame it belongs to.
    fn landmarks(&self) -> Option<LandmarkSet> {
        self.landmark_slot().latest()
    }

    /// [`detect`](Self::detect), then wait for the landmarks of the same frame.
    fn detect_with_landmarks(&mut self, image: &ImageFrame) -> Result<Detection> {
        let output = self.detect(image)?;
        let timestamp = self
            .last_timestamp()
            .ok_or_else(|| HandlinkError::Graph("no frame was sent".to_string()))?;
        let landmarks = self
            .landmark_slot()
            .wait_for(timestamp, self.landmark_wait());
        if landmarks.is_none() {
            tracing::debug!("No landmarks for frame at {}", timestamp);
        }

        Ok(Detection {
            timestamp,
            image: output,
            landmarks,
        })
    }
}

/// Detector variant chosen at run time.
pub enum Detector {
    Cpu(CpuDetector),
    Gpu(GpuDetector),
}

impl Detector {
    pub fn new(
        backend: Backend,
        graph: Box<dyn VisionGraph>,
        source: &str,
        config: &HandlinkConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        tracing::info!("Initializing {} detector", backend);
        Ok(match backend {
            Backend::Cpu => Self::Cpu(CpuDetector::initialize(graph, source, config, clock)?),
            Backend::Gpu => Self::Gpu(GpuDetector::initialize(graph, source, config, clock)?),
        })
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Cpu(_) => Backend::Cpu,
            Self::Gpu(_) => Backend::Gpu,
        }
    }

    fn inner(&self) -> &dyn LandmarkDetector {
        match self {
            Self::Cpu(d) => d,
            Self::Gpu(d) => d,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn LandmarkDetector {
        match self {
            Self::Cpu(d) => d,
            Self::Gpu(d) => d,
        }
    }
}

impl LandmarkDetector for Detector {
    fn detect(&mut self, image: &ImageFrame) -> Result<ImageFrame> {
        self.inner_mut().detect(image)
    }

    fn landmark_slot(&self) -> &Arc<LandmarkSlot> {
        self.inner().landmark_slot()
    }

    fn last_timestamp(&self) -> Option<Timestamp> {
        self.inner().last_timestamp()
    }

    fn landmark_wait(&self) -> Duration {
        self.inner().landmark_wait()
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        self.inner_mut().wait_until_idle()
    }

    fn finish(&mut self) -> Result<()> {
        self.inner_mut().finish()
    }
}
