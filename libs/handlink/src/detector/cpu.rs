// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;
use std::time::Duration;

use super::{GraphSession, LandmarkDetector, LandmarkSlot};
use crate::core::{Clock, HandlinkConfig, Result};
use crate::pipeline::{
    GL_DEFAULT_ALIGNMENT_BOUNDARY, ImageFormat, ImageFrame, Payload, Timestamp, VisionGraph, color,
};

/// Detector that hands plain pixel buffers to the graph.
pub struct CpuDetector {
    session: GraphSession,
    landmark_wait: Duration,
}

impl CpuDetector {
    pub fn initialize(
        graph: Box<dyn VisionGraph>,
        source: &str,
        config: &HandlinkConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let session = GraphSession::start(graph, source, config, clock, None)?;
        Ok(Self {
            session,
            landmark_wait: config.landmark_wait(),
        })
    }
}

impl LandmarkDetector for CpuDetector {
    fn detect(&mut self, image: &ImageFrame) -> Result<ImageFrame> {
        let input = ImageFrame::from_view(&image.as_view(), GL_DEFAULT_ALIGNMENT_BOUNDARY)?;
        let timestamp = self.session.send(Payload::ImageFrame(input))?;

        let packet = self.session.next_output()?;
        if packet.timestamp() != timestamp {
            tracing::debug!(
                "Output at {} answers input at {}",
                packet.timestamp(),
                timestamp
            );
        }
        let output = packet.image_frame()?;
        color::convert(&output.as_view(), ImageFormat::Bgr, 1)
    }

    fn landmark_slot(&self) -> &Arc<LandmarkSlot> {
        self.session.slot()
    }

    fn last_timestamp(&self) -> Option<Timestamp> {
        self.session.last_timestamp()
    }

    fn landmark_wait(&self) -> Duration {
        self.landmark_wait
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        self.session.wait_until_idle()
    }

    fn finish(&mut self) -> Result<()> {
        self.session.finish()
    }
}
