// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;
use std::time::Duration;

use super::{GraphSession, LandmarkDetector, LandmarkSlot};
use crate::core::{Clock, HandlinkConfig, Result};
use crate::gpu::{GlHelper, GpuResources, image_format_for_gpu_buffer_format};
use crate::pipeline::{
    GL_DEFAULT_ALIGNMENT_BOUNDARY, ImageFormat, ImageFrame, Payload, Timestamp, VisionGraph, color,
};

/// Detector that round-trips frames through textures on the graph's GL
/// context.
pub struct GpuDetector {
    session: GraphSession,
    gl: GlHelper,
    landmark_wait: Duration,
}

impl GpuDetector {
    pub fn initialize(
        graph: Box<dyn VisionGraph>,
        source: &str,
        config: &HandlinkConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let resources = GpuResources::create()?;
        let session = GraphSession::start(graph, source, config, clock, Some(Arc::clone(&resources)))?;
        let mut gl = GlHelper::new();
        gl.initialize(resources);

        Ok(Self {
            session,
            gl,
            landmark_wait: config.landmark_wait(),
        })
    }
}

impl LandmarkDetector for GpuDetector {
    fn detect(&mut self, image: &ImageFrame) -> Result<ImageFrame> {
        let input = ImageFrame::from_view(&image.as_view(), GL_DEFAULT_ALIGNMENT_BOUNDARY)?;
        let buffer = self.gl.run_in_gl_context(|gl| {
            let texture = gl.create_source_texture(&input)?;
            let buffer = texture.get_frame();
            texture.release();
            gl.flush();
            Ok(buffer)
        })?;
        self.session.send(Payload::GpuBuffer(buffer))?;

        let packet = self.session.next_output()?;
        let output = packet.gpu_buffer()?;
        let frame = self.gl.run_in_gl_context(|gl| {
            let texture = gl.create_source_texture_from_buffer(output);
            let mut frame = ImageFrame::new(
                image_format_for_gpu_buffer_format(output.format()),
                texture.width(),
                texture.height(),
                GL_DEFAULT_ALIGNMENT_BOUNDARY,
            )?;
            gl.bind_framebuffer(&texture);
            gl.read_pixels(&mut frame)?;
            texture.release();
            Ok(frame)
        })?;

        color::convert(&frame.as_view(), ImageFormat::Bgr, 1)
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
