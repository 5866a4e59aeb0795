// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! One graph run as seen from a detector: a poller on the image output, an
//! observer on the landmark output, and a timestamped input stream.

use std::sync::Arc;

use super::{LandmarkSet, LandmarkSlot};
use crate::core::{Clock, FrameTimestamper, HandlinkConfig, HandlinkError, Result};
use crate::gpu::GpuResources;
use crate::pipeline::{OutputStreamPoller, Packet, Payload, Timestamp, VisionGraph};

pub struct GraphSession {
    graph: Box<dyn VisionGraph>,
    poller: OutputStreamPoller,
    slot: Arc<LandmarkSlot>,
    input_stream: String,
    timestamper: FrameTimestamper,
    finished: bool,
}

fn init_error(e: HandlinkError) -> HandlinkError {
    match e {
        HandlinkError::GraphInit(_) => e,
        other => HandlinkError::GraphInit(other.to_string()),
    }
}

impl GraphSession {
    /// Parse `source`, initialize `graph`, attach streams and start it.
    ///
    /// GPU resources, when given, are attached once, before the run starts.
    pub fn start(
        mut graph: Box<dyn VisionGraph>,
        source: &str,
        config: &HandlinkConfig,
        clock: Arc<dyn Clock>,
        gpu_resources: Option<Arc<GpuResources>>,
    ) -> Result<Self> {
        let parsed = graph.parse_config(source)?;
        graph.initialize(&parsed).map_err(init_error)?;
        if let Some(resources) = gpu_resources {
            graph.set_gpu_resources(resources).map_err(init_error)?;
        }

        let poller = graph
            .add_output_stream_poller(&config.output_stream)
            .map_err(init_error)?;

        let slot = Arc::new(LandmarkSlot::new());
        let sink = Arc::clone(&slot);
        graph
            .observe_output_stream(
                config.landmark_stream(),
                Box::new(move |packet: &Packet| {
                    sink.publish(LandmarkSet::from_packet(packet)?);
                    Ok(())
                }),
            )
            .map_err(init_error)?;

        graph.start_run().map_err(init_error)?;
        tracing::info!(
            "Graph running: '{}' -> '{}' + '{}' (clock: {})",
            config.input_stream,
            config.output_stream,
            config.landmark_stream(),
            clock.description()
        );

        Ok(Self {
            graph,
            poller,
            slot,
            input_stream: config.input_stream.clone(),
            timestamper: FrameTimestamper::new(clock),
            finished: false,
        })
    }

    /// Push one payload under the next timestamp. The timestamp counts as
    /// used only once the graph has accepted the packet.
    pub fn send(&mut self, payload: Payload) -> Result<Timestamp> {
        let timestamp = self.timestamper.peek();
        self.graph
            .add_packet_to_input_stream(&self.input_stream, Packet::new(payload, timestamp))?;
        self.timestamper.commit(timestamp);
        Ok(timestamp)
    }

    /// Block for the next output image. No timeout.
    pub fn next_output(&self) -> Result<Packet> {
        self.poller.next()
    }

    pub fn slot(&self) -> &Arc<LandmarkSlot> {
        &self.slot
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.timestamper.last()
    }

    /// Wait until the graph has worked through every frame sent so far.
    pub fn wait_until_idle(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.graph.wait_until_idle()
    }

    /// Close the input stream and wait for the graph to drain. Idempotent.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.graph.close_input_stream(&self.input_stream)?;
        self.graph.wait_until_done()?;
        tracing::info!("Graph drained");
        Ok(())
    }
}

impl Drop for GraphSession {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!("Graph did not shut down cleanly: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MonotonicClock;
    use crate::pipeline::{ImageFormat, ImageFrame, LoopbackGraph};

    const GRAPH: &str = r#"
input_stream: "input_video"
output_stream: "output_video"
landmark_stream: "landmarks"
"#;

    fn session() -> GraphSession {
        GraphSession::start(
            Box::new(LoopbackGraph::new()),
            GRAPH,
            &HandlinkConfig::default(),
            Arc::new(MonotonicClock::new()),
            None,
        )
        .unwrap()
    }

    fn frame() -> Payload {
        Payload::ImageFrame(ImageFrame::from_packed(ImageFormat::Srgba, 1, 1, vec![0; 4]).unwrap())
    }

    #[test]
    fn test_rejected_packet_keeps_last_timestamp() {
        let mut session = session();
        assert!(session.send(Payload::Landmarks(Vec::new())).is_err());
        assert_eq!(session.last_timestamp(), None);

        let sent = session.send(frame()).unwrap();
        assert_eq!(session.last_timestamp(), Some(sent));

        assert!(session.send(Payload::Landmarks(Vec::new())).is_err());
        assert_eq!(session.last_timestamp(), Some(sent));
        assert_eq!(session.next_output().unwrap().timestamp(), sent);
        session.finish().unwrap();
    }

    #[test]
    fn test_wait_until_idle_then_finish() {
        let mut session = session();
        let sent = session.send(frame()).unwrap();
        session.wait_until_idle().unwrap();
        assert_eq!(session.slot().latest().map(|set| set.timestamp), Some(sent));

        session.finish().unwrap();
        session.wait_until_idle().unwrap();
    }
}
