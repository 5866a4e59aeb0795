// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use super::{GraphConfig, OutputStreamPoller, Packet};
use crate::core::Result;
use crate::gpu::GpuResources;

/// Push-based handler for one output stream, run on the graph's own thread.
///
/// An error returned here stops the graph; it surfaces from
/// [`VisionGraph::wait_until_done`].
pub type ObserverCallback = Box<dyn Fn(&Packet) -> Result<()> + Send + Sync>;

/// The vision pipeline seen from the detector.
///
/// Call order is `initialize`, optionally `set_gpu_resources`, poller and
/// observer registration, `start_run`, any number of
/// `add_packet_to_input_stream` (with `wait_until_idle` in between as
/// needed), then `close_input_stream` and `wait_until_done`.
pub trait VisionGraph: Send {
    /// Parse configuration text into the graph's configuration form.
    fn parse_config(&self, source: &str) -> Result<GraphConfig> {
        GraphConfig::parse(source)
    }

    fn initialize(&mut self, config: &GraphConfig) -> Result<()>;

    /// Attach the graphics context. Allowed once, before `start_run`.
    fn set_gpu_resources(&mut self, resources: Arc<GpuResources>) -> Result<()>;

    fn add_output_stream_poller(&mut self, stream: &str) -> Result<OutputStreamPoller>;

    fn observe_output_stream(&mut self, stream: &str, callback: ObserverCallback) -> Result<()>;

    fn start_run(&mut self) -> Result<()>;

    /// Queue a packet. Timestamps must strictly increase per stream.
    fn add_packet_to_input_stream(&mut self, stream: &str, packet: Packet) -> Result<()>;

    /// Block until every packet queued so far has been processed and its
    /// outputs delivered. The input stream stays open.
    fn wait_until_idle(&mut self) -> Result<()>;

    /// Signal end of input. Idempotent.
    fn close_input_stream(&mut self, stream: &str) -> Result<()>;

    /// Block until every queued packet has been processed and delivered.
    fn wait_until_done(&mut self) -> Result<()>;
}
