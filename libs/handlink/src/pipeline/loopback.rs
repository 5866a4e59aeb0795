// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-process graph that echoes frames and emits a configured landmark list.
//!
//! Recognized configuration keys:
//!
//! | key | default | |
//! |---|---|---|
//! | `input_stream` | required | |
//! | `output_stream` | required | image echo |
//! | `landmark_stream` | none | no landmarks are emitted without it |
//! | `emit_landmarks` | `true` | |
//! | `num_landmarks` | `21` | size of the default ramp |
//! | `landmark { x y z }` | ramp | repeated; replaces the ramp |
//! | `hands` | `1` | copies of the list per frame |
//! | `landmark_delay_ms` | `0` | delay before landmarks are delivered |

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use handlink_ipc_types::DEFAULT_NUM_LANDMARKS;
use parking_lot::{Condvar, Mutex};

use super::{
    ConfigBlock, GraphConfig, NormalizedLandmark, NormalizedLandmarkList, ObserverCallback,
    OutputStreamPoller, Packet, Payload, Timestamp, VisionGraph,
};
use crate::core::{HandlinkError, Result};
use crate::gpu::GpuResources;

/// Default landmark list: point `i` sits at `(0.1 * (i + 1), 0.1 * (i + 1))`.
pub fn ramp_landmarks(count: usize) -> NormalizedLandmarkList {
    (0..count)
        .map(|i| {
            let v = 0.1 * (i as f32 + 1.0);
            NormalizedLandmark::new(v, v, 0.0)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopbackSettings {
    pub input_stream: String,
    pub output_stream: String,
    pub landmark_stream: Option<String>,
    pub emit_landmarks: bool,
    pub landmarks: NormalizedLandmarkList,
    pub hands: usize,
    pub landmark_delay: Duration,
}

impl LoopbackSettings {
    pub fn from_config(config: &GraphConfig) -> Result<Self> {
        let root = config.root();
        let required = |key: &str| {
            root.scalar(key).map(str::to_string).ok_or_else(|| {
                HandlinkError::GraphInit(format!("graph config has no '{}'", key))
            })
        };

        let input_stream = required("input_stream")?;
        let output_stream = required("output_stream")?;
        let num_landmarks = root
            .parse_scalar::<usize>("num_landmarks")?
            .unwrap_or(DEFAULT_NUM_LANDMARKS);

        let listed = root
            .blocks("landmark")
            .map(parse_landmark)
            .collect::<Result<NormalizedLandmarkList>>()?;
        let landmarks = if listed.is_empty() {
            ramp_landmarks(num_landmarks)
        } else {
            listed
        };

        Ok(Self {
            input_stream,
            output_stream,
            landmark_stream: root.scalar("landmark_stream").map(str::to_string),
            emit_landmarks: root.parse_scalar::<bool>("emit_landmarks")?.unwrap_or(true),
            landmarks,
            hands: root.parse_scalar::<usize>("hands")?.unwrap_or(1),
            landmark_delay: Duration::from_millis(
                root.parse_scalar::<u64>("landmark_delay_ms")?.unwrap_or(0),
            ),
        })
    }

    fn outputs(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.output_stream.as_str()).chain(self.landmark_stream.as_deref())
    }
}

fn parse_landmark(block: &ConfigBlock) -> Result<NormalizedLandmark> {
    Ok(NormalizedLandmark::new(
        block.parse_scalar("x")?.unwrap_or(0.0),
        block.parse_scalar("y")?.unwrap_or(0.0),
        block.parse_scalar("z")?.unwrap_or(0.0),
    ))
}

/// Counters shared between a [`LoopbackGraph`] and whoever holds a handle.
#[derive(Debug, Default)]
pub struct LoopbackStats {
    accepted: Mutex<Vec<Timestamp>>,
    rejected: Mutex<Vec<Timestamp>>,
    progress: Mutex<Progress>,
    progressed: Condvar,
}

#[derive(Debug, Default)]
struct Progress {
    processed: u64,
    stopped: bool,
}

impl LoopbackStats {
    /// Timestamps of packets queued into the input stream.
    pub fn accepted(&self) -> Vec<Timestamp> {
        self.accepted.lock().clone()
    }

    /// Timestamps refused for not increasing.
    pub fn rejected(&self) -> Vec<Timestamp> {
        self.rejected.lock().clone()
    }

    pub fn processed(&self) -> u64 {
        self.progress.lock().processed
    }

    fn mark_processed(&self) {
        self.progress.lock().processed += 1;
        self.progressed.notify_all();
    }

    fn mark_stopped(&self) {
        self.progress.lock().stopped = true;
        self.progressed.notify_all();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphState {
    Created,
    Initialized,
    Running,
    Closed,
    Done,
}

type Routes = HashMap<String, Vec<Sender<Packet>>>;
type Observers = HashMap<String, Vec<ObserverCallback>>;

pub struct LoopbackGraph {
    state: GraphState,
    settings: Option<LoopbackSettings>,
    gpu_resources: Option<Arc<GpuResources>>,
    pollers: Routes,
    observers: Observers,
    input: Option<Sender<Packet>>,
    last_input: Option<Timestamp>,
    worker: Option<JoinHandle<Result<()>>>,
    stats: Arc<LoopbackStats>,
}

impl LoopbackGraph {
    pub fn new() -> Self {
        Self {
            state: GraphState::Created,
            settings: None,
            gpu_resources: None,
            pollers: HashMap::new(),
            observers: HashMap::new(),
            input: None,
            last_input: None,
            worker: None,
            stats: Arc::new(LoopbackStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<LoopbackStats> {
        Arc::clone(&self.stats)
    }

    pub fn settings(&self) -> Option<&LoopbackSettings> {
        self.settings.as_ref()
    }

    fn configured(&self, stream: &str) -> Result<&LoopbackSettings> {
        let settings = match (self.state, &self.settings) {
            (GraphState::Initialized, Some(settings)) => settings,
            (state, _) => {
                return Err(HandlinkError::GraphInit(format!(
                    "cannot attach to '{}' while graph is {:?}",
                    stream, state
                )));
            }
        };
        if !settings.outputs().any(|s| s == stream) {
            return Err(HandlinkError::GraphInit(format!(
                "graph has no output stream '{}'",
                stream
            )));
        }
        Ok(settings)
    }

    fn join_worker(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker
            .join()
            .map_err(|_| HandlinkError::Graph("loopback worker panicked".to_string()))?
    }
}

impl Default for LoopbackGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionGraph for LoopbackGraph {
    fn initialize(&mut self, config: &GraphConfig) -> Result<()> {
        if self.state != GraphState::Created {
            return Err(HandlinkError::GraphInit("graph already initialized".to_string()));
        }
        let settings = LoopbackSettings::from_config(config).map_err(|e| match e {
            HandlinkError::GraphInit(msg) => HandlinkError::GraphInit(msg),
            other => HandlinkError::GraphInit(other.to_string()),
        })?;
        tracing::debug!(
            "Loopback graph: {} -> {} (+{:?}), {} landmarks",
            settings.input_stream,
            settings.output_stream,
            settings.landmark_stream,
            settings.landmarks.len()
        );
        self.settings = Some(settings);
        self.state = GraphState::Initialized;
        Ok(())
    }

    fn set_gpu_resources(&mut self, resources: Arc<GpuResources>) -> Result<()> {
        if self.gpu_resources.is_some() {
            return Err(HandlinkError::GraphInit("GPU resources already attached".to_string()));
        }
        if !matches!(self.state, GraphState::Created | GraphState::Initialized) {
            return Err(HandlinkError::GraphInit(format!(
                "cannot attach GPU resources while graph is {:?}",
                self.state
            )));
        }
        self.gpu_resources = Some(resources);
        Ok(())
    }

    fn add_output_stream_poller(&mut self, stream: &str) -> Result<OutputStreamPoller> {
        self.configured(stream)?;
        let (tx, rx) = crossbeam_channel::unbounded();
        self.pollers.entry(stream.to_string()).or_default().push(tx);
        Ok(OutputStreamPoller::new(stream, rx))
    }

    fn observe_output_stream(&mut self, stream: &str, callback: ObserverCallback) -> Result<()> {
        self.configured(stream)?;
        self.observers
            .entry(stream.to_string())
            .or_default()
            .push(callback);
        Ok(())
    }

    fn start_run(&mut self) -> Result<()> {
        let settings = match (self.state, &self.settings) {
            (GraphState::Initialized, Some(settings)) => settings.clone(),
            (state, _) => {
                return Err(HandlinkError::GraphInit(format!(
                    "cannot start graph while {:?}",
                    state
                )));
            }
        };

        let (tx, rx) = crossbeam_channel::unbounded();
        let pollers = std::mem::take(&mut self.pollers);
        let observers = std::mem::take(&mut self.observers);
        let stats = Arc::clone(&self.stats);

        let worker = std::thread::Builder::new()
            .name("handlink-loopback".to_string())
            .spawn(move || {
                let result = run_worker(settings, rx, pollers, observers, &stats);
                stats.mark_stopped();
                result
            })
            .map_err(|e| HandlinkError::GraphInit(format!("failed to spawn graph worker: {}", e)))?;

        self.input = Some(tx);
        self.worker = Some(worker);
        self.state = GraphState::Running;
        tracing::info!("Loopback graph started");
        Ok(())
    }

    fn add_packet_to_input_stream(&mut self, stream: &str, packet: Packet) -> Result<()> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| HandlinkError::Graph("graph not initialized".to_string()))?;
        if stream != settings.input_stream {
            return Err(HandlinkError::Graph(format!("no input stream named '{}'", stream)));
        }

        let timestamp = packet.timestamp();
        if let Some(last) = self.last_input {
            if timestamp <= last {
                self.stats.rejected.lock().push(timestamp);
                tracing::warn!(
                    "Rejected packet on '{}': timestamp {} is not greater than {}",
                    stream,
                    timestamp,
                    last
                );
                return Err(HandlinkError::Graph(format!(
                    "timestamp {} on '{}' is not greater than previous {}",
                    timestamp, stream, last
                )));
            }
        }

        match packet.payload() {
            Payload::ImageFrame(_) => {}
            Payload::GpuBuffer(_) if self.gpu_resources.is_some() => {}
            Payload::GpuBuffer(_) => {
                return Err(HandlinkError::Graph(
                    "GpuBuffer input needs GPU resources".to_string(),
                ));
            }
            other => {
                return Err(HandlinkError::Graph(format!(
                    "input stream '{}' does not accept {}",
                    stream,
                    other.type_name()
                )));
            }
        }

        let input = self.input.as_ref().ok_or_else(|| {
            HandlinkError::Graph(format!("input stream '{}' is not open", stream))
        })?;
        input
            .send(packet)
            .map_err(|_| HandlinkError::Graph("graph stopped".to_string()))?;

        self.last_input = Some(timestamp);
        self.stats.accepted.lock().push(timestamp);
        tracing::trace!("Queued packet at {} on '{}'", timestamp, stream);
        Ok(())
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        if self.state != GraphState::Running {
            return Err(HandlinkError::Graph(format!(
                "cannot wait for idle while graph is {:?}",
                self.state
            )));
        }
        let queued = self.stats.accepted.lock().len() as u64;
        let mut progress = self.stats.progress.lock();
        while progress.processed < queued {
            if progress.stopped {
                return Err(HandlinkError::Graph(format!(
                    "graph stopped after {} of {} packet(s)",
                    progress.processed, queued
                )));
            }
            self.stats.progressed.wait(&mut progress);
        }
        tracing::trace!("Loopback graph idle after {} packet(s)", queued);
        Ok(())
    }

    fn close_input_stream(&mut self, stream: &str) -> Result<()> {
        if let Some(settings) = &self.settings {
            if stream != settings.input_stream {
                return Err(HandlinkError::Graph(format!("no input stream named '{}'", stream)));
            }
        }
        if self.input.take().is_some() {
            tracing::debug!("Closed input stream '{}'", stream);
        }
        if self.state == GraphState::Running {
            self.state = GraphState::Closed;
        }
        Ok(())
    }

    fn wait_until_done(&mut self) -> Result<()> {
        if self.state == GraphState::Running {
            return Err(HandlinkError::Graph(
                "input stream still open, close it before waiting".to_string(),
            ));
        }
        let result = self.join_worker();
        if self.state == GraphState::Closed {
            self.state = GraphState::Done;
            tracing::info!(
                "Loopback graph drained after {} packet(s)",
                self.stats.processed()
            );
        }
        result
    }
}

impl Drop for LoopbackGraph {
    fn drop(&mut self) {
        self.input = None;
        if let Err(e) = self.join_worker() {
            tracing::warn!("Loopback graph stopped with error: {}", e);
        }
    }
}

fn run_worker(
    settings: LoopbackSettings,
    input: Receiver<Packet>,
    pollers: Routes,
    observers: Observers,
    stats: &LoopbackStats,
) -> Result<()> {
    let landmark_stream = settings
        .landmark_stream
        .as_deref()
        .filter(|_| settings.emit_landmarks);

    for packet in input.iter() {
        emit(&settings.output_stream, &packet, &pollers, &observers)?;

        if let Some(stream) = landmark_stream {
            if !settings.landmark_delay.is_zero() {
                std::thread::sleep(settings.landmark_delay);
            }
            let hands = vec![settings.landmarks.clone(); settings.hands];
            let landmarks = Packet::new(Payload::Landmarks(hands), packet.timestamp());
            emit(stream, &landmarks, &pollers, &observers)?;
        }

        stats.mark_processed();
    }
    Ok(())
}

fn emit(stream: &str, packet: &Packet, pollers: &Routes, observers: &Observers) -> Result<()> {
    if let Some(senders) = pollers.get(stream) {
        for sender in senders {
            // A dropped poller just stops receiving.
            let _ = sender.send(packet.clone());
        }
    }
    if let Some(callbacks) = observers.get(stream) {
        for callback in callbacks {
            callback(packet).map_err(|e| {
                HandlinkError::Graph(format!("observer on '{}' failed: {}", stream, e))
            })?;
        }
    }
    Ok(())
}
