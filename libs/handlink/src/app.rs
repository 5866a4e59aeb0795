// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Role wiring shared by the `handlink` binary and the test helpers.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{HandlinkConfig, HandlinkError, MonotonicClock, Result};
use crate::detector::Detector;
use crate::exchange::{self, ExchangeReport};
use crate::pipeline::LoopbackGraph;
use crate::subprocess::ConsumerCommand;

/// Read a graph configuration file verbatim.
pub fn load_graph_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        HandlinkError::Configuration(format!(
            "Failed to read graph config {}: {}",
            path.display(),
            e
        ))
    })
}

/// Detector for `config.backend` over a loopback graph.
pub fn build_detector(config: &HandlinkConfig, graph_source: &str) -> Result<Detector> {
    Detector::new(
        config.backend,
        Box::new(LoopbackGraph::new()),
        graph_source,
        config,
        Arc::new(MonotonicClock::new()),
    )
}

#[derive(Debug, Clone)]
pub struct ProducerOptions {
    pub graph_config: PathBuf,
    pub image: PathBuf,
    /// Run the consumer on a thread instead of relaunching this executable.
    pub in_process: bool,
    pub save_output: Option<PathBuf>,
    /// Arguments the consumer is relaunched with, before the role marker.
    pub consumer_args: Vec<OsString>,
}

/// Producer role: load the image, run one exchange, optionally save the
/// output image.
pub fn producer_main(config: &HandlinkConfig, options: &ProducerOptions) -> Result<ExchangeReport> {
    let image = exchange::load_image(&options.image)?;

    let report = if options.in_process {
        let source = load_graph_source(&options.graph_config)?;
        let detector_config = config.clone();
        exchange::run_in_process(&image, config, move || {
            build_detector(&detector_config, &source)
        })?
    } else {
        let command = ConsumerCommand::relaunch_current_exe(
            options.consumer_args.iter().cloned(),
            &config.child_marker,
        )?;
        exchange::run_producer(&image, config, &command)?
    };

    if let Some(path) = &options.save_output {
        exchange::save_image(&report.output_image, path)?;
    }
    Ok(report)
}

/// Consumer role: build the detector and serve the producer's region.
pub fn consumer_main(config: &HandlinkConfig, graph_config: &Path) -> Result<ExchangeReport> {
    let source = load_graph_source(graph_config)?;
    let mut detector = build_detector(config, &source)?;
    exchange::run_consumer(&mut detector, config)
}
