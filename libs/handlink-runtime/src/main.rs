// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! handlink binary
//!
//! Run without a role marker to act as the producer: load the image, create
//! the shared region and relaunch this executable as the consumer. The
//! consumer is the same command line with the marker appended.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use handlink::app::{self, ProducerOptions};
use handlink::{Backend, HandlinkConfig, HandlinkError};
use tracing_appender::non_blocking::WorkerGuard;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "handlink")]
#[command(author, version, about = "Exchange an image and its hand landmarks across processes", long_about = None)]
struct Args {
    /// Graph configuration handed verbatim to the vision pipeline
    #[arg(value_name = "GRAPH_CONFIG")]
    graph_config: PathBuf,

    /// Role marker; present only on the consumer's command line
    #[arg(value_name = "ROLE")]
    role: Option<String>,

    /// Image to exchange
    #[arg(long, default_value = "Untitled.png")]
    image: PathBuf,

    /// YAML settings file (stream names, landmark count, region name, ...)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Detector backend, overrides the settings file
    #[arg(long)]
    backend: Option<Backend>,

    /// Shared-memory region name, overrides the settings file
    #[arg(long = "region-name")]
    region_name: Option<String>,

    /// Run the consumer on a thread instead of a second process
    #[arg(long = "in-process")]
    in_process: bool,

    /// Write the producer's output image to this PNG
    #[arg(long = "save-output", value_name = "PATH")]
    save_output: Option<PathBuf>,

    /// Also write logs to a file in this directory
    #[arg(long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Producer,
    Consumer,
}

impl Role {
    fn name(self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn setup_logging(role: Role, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_appender =
                tracing_appender::rolling::never(dir, format!("handlink-{}.log", role.name()));
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn load_config(args: &Args) -> Result<HandlinkConfig> {
    let mut config = HandlinkConfig::load_or_default(args.settings.as_deref())?;
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(region_name) = &args.region_name {
        config.region_name = region_name.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args, role: Role, config: &HandlinkConfig) -> Result<()> {
    tracing::info!(
        "Starting {} ({} backend, region '{}')",
        role.name(),
        config.backend,
        config.region_name
    );

    match role {
        Role::Consumer => {
            app::consumer_main(config, &args.graph_config)?;
        }
        Role::Producer => {
            let options = ProducerOptions {
                graph_config: args.graph_config,
                image: args.image,
                in_process: args.in_process,
                save_output: args.save_output,
                consumer_args: std::env::args_os().skip(1).collect(),
            };
            let report = app::producer_main(config, &options)?;
            for line in report.landmark_lines() {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("handlink: {:#}", e);
            return ExitCode::from(2);
        }
    };
    let role = match &args.role {
        Some(marker) if *marker == config.child_marker => Role::Consumer,
        Some(other) => {
            eprintln!(
                "handlink: unknown role '{}' (expected '{}')",
                other, config.child_marker
            );
            return ExitCode::from(2);
        }
        None => Role::Producer,
    };

    let _log_guard = match setup_logging(role, args.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("handlink: {:#}", e);
            return ExitCode::from(2);
        }
    };

    match run(args, role, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{} failed: {:#}", role.name(), e);
            let child_failure = e
                .downcast_ref::<HandlinkError>()
                .is_some_and(HandlinkError::is_child_failure);
            if child_failure {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}
