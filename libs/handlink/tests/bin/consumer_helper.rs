// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Consumer role for the cross-process tests.
//!
//! Usage: `consumer_helper <settings.yaml> <graph-config> [marker]`

use std::path::PathBuf;

use handlink::HandlinkConfig;
use handlink::app;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let (settings, graph_config) = match args.as_slice() {
        [settings, graph_config, ..] => (settings, graph_config),
        _ => {
            tracing::error!("usage: consumer_helper <settings.yaml> <graph-config> [marker]");
            std::process::exit(64);
        }
    };

    let result = HandlinkConfig::load(settings)
        .and_then(|config| app::consumer_main(&config, graph_config));
    match result {
        Ok(report) => {
            tracing::info!("Consumer wrote {} coordinates", report.coordinates.len());
        }
        Err(e) => {
            tracing::error!("Consumer failed: {}", e);
            std::process::exit(1);
        }
    }
}
