// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::process::ExitStatus;

use handlink_ipc_types::LayoutError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandlinkError {
    #[error("Shared segment already exists: {0}")]
    SegmentAlreadyExists(String),

    #[error("Shared segment not found: {0}")]
    SegmentNotFound(String),

    #[error("Failed to load image '{path}': {reason}")]
    ImageLoadFailed { path: String, reason: String },

    #[error("Failed to parse graph config: {0}")]
    ConfigParse(String),

    #[error("Graph initialization failed: {0}")]
    GraphInit(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("GPU context error: {0}")]
    GpuContext(String),

    #[error("Child process failed with {status}")]
    ChildProcessFailed { status: ExitStatus },

    #[error("Failed to launch child process: {0}")]
    ChildSpawnFailed(String),

    #[error("Region layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Region access error: {0}")]
    RegionAccess(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandlinkError {
    /// Child launch or exit failures; the runtime maps these to exit code 1.
    pub fn is_child_failure(&self) -> bool {
        matches!(
            self,
            Self::ChildProcessFailed { .. } | Self::ChildSpawnFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HandlinkError>;
