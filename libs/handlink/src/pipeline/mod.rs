// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Boundary to the vision pipeline: packets, frames, streams and graphs.

pub mod color;
mod graph;
mod graph_config;
mod image_frame;
mod landmark;
pub mod loopback;
mod packet;
mod poller;

pub use graph::{ObserverCallback, VisionGraph};
pub use graph_config::{ConfigBlock, ConfigValue, GraphConfig};
pub use image_frame::{GL_DEFAULT_ALIGNMENT_BOUNDARY, ImageFormat, ImageFrame, ImageView};
pub use landmark::{NormalizedLandmark, NormalizedLandmarkList};
pub use loopback::{LoopbackGraph, LoopbackSettings, LoopbackStats};
pub use packet::{Packet, Payload, Timestamp};
pub use poller::OutputStreamPoller;
