// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Exchange an image and its hand landmarks between two processes over a
//! named shared-memory region, with a synchronous detector adapter over an
//! asynchronous vision graph.

pub mod app;
pub mod core;
pub mod detector;
pub mod exchange;
pub mod gpu;
pub mod pipeline;
pub mod region;
pub mod subprocess;

pub use crate::core::{Backend, Clock, HandlinkConfig, HandlinkError, MonotonicClock, Result};
pub use detector::{CpuDetector, Detection, Detector, GpuDetector, LandmarkDetector, LandmarkSet};
pub use exchange::{ExchangeReport, InProcessExchange};
pub use pipeline::{LoopbackGraph, VisionGraph};
pub use region::{Access, SegmentRemover, SharedRegion, SharedSegment};

pub use handlink_ipc_types::{DEFAULT_NUM_LANDMARKS, RegionLayout};
