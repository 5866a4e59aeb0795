// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, FrameTimestamper, MonotonicClock};
pub use config::{Backend, HandlinkConfig};
pub use error::*;
