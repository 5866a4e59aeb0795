// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Time sources for frame timestamps.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::pipeline::Timestamp;

/// Passive time reference queried once per submitted frame.
pub trait Clock: Send + Sync {
    /// Current time in microseconds since an arbitrary epoch.
    fn now_us(&self) -> i64;

    /// Human-readable clock description, used in logs.
    fn description(&self) -> &str;
}

/// Wall-clock epoch plus a monotonic `Instant` offset.
pub struct MonotonicClock {
    start_time: Instant,
    start_timestamp_us: i64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let start_timestamp_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or_default();

        Self {
            start_time: Instant::now(),
            start_timestamp_us,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> i64 {
        self.start_timestamp_us + self.start_time.elapsed().as_micros() as i64
    }

    fn description(&self) -> &str {
        "Monotonic Clock"
    }
}

/// Issues strictly increasing timestamps for one graph input stream.
///
/// The graph rejects a packet whose timestamp is not greater than the
/// previous one, so when the clock has not advanced since the last frame the
/// next timestamp is bumped by one microsecond.
pub struct FrameTimestamper {
    clock: Arc<dyn Clock>,
    last: Option<Timestamp>,
}

impl FrameTimestamper {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, last: None }
    }

    pub fn next(&mut self) -> Timestamp {
        let timestamp = self.peek();
        self.commit(timestamp);
        timestamp
    }

    /// Timestamp the next frame would get, without claiming it.
    pub fn peek(&self) -> Timestamp {
        let now = Timestamp::from_micros(self.clock.now_us());
        match self.last {
            Some(previous) if now <= previous => previous.successor(),
            _ => now,
        }
    }

    /// Record `timestamp` as the last one handed to the graph.
    pub fn commit(&mut self, timestamp: Timestamp) {
        self.last = Some(timestamp);
    }

    pub fn last(&self) -> Option<Timestamp> {
        self.last
    }
}
