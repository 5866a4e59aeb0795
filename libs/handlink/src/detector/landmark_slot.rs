// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::LandmarkSet;
use crate::pipeline::Timestamp;

/// Latest landmark set, written by the graph's observer thread and read by
/// the detecting thread.
#[derive(Debug, Default)]
pub struct LandmarkSlot {
    latest: Mutex<Option<LandmarkSet>>,
    published: Condvar,
}

impl LandmarkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, set: LandmarkSet) {
        let mut latest = self.latest.lock();
        tracing::trace!(
            "Landmarks for {}: {} hand(s)",
            set.timestamp,
            set.hands.len()
        );
        *latest = Some(set);
        self.published.notify_all();
    }

    pub fn latest(&self) -> Option<LandmarkSet> {
        self.latest.lock().clone()
    }

    /// Wait up to `timeout` for the set tagged `timestamp`.
    ///
    /// Returns `None` on timeout, or as soon as a set for a later frame shows
    /// up, since the graph delivers at most one set per frame in order.
    pub fn wait_for(&self, timestamp: Timestamp, timeout: Duration) -> Option<LandmarkSet> {
        let deadline = Instant::now() + timeout;
        let mut latest = self.latest.lock();
        loop {
            match latest.as_ref() {
                Some(set) if set.timestamp == timestamp => return Some(set.clone()),
                Some(set) if set.timestamp > timestamp => return None,
                _ => {}
            }
            if self.published.wait_until(&mut latest, deadline).timed_out() {
                return latest
                    .as_ref()
                    .filter(|set| set.timestamp == timestamp)
                    .cloned();
            }
        }
    }

    pub fn clear(&self) {
        *self.latest.lock() = None;
    }
}
