// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crossbeam_channel::Receiver;

use super::Packet;
use crate::core::{HandlinkError, Result};

/// Pull-based accessor for one graph output stream.
pub struct OutputStreamPoller {
    stream: String,
    receiver: Receiver<Packet>,
}

impl OutputStreamPoller {
    pub fn new(stream: impl Into<String>, receiver: Receiver<Packet>) -> Self {
        Self {
            stream: stream.into(),
            receiver,
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.stream
    }

    /// Block until the next packet arrives.
    ///
    /// There is no timeout: a graph that never emits on this stream blocks the
    /// caller forever. Returns an error only once the graph has closed the
    /// stream and every queued packet has been taken.
    pub fn next(&self) -> Result<Packet> {
        self.receiver.recv().map_err(|_| {
            HandlinkError::Graph(format!("Output stream '{}' closed", self.stream))
        })
    }
}

impl std::fmt::Debug for OutputStreamPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStreamPoller")
            .field("stream", &self.stream)
            .field("queued", &self.receiver.len())
            .finish()
    }
}
