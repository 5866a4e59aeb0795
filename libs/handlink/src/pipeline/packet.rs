// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::sync::Arc;

use crate::core::{HandlinkError, Result};
use crate::gpu::GpuBuffer;

use super::{ImageFrame, NormalizedLandmarkList};

/// Packet timestamp in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_micros(us: i64) -> Self {
        Self(us)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Smallest timestamp strictly greater than this one.
    pub const fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

#[derive(Debug)]
pub enum Payload {
    ImageFrame(ImageFrame),
    GpuBuffer(GpuBuffer),
    /// One list per detected hand.
    Landmarks(Vec<NormalizedLandmarkList>),
}

impl Payload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::ImageFrame(_) => "ImageFrame",
            Payload::GpuBuffer(_) => "GpuBuffer",
            Payload::Landmarks(_) => "NormalizedLandmarkList[]",
        }
    }
}

/// Immutable, cheaply cloned payload plus its timestamp.
#[derive(Debug, Clone)]
pub struct Packet {
    payload: Arc<Payload>,
    timestamp: Timestamp,
}

impl Packet {
    pub fn new(payload: Payload, timestamp: Timestamp) -> Self {
        Self {
            payload: Arc::new(payload),
            timestamp,
        }
    }

    /// Same payload under a different timestamp.
    pub fn at(&self, timestamp: Timestamp) -> Self {
        Self {
            payload: Arc::clone(&self.payload),
            timestamp,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn image_frame(&self) -> Result<&ImageFrame> {
        match self.payload() {
            Payload::ImageFrame(frame) => Ok(frame),
            other => Err(self.type_mismatch("ImageFrame", other)),
        }
    }

    pub fn gpu_buffer(&self) -> Result<&GpuBuffer> {
        match self.payload() {
            Payload::GpuBuffer(buffer) => Ok(buffer),
            other => Err(self.type_mismatch("GpuBuffer", other)),
        }
    }

    pub fn landmark_lists(&self) -> Result<&[NormalizedLandmarkList]> {
        match self.payload() {
            Payload::Landmarks(lists) => Ok(lists),
            other => Err(self.type_mismatch("NormalizedLandmarkList[]", other)),
        }
    }

    fn type_mismatch(&self, expected: &str, actual: &Payload) -> HandlinkError {
        HandlinkError::Graph(format!(
            "Packet at {} holds {}, expected {}",
            self.timestamp,
            actual.type_name(),
            expected
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NormalizedLandmark;

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::from_micros(10);
        assert!(a.successor() > a);
        assert_eq!(a.successor().micros(), 11);
        assert_eq!(Timestamp::from_micros(i64::MAX).successor().micros(), i64::MAX);
    }

    #[test]
    fn test_typed_access() {
        let hand = NormalizedLandmarkList::new(vec![NormalizedLandmark::new(0.5, 0.5, 0.0)]);
        let packet = Packet::new(Payload::Landmarks(vec![hand]), Timestamp::from_micros(7));

        assert_eq!(packet.landmark_lists().unwrap().len(), 1);
        let err = packet.image_frame().unwrap_err();
        assert!(matches!(err, HandlinkError::Graph(_)));
        assert_eq!(packet.at(Timestamp::from_micros(8)).timestamp().micros(), 8);
    }
}
