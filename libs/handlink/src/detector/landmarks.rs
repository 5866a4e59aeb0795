// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::Result;
use crate::pipeline::{NormalizedLandmarkList, Packet, Timestamp};

/// Landmarks the graph produced for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    pub timestamp: Timestamp,
    /// One list per detected hand, in graph order.
    pub hands: Vec<NormalizedLandmarkList>,
}

impl LandmarkSet {
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        Ok(Self {
            timestamp: packet.timestamp(),
            hands: packet.landmark_lists()?.to_vec(),
        })
    }

    pub fn first_hand(&self) -> Option<&NormalizedLandmarkList> {
        self.hands.first()
    }

    /// `[x0, y0, x1, y1, ...]` of the first hand, exactly `num_landmarks`
    /// pairs long. Missing points stay zero; extra points are dropped.
    ///
    /// Only one hand is written. Writing every hand over the previous one
    /// would leave whichever hand the graph listed last, mixed with the
    /// tail of an earlier hand when the last list is shorter.
    pub fn flatten(&self, num_landmarks: usize) -> Vec<f32> {
        let mut coordinates = vec![0.0; num_landmarks * 2];
        if let Some(hand) = self.first_hand() {
            for (pair, landmark) in coordinates.chunks_exact_mut(2).zip(hand.iter()) {
                pair[0] = landmark.x;
                pair[1] = landmark.y;
            }
        }
        coordinates
    }
}
