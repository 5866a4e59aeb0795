// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

/// One hand keypoint in image-relative coordinates.
///
/// `x` and `y` are normalized to `[0, 1]` by image width and height; `z` is
/// relative depth with the wrist as origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl NormalizedLandmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// All keypoints of one detected hand, in model order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedLandmarkList {
    pub landmarks: Vec<NormalizedLandmark>,
}

impl NormalizedLandmarkList {
    pub fn new(landmarks: Vec<NormalizedLandmark>) -> Self {
        Self { landmarks }
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedLandmark> {
        self.landmarks.iter()
    }
}

impl FromIterator<NormalizedLandmark> for NormalizedLandmarkList {
    fn from_iter<I: IntoIterator<Item = NormalizedLandmark>>(iter: I) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}
