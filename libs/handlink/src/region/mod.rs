// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Named shared-memory region: segment lifecycle and typed layout access.

mod segment;
mod shared_region;

pub use segment::{Access, SegmentRemover, SharedSegment};
pub use shared_region::SharedRegion;
