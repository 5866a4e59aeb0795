// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Byte layout of the shared region exchanged between the producer and the
//! consumer process.
//!
//! ```text
//! [0, C)          landmark coordinates, NUM_LANDMARKS * (x, y) as f32
//! [C, C + D)      image dimensions, (cols, rows) as i32
//! [C + D, L)      image pixels, rows * row_stride bytes, 3 channels
//! ```
//!
//! The pixel block carries no length field of its own: both processes derive
//! it from the dimension header and the agreed landmark count. All values are
//! stored in native byte order; the region never leaves the machine.

mod error;
mod layout;
mod view;

pub use error::LayoutError;
pub use layout::{
    align_up, coordinate_block_size, RegionLayout, COORDINATES_PER_LANDMARK,
    DEFAULT_NUM_LANDMARKS, DIMENSION_HEADER_SIZE, IMAGE_CHANNELS, PIXEL_ROW_ALIGNMENT,
};
pub use view::{RegionView, RegionViewMut};
