// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

/// Errors raised while sizing or viewing a shared region.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Mapped length differs from the length the layout requires.
    #[error("region length mismatch: layout requires {expected} bytes, mapping has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Mapping is too short to even hold the coordinate block and header.
    #[error("region truncated: header needs {needed} bytes, mapping has {actual}")]
    Truncated { needed: usize, actual: usize },

    /// Dimensions cannot be represented in the i32 header, or are not positive.
    #[error("invalid image dimensions {cols}x{rows}")]
    InvalidDimensions { cols: i64, rows: i64 },

    /// Coordinate slice does not match the coordinate block.
    #[error("expected {expected} coordinate values, got {actual}")]
    CoordinateCount { expected: usize, actual: usize },

    /// Pixel slice does not match the pixel block.
    #[error("expected {expected} pixel bytes, got {actual}")]
    PixelCount { expected: usize, actual: usize },

    /// Region size does not fit in usize.
    #[error("region size overflows usize")]
    Overflow,
}
