// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::mem::size_of;
use std::ops::Range;

use crate::LayoutError;

/// Hand keypoints per detected hand.
pub const DEFAULT_NUM_LANDMARKS: usize = 21;

/// Only (x, y) is persisted; z stays in process.
pub const COORDINATES_PER_LANDMARK: usize = 2;

/// The shared pixel block is always 3-channel BGR.
pub const IMAGE_CHANNELS: usize = 3;

/// One i32 for the columns, one for the rows.
pub const DIMENSION_HEADER_SIZE: usize = 2 * size_of::<i32>();

/// Row alignment of the shared pixel block. Rows are packed.
pub const PIXEL_ROW_ALIGNMENT: usize = 1;

/// Round `value` up to the next multiple of `alignment` (`alignment >= 1`).
pub const fn align_up(value: usize, alignment: usize) -> usize {
    let alignment = if alignment == 0 { 1 } else { alignment };
    value.div_ceil(alignment) * alignment
}

/// Size in bytes of the landmark-coordinate block.
pub const fn coordinate_block_size(num_landmarks: usize) -> usize {
    num_landmarks * COORDINATES_PER_LANDMARK * size_of::<f32>()
}

/// Fixed byte layout of one shared region.
///
/// Both processes must compute the same layout before the region is sized;
/// the consumer rebuilds it from the dimension header with
/// [`RegionLayout::from_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    num_landmarks: usize,
    cols: u32,
    rows: u32,
    row_stride: usize,
    pixel_size: usize,
    total_size: usize,
}

impl RegionLayout {
    /// Layout for a `cols x rows` 3-channel image and `num_landmarks` points.
    pub fn new(num_landmarks: usize, cols: u32, rows: u32) -> Result<Self, LayoutError> {
        if cols > i32::MAX as u32 || rows > i32::MAX as u32 {
            return Err(LayoutError::InvalidDimensions {
                cols: cols as i64,
                rows: rows as i64,
            });
        }

        let row_bytes = (cols as usize)
            .checked_mul(IMAGE_CHANNELS)
            .ok_or(LayoutError::Overflow)?;
        let row_stride = align_up(row_bytes, PIXEL_ROW_ALIGNMENT);
        let pixel_size = row_stride
            .checked_mul(rows as usize)
            .ok_or(LayoutError::Overflow)?;
        let total_size = num_landmarks
            .checked_mul(COORDINATES_PER_LANDMARK * size_of::<f32>())
            .and_then(|c| c.checked_add(DIMENSION_HEADER_SIZE))
            .and_then(|h| h.checked_add(pixel_size))
            .ok_or(LayoutError::Overflow)?;

        Ok(Self {
            num_landmarks,
            cols,
            rows,
            row_stride,
            pixel_size,
            total_size,
        })
    }

    /// Rebuild the layout from a mapping whose dimension header was written
    /// by the producer.
    pub fn from_header(bytes: &[u8], num_landmarks: usize) -> Result<Self, LayoutError> {
        let header_start = coordinate_block_size(num_landmarks);
        let needed = header_start + DIMENSION_HEADER_SIZE;
        if bytes.len() < needed {
            return Err(LayoutError::Truncated {
                needed,
                actual: bytes.len(),
            });
        }

        let cols = read_i32(bytes, header_start);
        let rows = read_i32(bytes, header_start + size_of::<i32>());
        if cols <= 0 || rows <= 0 {
            return Err(LayoutError::InvalidDimensions {
                cols: cols as i64,
                rows: rows as i64,
            });
        }

        Self::new(num_landmarks, cols as u32, rows as u32)
    }

    pub fn num_landmarks(&self) -> usize {
        self.num_landmarks
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn channels(&self) -> usize {
        IMAGE_CHANNELS
    }

    /// Bytes per pixel row in the shared block.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Number of f32 values in the coordinate block.
    pub fn coordinate_count(&self) -> usize {
        self.num_landmarks * COORDINATES_PER_LANDMARK
    }

    pub fn coordinates_size(&self) -> usize {
        coordinate_block_size(self.num_landmarks)
    }

    pub fn pixels_size(&self) -> usize {
        self.pixel_size
    }

    /// Total region length `L = C + D + I`.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub const fn offset_of_coordinates(&self) -> usize {
        0
    }

    pub fn offset_of_dimensions(&self) -> usize {
        self.coordinates_size()
    }

    pub fn offset_of_pixels(&self) -> usize {
        self.offset_of_dimensions() + DIMENSION_HEADER_SIZE
    }

    pub fn coordinates_range(&self) -> Range<usize> {
        self.offset_of_coordinates()..self.offset_of_dimensions()
    }

    pub fn dimensions_range(&self) -> Range<usize> {
        self.offset_of_dimensions()..self.offset_of_pixels()
    }

    pub fn pixels_range(&self) -> Range<usize> {
        self.offset_of_pixels()..self.total_size
    }
}

pub(crate) fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; size_of::<i32>()];
    raw.copy_from_slice(&bytes[offset..offset + size_of::<i32>()]);
    i32::from_ne_bytes(raw)
}

pub(crate) fn write_i32(bytes: &mut [u8], offset: usize, value: i32) {
    bytes[offset..offset + size_of::<i32>()].copy_from_slice(&value.to_ne_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_independent_of_image_size() {
        for (cols, rows) in [(1, 1), (2, 3), (603, 621), (1920, 1080), (7, 4096)] {
            let layout = RegionLayout::new(DEFAULT_NUM_LANDMARKS, cols, rows).unwrap();
            assert_eq!(layout.offset_of_coordinates(), 0);
            assert_eq!(
                layout.offset_of_pixels() - layout.offset_of_dimensions(),
                2 * size_of::<i32>()
            );
            assert_eq!(
                layout.offset_of_dimensions() - layout.offset_of_coordinates(),
                DEFAULT_NUM_LANDMARKS * 2 * size_of::<f32>()
            );
        }
    }

    #[test]
    fn test_total_size_for_reference_image() {
        let layout = RegionLayout::new(21, 603, 621).unwrap();
        assert_eq!(layout.row_stride(), 603 * 3);
        assert_eq!(layout.pixels_size(), 603 * 3 * 621);
        assert_eq!(layout.total_size(), 168 + 8 + 603 * 3 * 621);
        assert_eq!(layout.pixels_range().len(), layout.pixels_size());
    }

    #[test]
    fn test_landmark_count_moves_header() {
        let layout = RegionLayout::new(5, 10, 10).unwrap();
        assert_eq!(layout.offset_of_dimensions(), 40);
        assert_eq!(layout.offset_of_pixels(), 48);
        assert_eq!(layout.coordinate_count(), 10);
    }

    #[test]
    fn test_from_header_roundtrip() {
        let layout = RegionLayout::new(21, 64, 48).unwrap();
        let mut bytes = vec![0u8; layout.total_size()];
        write_i32(&mut bytes, layout.offset_of_dimensions(), 64);
        write_i32(&mut bytes, layout.offset_of_dimensions() + 4, 48);

        assert_eq!(RegionLayout::from_header(&bytes, 21).unwrap(), layout);
    }

    #[test]
    fn test_from_header_rejects_zeroed_header() {
        let bytes = vec![0u8; 512];
        assert!(matches!(
            RegionLayout::from_header(&bytes, 21),
            Err(LayoutError::InvalidDimensions { cols: 0, rows: 0 })
        ));
    }

    #[test]
    fn test_from_header_rejects_short_mapping() {
        let bytes = vec![0u8; 100];
        assert_eq!(
            RegionLayout::from_header(&bytes, 21),
            Err(LayoutError::Truncated {
                needed: 176,
                actual: 100
            })
        );
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(1809, 4), 1812);
        assert_eq!(align_up(2412, 4), 2412);
        assert_eq!(align_up(7, 1), 7);
        assert_eq!(align_up(7, 0), 7);
    }
}
