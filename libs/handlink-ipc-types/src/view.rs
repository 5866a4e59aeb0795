// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::mem::size_of;

use crate::layout::{read_i32, write_i32};
use crate::{LayoutError, RegionLayout};

fn check_length(layout: &RegionLayout, actual: usize) -> Result<(), LayoutError> {
    if layout.total_size() != actual {
        return Err(LayoutError::LengthMismatch {
            expected: layout.total_size(),
            actual,
        });
    }
    Ok(())
}

fn decode_coordinates(layout: &RegionLayout, bytes: &[u8]) -> Vec<f32> {
    bytes[layout.coordinates_range()]
        .chunks_exact(size_of::<f32>())
        .map(|chunk| {
            let mut raw = [0u8; size_of::<f32>()];
            raw.copy_from_slice(chunk);
            f32::from_ne_bytes(raw)
        })
        .collect()
}

/// Read-only overlay of a [`RegionLayout`] on a mapped byte slice.
#[derive(Debug, Clone, Copy)]
pub struct RegionView<'a> {
    layout: RegionLayout,
    bytes: &'a [u8],
}

impl<'a> RegionView<'a> {
    /// Fails with [`LayoutError::LengthMismatch`] unless `bytes` is exactly
    /// `layout.total_size()` long.
    pub fn new(layout: RegionLayout, bytes: &'a [u8]) -> Result<Self, LayoutError> {
        check_length(&layout, bytes.len())?;
        Ok(Self { layout, bytes })
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// `(cols, rows)` as stored in the header.
    pub fn dimensions(&self) -> (i32, i32) {
        let offset = self.layout.offset_of_dimensions();
        (
            read_i32(self.bytes, offset),
            read_i32(self.bytes, offset + size_of::<i32>()),
        )
    }

    /// Flattened `[x0, y0, x1, y1, ...]`.
    pub fn coordinates(&self) -> Vec<f32> {
        decode_coordinates(&self.layout, self.bytes)
    }

    pub fn pixels(&self) -> &'a [u8] {
        &self.bytes[self.layout.pixels_range()]
    }
}

/// Writable overlay of a [`RegionLayout`] on a mapped byte slice.
#[derive(Debug)]
pub struct RegionViewMut<'a> {
    layout: RegionLayout,
    bytes: &'a mut [u8],
}

impl<'a> RegionViewMut<'a> {
    pub fn new(layout: RegionLayout, bytes: &'a mut [u8]) -> Result<Self, LayoutError> {
        check_length(&layout, bytes.len())?;
        Ok(Self { layout, bytes })
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    pub fn as_view(&self) -> RegionView<'_> {
        RegionView {
            layout: self.layout,
            bytes: &self.bytes[..],
        }
    }

    /// Write the layout's `(cols, rows)` into the header.
    pub fn write_dimensions(&mut self) {
        let offset = self.layout.offset_of_dimensions();
        write_i32(self.bytes, offset, self.layout.cols() as i32);
        write_i32(
            self.bytes,
            offset + size_of::<i32>(),
            self.layout.rows() as i32,
        );
    }

    pub fn write_coordinates(&mut self, coordinates: &[f32]) -> Result<(), LayoutError> {
        let expected = self.layout.coordinate_count();
        if coordinates.len() != expected {
            return Err(LayoutError::CoordinateCount {
                expected,
                actual: coordinates.len(),
            });
        }

        let block = &mut self.bytes[self.layout.coordinates_range()];
        for (chunk, value) in block.chunks_exact_mut(size_of::<f32>()).zip(coordinates) {
            chunk.copy_from_slice(&value.to_ne_bytes());
        }
        Ok(())
    }

    pub fn write_pixels(&mut self, pixels: &[u8]) -> Result<(), LayoutError> {
        let expected = self.layout.pixels_size();
        if pixels.len() != expected {
            return Err(LayoutError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        self.pixels_mut().copy_from_slice(pixels);
        Ok(())
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        let range = self.layout.pixels_range();
        &mut self.bytes[range]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_rejects_wrong_length() {
        let layout = RegionLayout::new(21, 4, 4).unwrap();
        let bytes = vec![0u8; layout.total_size() + 1];
        assert_eq!(
            RegionView::new(layout, &bytes).unwrap_err(),
            LayoutError::LengthMismatch {
                expected: layout.total_size(),
                actual: layout.total_size() + 1,
            }
        );
    }

    #[test]
    fn test_write_then_read_fields() {
        let layout = RegionLayout::new(2, 3, 2).unwrap();
        let mut bytes = vec![0u8; layout.total_size()];
        let pixels: Vec<u8> = (0..layout.pixels_size() as u8).collect();

        {
            let mut view = RegionViewMut::new(layout, &mut bytes).unwrap();
            view.write_dimensions();
            view.write_coordinates(&[0.25, 0.5, 0.75, 1.0]).unwrap();
            view.write_pixels(&pixels).unwrap();
        }

        let view = RegionView::new(layout, &bytes).unwrap();
        assert_eq!(view.dimensions(), (3, 2));
        assert_eq!(view.coordinates(), vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(view.pixels(), pixels.as_slice());
    }

    #[test]
    fn test_coordinate_count_checked() {
        let layout = RegionLayout::new(21, 2, 2).unwrap();
        let mut bytes = vec![0u8; layout.total_size()];
        let mut view = RegionViewMut::new(layout, &mut bytes).unwrap();
        assert_eq!(
            view.write_coordinates(&[0.0; 4]),
            Err(LayoutError::CoordinateCount {
                expected: 42,
                actual: 4
            })
        );
    }
}
