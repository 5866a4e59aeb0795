// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use handlink_ipc_types::align_up;

use crate::core::{HandlinkError, Result};

/// Row alignment the graph expects for CPU frames.
pub const GL_DEFAULT_ALIGNMENT_BOUNDARY: usize = 4;

/// Pixel formats crossing the pipeline boundary. All are 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Srgb,
    Srgba,
    /// Channel order of the shared region.
    Bgr,
}

impl ImageFormat {
    pub fn channels(self) -> usize {
        match self {
            ImageFormat::Srgb | ImageFormat::Bgr => 3,
            ImageFormat::Srgba => 4,
        }
    }

    /// Byte offsets of the red, green and blue samples within one pixel.
    pub(crate) fn rgb_offsets(self) -> (usize, usize, usize) {
        match self {
            ImageFormat::Srgb | ImageFormat::Srgba => (0, 1, 2),
            ImageFormat::Bgr => (2, 1, 0),
        }
    }

    pub(crate) fn alpha_offset(self) -> Option<usize> {
        match self {
            ImageFormat::Srgba => Some(3),
            ImageFormat::Srgb | ImageFormat::Bgr => None,
        }
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(HandlinkError::InvalidImage(format!(
            "dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

/// Borrowed image over memory owned elsewhere, typically the mapped region.
#[derive(Clone, Copy)]
pub struct ImageView<'a> {
    format: ImageFormat,
    width: u32,
    height: u32,
    width_step: usize,
    data: &'a [u8],
}

impl<'a> ImageView<'a> {
    pub fn new(
        format: ImageFormat,
        width: u32,
        height: u32,
        width_step: usize,
        data: &'a [u8],
    ) -> Result<Self> {
        check_dimensions(width, height)?;
        let row_bytes = width as usize * format.channels();
        if width_step < row_bytes {
            return Err(HandlinkError::InvalidImage(format!(
                "width step {} is smaller than a {}-byte row",
                width_step, row_bytes
            )));
        }
        let needed = width_step * (height as usize - 1) + row_bytes;
        if data.len() < needed {
            return Err(HandlinkError::InvalidImage(format!(
                "{}x{} {:?} image needs {} bytes, buffer has {}",
                width,
                height,
                format,
                needed,
                data.len()
            )));
        }

        Ok(Self {
            format,
            width,
            height,
            width_step,
            data,
        })
    }

    /// View over rows with no padding.
    pub fn packed(format: ImageFormat, width: u32, height: u32, data: &'a [u8]) -> Result<Self> {
        Self::new(format, width, height, width as usize * format.channels(), data)
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width_step(&self) -> usize {
        self.width_step
    }

    /// Pixel bytes of row `y`, without trailing padding.
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.width_step;
        &self.data[start..start + self.width as usize * self.format.channels()]
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }
}

impl fmt::Debug for ImageView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageView")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("width_step", &self.width_step)
            .finish_non_exhaustive()
    }
}

/// Owned frame with rows aligned to a byte boundary.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFrame {
    format: ImageFormat,
    width: u32,
    height: u32,
    width_step: usize,
    pixels: Vec<u8>,
}

impl ImageFrame {
    /// Zero-filled frame whose rows are padded to `alignment` bytes.
    pub fn new(format: ImageFormat, width: u32, height: u32, alignment: usize) -> Result<Self> {
        check_dimensions(width, height)?;
        let width_step = align_up(width as usize * format.channels(), alignment);
        Ok(Self {
            format,
            width,
            height,
            width_step,
            pixels: vec![0; width_step * height as usize],
        })
    }

    /// Take ownership of tightly packed rows.
    pub fn from_packed(format: ImageFormat, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        let width_step = width as usize * format.channels();
        let expected = width_step * height as usize;
        if pixels.len() != expected {
            return Err(HandlinkError::InvalidImage(format!(
                "{}x{} {:?} image needs {} bytes, got {}",
                width,
                height,
                format,
                expected,
                pixels.len()
            )));
        }

        Ok(Self {
            format,
            width,
            height,
            width_step,
            pixels,
        })
    }

    /// Copy a view into a new frame with rows padded to `alignment` bytes.
    pub fn from_view(view: &ImageView<'_>, alignment: usize) -> Result<Self> {
        let mut frame = Self::new(view.format(), view.width(), view.height(), alignment)?;
        frame.copy_from(view)?;
        Ok(frame)
    }

    /// Copy pixels row by row from a view of the same format and size.
    pub fn copy_from(&mut self, view: &ImageView<'_>) -> Result<()> {
        if view.format() != self.format || view.width() != self.width || view.height() != self.height {
            return Err(HandlinkError::InvalidImage(format!(
                "cannot copy {}x{} {:?} into {}x{} {:?}",
                view.width(),
                view.height(),
                view.format(),
                self.width,
                self.height,
                self.format
            )));
        }
        for y in 0..self.height {
            self.row_mut(y).copy_from_slice(view.row(y));
        }
        Ok(())
    }

    pub fn as_view(&self) -> ImageView<'_> {
        ImageView {
            format: self.format,
            width: self.width,
            height: self.height,
            width_step: self.width_step,
            data: &self.pixels,
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    pub fn width_step(&self) -> usize {
        self.width_step
    }

    pub fn is_packed(&self) -> bool {
        self.width_step == self.width as usize * self.channels()
    }

    pub fn pixel_data(&self) -> &[u8] {
        &self.pixels
    }

    pub fn row(&self, y: u32) -> &[u8] {
        self.as_view().row(y)
    }

    /// Writable pixel bytes of row `y`, without trailing padding.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.width_step;
        let len = self.width as usize * self.channels();
        &mut self.pixels[start..start + len]
    }

    /// Pixel bytes with row padding removed.
    pub fn to_packed(&self) -> Vec<u8> {
        if self.is_packed() {
            return self.pixels.clone();
        }
        let mut packed = Vec::with_capacity(self.width as usize * self.channels() * self.height as usize);
        for row in self.as_view().rows() {
            packed.extend_from_slice(row);
        }
        packed
    }
}

impl fmt::Debug for ImageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFrame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("width_step", &self.width_step)
            .finish_non_exhaustive()
    }
}
