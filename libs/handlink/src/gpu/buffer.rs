// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::sync::Arc;

use crate::core::{HandlinkError, Result};
use crate::pipeline::{ImageFormat, ImageFrame};

use super::gl_constants;

/// Texture-backed pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuBufferFormat {
    Rgba32,
    Rgb24,
}

impl GpuBufferFormat {
    pub fn for_image_format(format: ImageFormat) -> Result<Self> {
        match format {
            ImageFormat::Srgba => Ok(Self::Rgba32),
            ImageFormat::Srgb => Ok(Self::Rgb24),
            ImageFormat::Bgr => Err(HandlinkError::GpuContext(
                "BGR frames have no texture format, convert to RGB(A) first".to_string(),
            )),
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba32 => 4,
            Self::Rgb24 => 3,
        }
    }

    /// GL internal format of a texture holding this format.
    pub fn gl_internal_format(self) -> u32 {
        match self {
            Self::Rgba32 => gl_constants::GL_RGBA8,
            Self::Rgb24 => gl_constants::GL_RGB8,
        }
    }
}

/// CPU frame format matching a texture format.
pub fn image_format_for_gpu_buffer_format(format: GpuBufferFormat) -> ImageFormat {
    match format {
        GpuBufferFormat::Rgba32 => ImageFormat::Srgba,
        GpuBufferFormat::Rgb24 => ImageFormat::Srgb,
    }
}

/// Immutable texture contents shared between the graph and the detector.
///
/// Rows are tightly packed; clones share storage.
#[derive(Clone, PartialEq, Eq)]
pub struct GpuBuffer {
    format: GpuBufferFormat,
    width: u32,
    height: u32,
    texels: Arc<[u8]>,
}

impl GpuBuffer {
    /// Upload a CPU frame, dropping its row padding.
    pub fn from_frame(frame: &ImageFrame) -> Result<Self> {
        let format = GpuBufferFormat::for_image_format(frame.format())?;
        Ok(Self {
            format,
            width: frame.width(),
            height: frame.height(),
            texels: Arc::from(frame.to_packed()),
        })
    }

    pub fn format(&self) -> GpuBufferFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * self.format.bytes_per_pixel();
        let start = y as usize * stride;
        &self.texels[start..start + stride]
    }
}

impl fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::GL_DEFAULT_ALIGNMENT_BOUNDARY;

    #[test]
    fn test_upload_strips_padding() {
        let mut frame = ImageFrame::new(ImageFormat::Srgb, 3, 2, GL_DEFAULT_ALIGNMENT_BOUNDARY).unwrap();
        frame.row_mut(1).copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let buffer = GpuBuffer::from_frame(&frame).unwrap();
        assert_eq!(buffer.format(), GpuBufferFormat::Rgb24);
        assert_eq!(buffer.row(1), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_bgr_has_no_texture_format() {
        assert!(GpuBufferFormat::for_image_format(ImageFormat::Bgr).is_err());
        assert_eq!(
            image_format_for_gpu_buffer_format(GpuBufferFormat::Rgba32),
            ImageFormat::Srgba
        );
    }
}
