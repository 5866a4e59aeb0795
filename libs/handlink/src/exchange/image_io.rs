// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;

use crate::core::{HandlinkError, Result};
use crate::pipeline::{ImageFormat, ImageFrame, color};

/// Decode an image file into packed 3-channel BGR.
pub fn load_image(path: &Path) -> Result<ImageFrame> {
    let decoded = image::open(path).map_err(|e| HandlinkError::ImageLoadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let rgb = ImageFrame::from_packed(ImageFormat::Srgb, width, height, rgb.into_raw())?;
    let bgr = color::convert(&rgb.as_view(), ImageFormat::Bgr, 1)?;

    tracing::info!("Loaded {} ({}x{})", path.display(), width, height);
    Ok(bgr)
}

/// Encode a frame to a file; the format follows the file extension.
pub fn save_image(frame: &ImageFrame, path: &Path) -> Result<()> {
    let rgb = color::convert(&frame.as_view(), ImageFormat::Srgb, 1)?;
    let buffer = image::RgbImage::from_raw(rgb.width(), rgb.height(), rgb.to_packed())
        .ok_or_else(|| HandlinkError::InvalidImage("pixel buffer does not match dimensions".to_string()))?;
    buffer.save(path).map_err(|e| {
        HandlinkError::InvalidImage(format!("failed to save {}: {}", path.display(), e))
    })?;

    tracing::info!("Saved output image to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load_keeps_bgr_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.png");
        let bgr = ImageFrame::from_packed(ImageFormat::Bgr, 2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap();
        save_image(&bgr, &path).unwrap();

        let png = image::open(&path).unwrap().to_rgb8();
        assert_eq!(png.get_pixel(0, 0).0, [0, 0, 255]);

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded, bgr);
    }

    #[test]
    fn test_missing_file() {
        let err = load_image(Path::new("/nonexistent/Untitled.png")).unwrap_err();
        assert!(matches!(err, HandlinkError::ImageLoadFailed { .. }));
    }
}
