// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::ExchangeReport;
use crate::core::{HandlinkConfig, Result};
use crate::detector::{Detection, LandmarkDetector};
use crate::pipeline::{GL_DEFAULT_ALIGNMENT_BOUNDARY, ImageFormat, ImageView, color};
use crate::region::{Access, SharedRegion};

/// Run one BGR image through `detector` and wait for its landmarks.
pub fn detect_bgr<D>(detector: &mut D, image: &ImageView<'_>) -> Result<Detection>
where
    D: LandmarkDetector + ?Sized,
{
    let rgba = color::convert(image, ImageFormat::Srgba, GL_DEFAULT_ALIGNMENT_BOUNDARY)?;
    detector.detect_with_landmarks(&rgba)
}

/// Take the landmarks of `detection`'s frame from the slot if they missed the
/// bounded wait. Call once the graph has gone idle or drained, so that
/// whatever it had for the frame has been delivered.
pub fn settle_landmarks<D>(detector: &D, detection: &mut Detection)
where
    D: LandmarkDetector + ?Sized,
{
    if detection.landmarks.is_none() {
        detection.landmarks = detector
            .landmarks()
            .filter(|set| set.timestamp == detection.timestamp);
        if detection.landmarks.is_some() {
            tracing::debug!("Landmarks for {} arrived after the wait", detection.timestamp);
        }
    }
}

/// Consumer side of one exchange.
///
/// Opens the producer's region, detects on its image, drains the graph and
/// writes the coordinates and the BGR output back into the region.
pub fn run_consumer<D>(detector: &mut D, config: &HandlinkConfig) -> Result<ExchangeReport>
where
    D: LandmarkDetector + ?Sized,
{
    let mut region = SharedRegion::open(&config.region_name, config.num_landmarks, Access::ReadWrite)?;
    let layout = *region.layout();

    let mut detection = {
        let view = region.view()?;
        let image = ImageView::packed(ImageFormat::Bgr, layout.cols(), layout.rows(), view.pixels())?;
        detect_bgr(detector, &image)?
    };

    detector.finish()?;
    settle_landmarks(&*detector, &mut detection);

    let coordinates = detection.coordinates(config.num_landmarks);
    let output_image = detection.image;

    let mut view = region.view_mut()?;
    view.write_coordinates(&coordinates)?;
    if output_image.width() == layout.cols() && output_image.height() == layout.rows() {
        view.write_pixels(&output_image.to_packed())?;
    } else {
        tracing::warn!(
            "Output image is {}x{}, region holds {}x{}; leaving pixels untouched",
            output_image.width(),
            output_image.height(),
            layout.cols(),
            layout.rows()
        );
    }
    tracing::info!("Wrote {} landmark coordinates to '{}'", coordinates.len(), config.region_name);

    Ok(ExchangeReport {
        coordinates,
        output_image,
    })
}
