// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use handlink_ipc_types::RegionLayout;

use super::ExchangeReport;
use crate::core::{HandlinkConfig, HandlinkError, Result};
use crate::pipeline::{ImageFormat, ImageFrame};
use crate::region::{SegmentRemover, SharedRegion};
use crate::subprocess::ConsumerCommand;

/// Producer side of one exchange.
///
/// Writes `image` (packed BGR) into a fresh region, runs `consumer` to
/// completion, then reads the coordinates and the output image back. The
/// region name is removed on every return path.
pub fn run_producer(
    image: &ImageFrame,
    config: &HandlinkConfig,
    consumer: &ConsumerCommand,
) -> Result<ExchangeReport> {
    if image.format() != ImageFormat::Bgr {
        return Err(HandlinkError::InvalidImage(format!(
            "producer expects BGR input, got {:?}",
            image.format()
        )));
    }

    let _remover = SegmentRemover::new(&config.region_name);
    let layout = config.region_layout(image.width(), image.height())?;
    let mut region = SharedRegion::create(&config.region_name, layout)?;
    region.view_mut()?.write_pixels(&image.to_packed())?;
    tracing::debug!(
        "Wrote {}x{} image into '{}' ({} bytes)",
        layout.cols(),
        layout.rows(),
        config.region_name,
        layout.total_size()
    );

    let mut child = consumer.spawn()?;
    child.wait_for_success()?;

    read_report(&region, &layout)
}

fn read_report(region: &SharedRegion, layout: &RegionLayout) -> Result<ExchangeReport> {
    let view = region.view()?;
    let output_image = ImageFrame::from_packed(
        ImageFormat::Bgr,
        layout.cols(),
        layout.rows(),
        view.pixels().to_vec(),
    )?;

    Ok(ExchangeReport {
        coordinates: view.coordinates(),
        output_image,
    })
}
