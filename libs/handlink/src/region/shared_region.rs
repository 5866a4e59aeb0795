// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use handlink_ipc_types::{RegionLayout, RegionView, RegionViewMut};

use super::{Access, SharedSegment};
use crate::core::Result;

/// A shared segment with the exchange layout laid over it.
#[derive(Debug)]
pub struct SharedRegion {
    segment: SharedSegment,
    layout: RegionLayout,
}

impl SharedRegion {
    /// Create a zeroed segment sized for `layout` and write its dimensions.
    pub fn create(name: &str, layout: RegionLayout) -> Result<Self> {
        let segment = SharedSegment::create(name, layout.total_size())?;
        let mut region = Self { segment, layout };
        region.view_mut()?.write_dimensions();
        Ok(region)
    }

    /// Open an existing region and recover its layout from the header.
    ///
    /// The mapped length must equal the size implied by the stored
    /// dimensions and `num_landmarks`.
    pub fn open(name: &str, num_landmarks: usize, access: Access) -> Result<Self> {
        let segment = SharedSegment::open(name, access)?;
        let layout = RegionLayout::from_header(segment.as_slice(), num_landmarks)?;
        RegionView::new(layout, segment.as_slice())?;
        tracing::debug!(
            "Region '{}': {}x{} image, {} landmarks",
            name,
            layout.cols(),
            layout.rows(),
            num_landmarks
        );
        Ok(Self { segment, layout })
    }

    pub fn name(&self) -> &str {
        self.segment.name()
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    pub fn segment(&self) -> &SharedSegment {
        &self.segment
    }

    pub fn view(&self) -> Result<RegionView<'_>> {
        Ok(RegionView::new(self.layout, self.segment.as_slice())?)
    }

    pub fn view_mut(&mut self) -> Result<RegionViewMut<'_>> {
        let layout = self.layout;
        Ok(RegionViewMut::new(layout, self.segment.as_mut_slice()?)?)
    }
}
