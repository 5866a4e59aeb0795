// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Channel reordering between the region's BGR layout and the graph's RGB(A).

use super::{ImageFormat, ImageFrame, ImageView};
use crate::core::Result;

/// Convert `src` into a new frame of `target` format with rows padded to
/// `alignment` bytes. Alpha is set opaque when the source has none and
/// dropped when the target has none.
pub fn convert(src: &ImageView<'_>, target: ImageFormat, alignment: usize) -> Result<ImageFrame> {
    if src.format() == target {
        return ImageFrame::from_view(src, alignment);
    }

    let mut dst = ImageFrame::new(target, src.width(), src.height(), alignment)?;
    let src_channels = src.format().channels();
    let dst_channels = target.channels();
    let (sr, sg, sb) = src.format().rgb_offsets();
    let (dr, dg, db) = target.rgb_offsets();
    let src_alpha = src.format().alpha_offset();
    let dst_alpha = target.alpha_offset();

    for y in 0..src.height() {
        let src_row = src.row(y);
        let dst_row = dst.row_mut(y);
        for (s, d) in src_row
            .chunks_exact(src_channels)
            .zip(dst_row.chunks_exact_mut(dst_channels))
        {
            d[dr] = s[sr];
            d[dg] = s[sg];
            d[db] = s[sb];
            if let Some(da) = dst_alpha {
                d[da] = src_alpha.map_or(u8::MAX, |sa| s[sa]);
            }
        }
    }

    tracing::trace!(
        "Converted {}x{} {:?} -> {:?}",
        src.width(),
        src.height(),
        src.format(),
        target
    );
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::GL_DEFAULT_ALIGNMENT_BOUNDARY;

    #[test]
    fn test_bgr_to_rgba_sets_opaque_alpha() {
        let bgr = [10u8, 20, 30, 40, 50, 60];
        let view = ImageView::packed(ImageFormat::Bgr, 2, 1, &bgr).unwrap();
        let rgba = convert(&view, ImageFormat::Srgba, GL_DEFAULT_ALIGNMENT_BOUNDARY).unwrap();
        assert_eq!(rgba.row(0), &[30, 20, 10, 255, 60, 50, 40, 255]);
    }

    #[test]
    fn test_rgba_to_bgr_drops_alpha() {
        let rgba = [1u8, 2, 3, 4];
        let view = ImageView::packed(ImageFormat::Srgba, 1, 1, &rgba).unwrap();
        let bgr = convert(&view, ImageFormat::Bgr, 1).unwrap();
        assert_eq!(bgr.to_packed(), vec![3, 2, 1]);
    }

    #[test]
    fn test_round_trip_through_rgb_on_odd_width() {
        let bgr: Vec<u8> = (0..7 * 5 * 3).map(|v| (v * 7 % 251) as u8).collect();
        let view = ImageView::packed(ImageFormat::Bgr, 7, 5, &bgr).unwrap();
        let rgb = convert(&view, ImageFormat::Srgb, GL_DEFAULT_ALIGNMENT_BOUNDARY).unwrap();
        assert!(!rgb.is_packed());
        let back = convert(&rgb.as_view(), ImageFormat::Bgr, 1).unwrap();
        assert_eq!(back.to_packed(), bgr);
    }
}
