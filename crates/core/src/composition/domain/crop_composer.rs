//! Eye-centred crop selection.
//!
//! The crop is the largest rectangle of the requested aspect ratio that keeps
//! the focal point on its vertical center line and one third of the way down
//! from its top edge. Three independent ceilings bound the crop height:
//!
//! - the horizontal room around the focal point (converted via the aspect ratio),
//! - the room above the focal point (it must hold 1/3 of the height),
//! - the room below the focal point (it must hold 2/3 of the height).
//!
//! The tightest one wins. Every size is truncated to whole pixels right after
//! it is derived so rounding drift cannot compound.

use crate::shared::aspect_ratio::AspectRatio;
use crate::shared::constants::FOCAL_HEIGHT_FRACTION;
use crate::shared::crop_rect::CropRect;
use crate::shared::point::Point;

/// Share of the crop height below the focal point.
const BELOW_FOCAL_FRACTION: f64 = 2.0 / 3.0;

/// Computes the crop rectangle for a `image_width` x `image_height` image.
///
/// Never fails: any geometry with positive dimensions yields a rectangle
/// inside the image with at least one pixel on each side.
pub fn compose(
    image_width: u32,
    image_height: u32,
    focal: Point,
    aspect: AspectRatio,
) -> CropRect {
    let img_w = image_width as f64;
    let img_h = image_height as f64;
    let aspect_w = aspect.width() as f64;
    let aspect_h = aspect.height() as f64;

    let symmetric_width = (focal.x * 2.0).min((img_w - focal.x) * 2.0);
    let height_from_width = (symmetric_width * aspect_h / aspect_w).trunc();

    let height_above = focal.y / FOCAL_HEIGHT_FRACTION;
    let height_below = (img_h - focal.y) / BELOW_FOCAL_FRACTION;

    let crop_height = height_from_width
        .min(height_above)
        .min(height_below)
        .trunc()
        .max(0.0);
    let crop_width = (crop_height * aspect_w / aspect_h).trunc();
    log::trace!(
        "Height bounds: width={height_from_width} above={height_above} below={height_below} -> {crop_width}x{crop_height}"
    );

    let left = (focal.x - crop_width / 2.0).trunc();
    let top = (focal.y - FOCAL_HEIGHT_FRACTION * crop_height).trunc();

    let (left, right) = clamp_span(left, left + crop_width, image_width);
    let (top, bottom) = clamp_span(top, top + crop_height, image_height);
    CropRect {
        left,
        top,
        right,
        bottom,
    }
}

/// Clamps `start..end` into `0..limit`, keeping at least one pixel.
///
/// `limit` must be positive.
fn clamp_span(start: f64, end: f64, limit: u32) -> (u32, u32) {
    let last = limit.saturating_sub(1) as f64;
    let start = start.max(0.0).min(last);
    let end = end.min(limit as f64).max(start + 1.0);
    (start as u32, end as u32)
}
