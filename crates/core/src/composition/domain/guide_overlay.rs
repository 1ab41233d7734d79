use ndarray::ArrayViewMut3;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::point::Point;

pub type Rgb = [u8; 3];

pub const THIRDS_COLOR: Rgb = [0, 255, 0];
pub const FOCAL_COLOR: Rgb = [0, 255, 255];
pub const FACE_BOX_COLOR: Rgb = [0, 0, 255];
pub const EYE_BOX_COLOR: Rgb = [0, 255, 0];

const BOX_THICKNESS: i64 = 2;

/// Draws rule-of-thirds lines over the whole frame and, when given, a
/// cross through `focal` (frame coordinates).
pub fn draw_guide_lines(frame: &mut Frame, focal: Option<Point>) {
    let w = frame.width() as i64;
    let h = frame.height() as i64;
    let mut pixels = frame.as_ndarray_mut();

    for x in [w / 3, 2 * w / 3] {
        draw_vertical(&mut pixels, x, 0, h, THIRDS_COLOR);
    }
    for y in [h / 3, 2 * h / 3] {
        draw_horizontal(&mut pixels, y, 0, w, THIRDS_COLOR);
    }

    if let Some(focal) = focal {
        draw_vertical(&mut pixels, focal.x as i64, 0, h, FOCAL_COLOR);
        draw_horizontal(&mut pixels, focal.y as i64, 0, w, FOCAL_COLOR);
    }
}

/// Outlines each box with a 2-pixel border drawn inward. Parts outside
/// the frame are clipped.
pub fn draw_boxes(frame: &mut Frame, boxes: &[BoundingBox], color: Rgb) {
    let mut pixels = frame.as_ndarray_mut();
    for b in boxes {
        if b.width <= 0 || b.height <= 0 {
            continue;
        }
        let (x0, y0) = (b.x as i64, b.y as i64);
        let (x1, y1) = (x0 + b.width as i64, y0 + b.height as i64);
        for t in 0..BOX_THICKNESS.min(b.width as i64).min(b.height as i64) {
            draw_horizontal(&mut pixels, y0 + t, x0, x1, color);
            draw_horizontal(&mut pixels, y1 - 1 - t, x0, x1, color);
            draw_vertical(&mut pixels, x0 + t, y0, y1, color);
            draw_vertical(&mut pixels, x1 - 1 - t, y0, y1, color);
        }
    }
}

fn draw_horizontal(
    pixels: &mut ArrayViewMut3<'_, u8>,
    y: i64,
    x_start: i64,
    x_end: i64,
    color: Rgb,
) {
    for x in x_start..x_end {
        put_pixel(pixels, x, y, color);
    }
}

fn draw_vertical(
    pixels: &mut ArrayViewMut3<'_, u8>,
    x: i64,
    y_start: i64,
    y_end: i64,
    color: Rgb,
) {
    for y in y_start..y_end {
        put_pixel(pixels, x, y, color);
    }
}

/// Writes `color` at `(x, y)` of an `[H, W, C]` view; out-of-bounds is a no-op.
fn put_pixel(pixels: &mut ArrayViewMut3<'_, u8>, x: i64, y: i64, color: Rgb) {
    let (height, width, channels) = pixels.dim();
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return;
    }
    for (c, &value) in color.iter().enumerate().take(channels) {
        pixels[[y as usize, x as usize, c]] = value;
    }
}
