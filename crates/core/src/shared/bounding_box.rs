use crate::shared::crop_rect::CropRect;
use crate::shared::point::Point;

/// An axis-aligned detection box: top-left corner plus size, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center of the box, with half-pixel precision.
    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Box translated by `(dx, dy)`, e.g. from ROI-local to image coordinates.
    pub fn offset(&self, dx: i32, dy: i32) -> BoundingBox {
        BoundingBox {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Intersection with a `width` x `height` image, or `None` if empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<CropRect> {
        let left = self.x.max(0) as i64;
        let top = self.y.max(0) as i64;
        let right = (self.x as i64 + self.width as i64).min(width as i64);
        let bottom = (self.y as i64 + self.height as i64).min(height as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(CropRect {
            left: left as u32,
            top: top as u32,
            right: right as u32,
            bottom: bottom as u32,
        })
    }
}
