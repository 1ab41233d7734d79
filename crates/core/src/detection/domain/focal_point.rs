use crate::shared::point::Point;

/// Aggregate target for the crop: the per-axis mean of all eye points.
///
/// Falls back to the image center when no eyes were found, so composition
/// never depends on a successful detection.
pub fn focal_point(eyes: &[Point], image_width: u32, image_height: u32) -> Point {
    Point::mean(eyes).unwrap_or_else(|| Point::image_center(image_width, image_height))
}
