/// A 2D coordinate in image pixel space with sub-pixel precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Geometric center of a `width` x `height` image.
    pub fn image_center(width: u32, height: u32) -> Self {
        Self::new(width as f64 / 2.0, height as f64 / 2.0)
    }

    /// Arithmetic mean of `points`, computed independently per axis.
    ///
    /// Returns `None` for an empty slice.
    pub fn mean(points: &[Point]) -> Option<Point> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_image_center() {
        let c = Point::image_center(801, 600);
        assert_relative_eq!(c.x, 400.5);
        assert_relative_eq!(c.y, 300.0);
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert!(Point::mean(&[]).is_none());
    }

    #[test]
    fn test_mean_single_point() {
        let p = Point::new(12.5, 7.0);
        assert_eq!(Point::mean(&[p]), Some(p));
    }

    #[test]
    fn test_mean_is_per_axis() {
        let m = Point::mean(&[
            Point::new(100.0, 100.0),
            Point::new(200.0, 120.0),
            Point::new(150.0, 90.0),
        ])
        .unwrap();
        assert_relative_eq!(m.x, 150.0);
        assert_relative_eq!(m.y, 310.0 / 3.0, epsilon = 1e-9);
    }
}
