use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection over a grayscale image.
///
/// Detectors are constructed once and shared read-only across concurrent
/// image tasks, hence `&self` and `Sync`.
pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, gray: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
