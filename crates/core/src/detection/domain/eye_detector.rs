use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for eye detection within a single face region.
///
/// Boxes are returned in the coordinate space of `face` (ROI-local).
pub trait EyeDetector: Send + Sync {
    fn detect_eyes(&self, face: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
