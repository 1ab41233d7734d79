//! 5-point face landmarks as emitted by pose-style face detectors.
//!
//! Only the eye keypoints matter here; they are turned into small square
//! eye boxes so landmark detectors can serve as eye detectors.

use crate::shared::bounding_box::BoundingBox;
use crate::shared::point::Point;

const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;

/// Eye box side length as a fraction of the face box width.
pub const EYE_BOX_FACE_FRACTION: f64 = 0.25;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// `[left_eye, right_eye, nose, left_mouth, right_mouth]`.
    /// Points with x <= 0 are treated as invisible.
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    /// Visible eye keypoints, left eye first.
    pub fn visible_eyes(&self) -> Vec<Point> {
        [LEFT_EYE, RIGHT_EYE]
            .iter()
            .map(|&i| self.points[i])
            .filter(|(x, _)| *x > 0.0)
            .map(|(x, y)| Point::new(x, y))
            .collect()
    }

    /// Square boxes centered on each visible eye, sized relative to the face.
    pub fn eye_boxes(&self, face_width: f64) -> Vec<BoundingBox> {
        let side = (face_width * EYE_BOX_FACE_FRACTION).round().max(1.0);
        self.visible_eyes()
            .into_iter()
            .map(|eye| {
                BoundingBox::new(
                    (eye.x - side / 2.0).round() as i32,
                    (eye.y - side / 2.0).round() as i32,
                    side as i32,
                    side as i32,
                )
            })
            .collect()
    }
}
