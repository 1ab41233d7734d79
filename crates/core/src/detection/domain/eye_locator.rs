use std::sync::Arc;

use crate::detection::domain::eye_detector::EyeDetector;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::point::Point;

/// Face and eye boxes found in one image, in image coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EyeDetections {
    pub faces: Vec<BoundingBox>,
    pub eyes: Vec<BoundingBox>,
}

impl EyeDetections {
    pub fn eye_centers(&self) -> Vec<Point> {
        self.eyes.iter().map(BoundingBox::center).collect()
    }
}

/// Runs face detection on the grayscale image, then eye detection inside
/// each face, and maps every eye box back to image coordinates.
///
/// Finding no faces or no eyes is a normal outcome and yields an empty set.
#[derive(Clone)]
pub struct EyeLocator {
    face_detector: Arc<dyn FaceDetector>,
    eye_detector: Arc<dyn EyeDetector>,
}

impl EyeLocator {
    pub fn new(face_detector: Arc<dyn FaceDetector>, eye_detector: Arc<dyn EyeDetector>) -> Self {
        Self {
            face_detector,
            eye_detector,
        }
    }

    /// Eye centers in image coordinates. Order is unspecified.
    pub fn locate(&self, frame: &Frame) -> Result<Vec<Point>, Box<dyn std::error::Error>> {
        Ok(self.detect(frame)?.eye_centers())
    }

    /// Full detection result, including face boxes for debug overlays.
    pub fn detect(&self, frame: &Frame) -> Result<EyeDetections, Box<dyn std::error::Error>> {
        let gray = frame.to_grayscale();
        let faces = self.face_detector.detect_faces(&gray)?;

        let mut eyes = Vec::new();
        for face in &faces {
            let Some(roi) = face.clamp_to(gray.width(), gray.height()) else {
                log::debug!("Skipping face box outside the image: {face:?}");
                continue;
            };
            let face_pixels = gray.crop(&roi);
            for eye in self.eye_detector.detect_eyes(&face_pixels)? {
                eyes.push(eye.offset(roi.left as i32, roi.top as i32));
            }
        }

        log::debug!("Located {} eyes across {} faces", eyes.len(), faces.len());
        Ok(EyeDetections { faces, eyes })
    }
}
