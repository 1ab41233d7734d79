pub mod eye_detector;
pub mod eye_locator;
pub mod face_detector;
pub mod face_landmarks;
pub mod focal_point;
