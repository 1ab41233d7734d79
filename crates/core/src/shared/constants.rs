use crate::shared::model_resolver::ModelSource;

/// YOLO face model with 5-point landmarks (eyes, nose, mouth corners).
pub const FACE_MODEL: ModelSource = ModelSource {
    name: "yolo11n-pose_widerface.onnx",
    url: "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx",
};

/// Fraction of the crop height above the focal point (upper-third rule).
pub const FOCAL_HEIGHT_FRACTION: f64 = 1.0 / 3.0;

/// Raster formats picked up when scanning an input tree.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Application directory name under the platform cache directory.
pub const APP_DIR_NAME: &str = "EyeCrop";
