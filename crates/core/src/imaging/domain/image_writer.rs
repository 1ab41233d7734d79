use std::path::Path;

use crate::shared::frame::Frame;

/// Encodes a frame to an image file. The format follows the path extension.
pub trait ImageWriter: Send + Sync {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
