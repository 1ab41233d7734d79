use std::path::Path;

use image::{ColorType, ImageFormat};

use crate::imaging::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Encodes frames with the `image` crate, creating parent directories
/// as needed.
#[derive(Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let color = match frame.channels() {
            1 => ColorType::L8,
            3 => ColorType::Rgb8,
            n => return Err(format!("Unsupported channel count: {n}").into()),
        };
        let format = ImageFormat::from_path(path)?;
        image::save_buffer_with_format(
            path,
            frame.data(),
            frame.width(),
            frame.height(),
            color,
            format,
        )?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
