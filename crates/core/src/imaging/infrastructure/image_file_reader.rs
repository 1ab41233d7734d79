use std::path::Path;

use image::{DynamicImage, ImageDecoder};

use crate::imaging::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Decodes image files with the `image` crate.
///
/// EXIF orientation is applied so the frame matches what a viewer shows.
/// Every pixel format is converted to 8-bit RGB.
#[derive(Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let mut decoder = image::ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut img = DynamicImage::from_decoder(decoder)?;
        img.apply_orientation(orientation);

        let frame = to_rgb_frame(img)?;
        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        Ok(frame)
    }
}

/// Converts a decoded image to an RGB frame. Empty images are rejected.
fn to_rgb_frame(img: DynamicImage) -> Result<Frame, Box<dyn std::error::Error>> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(format!("Image has no pixels ({width}x{height})").into());
    }
    Ok(Frame::new(rgb.into_raw(), width, height, 3))
}
