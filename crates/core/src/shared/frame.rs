use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::crop_rect::CropRect;

/// Rec. 601 luma weights, the same conversion used by common grayscale decoders.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// A decoded raster image: contiguous bytes in row-major order.
///
/// Holds either RGB (3 channels) or grayscale (1 channel) pixels.
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Single-channel copy of this frame. Grayscale frames are cloned as-is.
    pub fn to_grayscale(&self) -> Frame {
        if self.channels == 1 {
            return self.clone();
        }
        let channels = self.channels as usize;
        let gray = self
            .data
            .chunks_exact(channels)
            .map(|px| {
                let luma: f32 = px
                    .iter()
                    .take(3)
                    .zip(LUMA_WEIGHTS.iter())
                    .map(|(&v, &w)| v as f32 * w)
                    .sum();
                luma.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Frame::new(gray, self.width, self.height, 1)
    }

    /// Copies the pixels inside `rect` into a new frame.
    ///
    /// `rect` must lie within the frame bounds.
    pub fn crop(&self, rect: &CropRect) -> Frame {
        debug_assert!(rect.right <= self.width && rect.bottom <= self.height);
        let channels = self.channels as usize;
        let stride = self.width as usize * channels;
        let row_len = rect.width() as usize * channels;

        let mut data = Vec::with_capacity(row_len * rect.height() as usize);
        for row in rect.top as usize..rect.bottom as usize {
            let start = row * stride + rect.left as usize * channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Frame::new(data, rect.width(), rect.height(), self.channels)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
