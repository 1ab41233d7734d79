/// Axis-aligned crop bounds in image pixels, `left..right` x `top..bottom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True when the rectangle is non-empty and inside a `width` x `height` image.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.left < self.right
            && self.top < self.bottom
            && self.right <= width
            && self.bottom <= height
    }
}
