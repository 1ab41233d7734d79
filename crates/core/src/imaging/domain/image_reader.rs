use std::path::Path;

use crate::shared::frame::Frame;

/// Decodes a still image into an RGB [`Frame`].
///
/// Implementations are shared between batch workers, so decoding must not
/// depend on per-call mutable state.
pub trait ImageReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
