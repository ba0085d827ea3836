//! Image sinks: where finished frames go.

use std::path::Path;

use thiserror::Error;

/// Errors raised while persisting an image.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("{width}x{height} image needs {expected} pixels, got {found}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        found: usize,
    },

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Persists a row-major RGB8 image.
pub trait ImageSink {
    fn write(&self, pixels: &[[u8; 3]], width: u32, height: u32, path: &Path) -> SinkResult<()>;
}

/// Writes images with the `image` crate; the format follows the extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngSink;

impl ImageSink for PngSink {
    fn write(&self, pixels: &[[u8; 3]], width: u32, height: u32, path: &Path) -> SinkResult<()> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(SinkError::SizeMismatch {
                width,
                height,
                expected,
                found: pixels.len(),
            });
        }

        let bytes: Vec<u8> = pixels.iter().flatten().copied().collect();
        let buffer = image::RgbImage::from_raw(width, height, bytes).ok_or(
            SinkError::SizeMismatch {
                width,
                height,
                expected,
                found: pixels.len(),
            },
        )?;
        buffer.save(path)?;

        log::info!("Wrote {}x{} image to {}", width, height, path.display());
        Ok(())
    }
}
