//! Error types for stachematch.

use thiserror::Error;

/// Result alias for stachematch operations.
pub type StacheResult<T> = std::result::Result<T, StacheError>;

/// Errors that can occur while building images, templates and databases.
///
/// A template that does not fit inside the searched image is not an error;
/// searches simply report no matches in that case.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StacheError {
    /// Image bytes could not be decoded.
    #[error("failed to decode image: {reason}")]
    Decode { reason: String },
    /// A template record or filename is missing required placement fields.
    #[error("bad template metadata in {name:?}: {reason}")]
    Metadata { name: String, reason: &'static str },
    /// Filesystem access failed.
    #[error("i/o error for {path}: {reason}")]
    Io { path: String, reason: String },
    /// Width and height do not describe a representable buffer.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The provided buffer does not hold `width * height` values.
    #[error("buffer length mismatch: needed {needed}, got {got}")]
    BufferLength { needed: usize, got: usize },
    /// A requested sub-window exceeds the image bounds.
    #[error("roi out of bounds: x={x}, y={y}, width={width}, height={height}, image={img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A database could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialize { reason: String },
}

impl StacheError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}
