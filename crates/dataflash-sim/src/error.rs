//! Error types for the emulator's backing image

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading or saving a flash image
#[derive(Debug, Error)]
pub enum ImageError {
    /// Failed to read the image file
    #[error("Failed to read {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the image file
    #[error("Failed to write {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image does not match the emulated density
    #[error("Image is {actual} bytes, but the emulated device holds {expected} bytes")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Result type for image operations
pub type Result<T> = std::result::Result<T, ImageError>;
