//! Contains the error types returned by this crate.

use thiserror::Error;

/// An error raised while parsing a palette or validating quantization parameters.
///
/// All of these are raised before any pixel is processed,
/// so a caller never receives a partially quantized grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantizeError {
    /// The palette has no colors.
    #[error("palette must contain at least one color")]
    EmptyPalette,

    /// A palette entry is not a 6 digit hexadecimal color.
    #[error("invalid color format: {0:?}")]
    InvalidColorFormat(String),

    /// A caller-supplied parameter is out of range or unknown.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// An error raised by the file loading, image, and animation pipelines.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Palette or parameter validation failed.
    #[error("quantization error: {0}")]
    Quantize(#[from] QuantizeError),

    /// Decoding, encoding, or saving an image failed.
    #[cfg(feature = "image")]
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Encoding an animated GIF failed.
    #[cfg(feature = "image")]
    #[error("GIF error: {0}")]
    Gif(#[from] gif::EncodingError),

    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A palette or configuration file is not valid JSON.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The background removal collaborator returned an error.
    #[error("background removal failed: {0}")]
    BackgroundRemoval(String),

    /// An animation was requested from an empty frame sequence.
    #[error("no frames to encode")]
    NoFrames,
}
