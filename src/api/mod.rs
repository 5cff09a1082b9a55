//! Contains the types and functions for the high level image and animation pipelines.

mod animation;
mod pixelate;

pub use animation::{
    sample_frames, AnimationEncoder, AnimationPipeline, BackgroundRemover, BoxError, FrameDir,
    GifAnimation,
};
pub use pixelate::{PixelateConfig, PixelatePipeline, Resolution};
