//! A library for "pixel-art" stylization of images and animations by palette quantization.
//!
//! Every pixel is mapped onto the nearest color (by squared euclidean distance in RGB)
//! of a fixed, user-supplied [`Palette`], optionally with [`FloydSteinberg`] error diffusion
//! to preserve the perceived tone of gradients.
//!
//! # Features
//! To reduce dependencies and compile times, `pixelette` has several `cargo` features
//! that can be turned off or on:
//! - `threads`: exposes parallel versions of the remapping and batch functions via [`rayon`].
//! - `image`: enables integration with the [`image`] crate and the pixelation/animation pipelines.
//! - `serde`: allows loading palette files and pipeline configuration from JSON.
//!
//! # Low-Level API
//! Parse a [`Palette`], wrap the pixels in a [`PixelGrid`], and run a [`Quantizer`]:
//! ```
//! # use pixelette::{DitherMode, Palette, PixelGrid, Quantizer};
//! # use palette::Srgb;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let palette = Palette::load(["#1a1c2c", "#5d275d", "#b13e53", "#ef7d57"])?;
//! let grid = PixelGrid::new(vec![Srgb::new(120u8, 40, 70); 16], 4, 4).ok_or("bad grid")?;
//!
//! let quantized = Quantizer::new()
//!     .dither_mode(DitherMode::FloydSteinberg)
//!     .strength(0.25)
//!     .quantize(&grid, &palette)?;
//! # Ok(())
//! # }
//! ```
//!
//! # High-Level API
//! With the `image` feature, see [`PixelatePipeline`] to pixelate a whole image,
//! and [`AnimationPipeline`] to turn a sequence of frames into a pixelated GIF.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod color_palette;
mod dither;
mod error;
mod quantize;
mod remap;
mod traits;
mod types;

#[cfg(feature = "image")]
mod api;

pub use color_palette::*;
pub use dither::FloydSteinberg;
pub use error::*;
pub use quantize::*;
pub use remap::*;
pub use traits::Pixel;
pub use types::*;

#[cfg(feature = "image")]
pub use api::*;

#[cfg(test)]
pub(crate) mod tests {
    use crate::{Palette, Pixel, PixelGrid};
    use palette::Srgb;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoroshiro128PlusPlus;

    fn test_data(seed: u64, len: usize) -> Vec<Srgb<u8>> {
        let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
        (0..len)
            .map(|_| Srgb::new(rng.gen(), rng.gen(), rng.gen()))
            .collect()
    }

    pub fn test_data_256() -> Vec<Srgb<u8>> {
        test_data(0, 256)
    }

    pub fn test_data_1024() -> Vec<Srgb<u8>> {
        test_data(1, 1024)
    }

    pub fn test_grid_32x32() -> PixelGrid<Srgb<u8>> {
        PixelGrid::new(test_data_1024(), 32, 32).unwrap()
    }

    pub fn black_and_white() -> Palette {
        Palette::new(vec![Srgb::new(0, 0, 0), Srgb::new(255, 255, 255)]).unwrap()
    }

    pub fn assert_all_in_palette<P: Pixel>(pixels: &[P], palette: &Palette) {
        for pixel in pixels {
            assert!(palette.colors().contains(&pixel.rgb()));
        }
    }
}
