//! Contains the [`Quantizer`] builder struct, the validated entry point for palette quantization.

#[cfg(feature = "threads")]
use crate::remap_par;
use crate::{remap, FloydSteinberg, Palette, Pixel, PixelGrid, QuantizeError};
#[cfg(feature = "threads")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::Deserialize;
use std::{fmt::Display, str::FromStr};

/// The supported ways of mapping pixels onto a palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "kebab-case"))]
pub enum DitherMode {
    /// Map each pixel to its nearest palette color independently (see [`remap`]).
    #[default]
    None,
    /// Diffuse the quantization error onto neighboring pixels (see [`FloydSteinberg`]).
    FloydSteinberg,
}

impl FromStr for DitherMode {
    type Err = QuantizeError;

    /// Parses `"none"` or `"floyd-steinberg"`, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            Ok(Self::None)
        } else if s.eq_ignore_ascii_case("floyd-steinberg") {
            Ok(Self::FloydSteinberg)
        } else {
            Err(QuantizeError::InvalidParameter(format!("unknown dither mode {s:?}")))
        }
    }
}

impl Display for DitherMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DitherMode::None => "none",
                DitherMode::FloydSteinberg => "floyd-steinberg",
            }
        )
    }
}

/// A builder struct to specify how an image is mapped onto a palette.
///
/// Parameters are only validated once a grid is quantized.
/// Invalid parameters fail before any pixel is processed.
///
/// # Examples
/// ```
/// # use pixelette::{DitherMode, Palette, PixelGrid, Quantizer, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// let palette = Palette::load(["#000000", "#FFFFFF"])?;
/// let pixels = vec![Srgb::new(10u8, 10, 10), Srgb::new(250, 250, 250)];
/// let grid = PixelGrid::new(pixels, 2, 1).unwrap();
///
/// let quantized = Quantizer::new()
///     .dither_mode(DitherMode::FloydSteinberg)
///     .strength(0.25)
///     .quantize(&grid, &palette)?;
///
/// assert_eq!(quantized.pixels(), &[Srgb::new(0, 0, 0), Srgb::new(255, 255, 255)]);
/// # Ok(())
/// # }
/// ```
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    /// How pixels are mapped onto the palette.
    mode: DitherMode,
    /// The fraction of the quantization error to diffuse when dithering.
    strength: f64,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Quantizer {
    /// Creates a new [`Quantizer`] with no dithering and a strength of `0.0`.
    pub const fn new() -> Self {
        Self { mode: DitherMode::None, strength: 0.0 }
    }

    /// Sets the dither mode.
    ///
    /// The default dither mode is [`DitherMode::None`].
    pub const fn dither_mode(mut self, mode: DitherMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the dither strength, which must be in the range `0.0..=1.0`.
    ///
    /// It is validated even if dithering is turned off.
    ///
    /// The default strength is `0.0`.
    pub const fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Returns the current dither mode.
    #[must_use]
    pub const fn mode(&self) -> DitherMode {
        self.mode
    }

    /// Validates the parameters and creates the ditherer they specify, if any.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidParameter`] if the strength is not in `0.0..=1.0`.
    pub fn ditherer(&self) -> Result<Option<FloydSteinberg>, QuantizeError> {
        let ditherer = FloydSteinberg::with_strength(self.strength).ok_or_else(|| {
            QuantizeError::InvalidParameter(format!(
                "dither strength must be in the range 0.0..=1.0, got {}",
                self.strength
            ))
        })?;

        Ok(match self.mode {
            DitherMode::None => None,
            DitherMode::FloydSteinberg => Some(ditherer),
        })
    }

    /// Maps `grid` onto `palette`, returning a new grid of the same dimensions.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidParameter`] if the strength is out of range.
    pub fn quantize<P: Pixel>(
        &self,
        grid: &PixelGrid<P>,
        palette: &Palette,
    ) -> Result<PixelGrid<P>, QuantizeError> {
        Ok(match self.ditherer()? {
            Some(ditherer) => ditherer.dither(grid, palette),
            None => remap(grid, palette),
        })
    }
}

#[cfg(feature = "threads")]
impl Quantizer {
    /// Maps `grid` onto `palette`, using multiple threads if no dithering is done.
    ///
    /// Dithering is inherently sequential, so it still runs on the current thread.
    /// The output is the same as [`Quantizer::quantize`].
    ///
    /// # Errors
    /// See [`Quantizer::quantize`].
    pub fn quantize_par<P: Pixel + Send + Sync>(
        &self,
        grid: &PixelGrid<P>,
        palette: &Palette,
    ) -> Result<PixelGrid<P>, QuantizeError> {
        Ok(match self.ditherer()? {
            Some(ditherer) => ditherer.dither(grid, palette),
            None => remap_par(grid, palette),
        })
    }

    /// Maps each of the independent `grids` (e.g., animation frames) onto `palette` in parallel.
    ///
    /// The outputs are in the same order as `grids`.
    ///
    /// # Errors
    /// See [`Quantizer::quantize`].
    /// The parameters are validated once, before any grid is processed.
    pub fn quantize_batch_par<P: Pixel + Send + Sync>(
        &self,
        grids: &[PixelGrid<P>],
        palette: &Palette,
    ) -> Result<Vec<PixelGrid<P>>, QuantizeError> {
        let ditherer = self.ditherer()?;
        Ok(grids
            .par_iter()
            .map(|grid| match ditherer {
                Some(ditherer) => ditherer.dither(grid, palette),
                None => remap(grid, palette),
            })
            .collect())
    }
}
