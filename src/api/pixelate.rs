//! Contains the [`PixelatePipeline`] builder struct for the high level API.

use crate::{DitherMode, Palette, PipelineError, PixelGrid, QuantizeError, Quantizer};
use image::{imageops::FilterType, RgbaImage};
use palette::Srgba;
#[cfg(feature = "serde")]
use serde::Deserialize;
use std::{path::Path, time::Instant};

/// The size of the image returned by a [`PixelatePipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "kebab-case"))]
pub enum Resolution {
    /// Scale the pixelated image back up to the size of the input image.
    #[default]
    Original,
    /// Return the pixelated image at its reduced size.
    Pixel,
}

/// Plain configuration for a [`PixelatePipeline`], e.g., as read from a JSON file.
///
/// Missing fields take their [`Default`] values.
///
/// # Examples
/// ```
/// # use pixelette::{DitherMode, PixelateConfig};
/// # fn main() -> Result<(), serde_json::Error> {
/// let config: PixelateConfig =
///     serde_json::from_str(r#"{ "width": 175, "dither": "floyd-steinberg", "strength": 0.25 }"#)?;
/// assert_eq!(config.dither, DitherMode::FloydSteinberg);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct PixelateConfig {
    /// The width in pixels of the reduced image.
    pub width: u32,
    /// How pixels are mapped onto the palette.
    pub dither: DitherMode,
    /// The dither strength in `0.0..=1.0`.
    pub strength: f64,
    /// The size of the returned image.
    pub resolution: Resolution,
}

impl PixelateConfig {
    /// The default width of the reduced image.
    pub const DEFAULT_WIDTH: u32 = 256;
}

impl Default for PixelateConfig {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            dither: DitherMode::None,
            strength: 0.0,
            resolution: Resolution::Original,
        }
    }
}

/// A builder struct to pixelate an image:
/// shrink it, map it onto a palette, and optionally scale it back up.
///
/// Both resizes use nearest neighbor sampling, so the upscaled output keeps hard pixel edges.
/// The alpha channel is resized along with the colors but is never quantized.
///
/// # Examples
/// ```no_run
/// # use pixelette::{DitherMode, Palette, PixelatePipeline};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let image = image::open("some image")?.into_rgba8();
///
/// let pixelated = PixelatePipeline::new(175)
///     .palette(Palette::load(["#000000", "#7f7f7f", "#ffffff"])?)
///     .dither_mode(DitherMode::FloydSteinberg)
///     .strength(0.25)
///     .pixelate(&image)?;
/// # Ok(())
/// # }
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct PixelatePipeline {
    /// The palette to map the reduced image onto, if any.
    palette: Option<Palette>,
    /// The width of the reduced image.
    width: u32,
    /// The dither options.
    quantizer: Quantizer,
    /// The size of the returned image.
    resolution: Resolution,
}

impl Default for PixelatePipeline {
    fn default() -> Self {
        Self::from_config(&PixelateConfig::default())
    }
}

impl PixelatePipeline {
    /// Creates a new [`PixelatePipeline`] that reduces images to the given `width`.
    ///
    /// No palette is set, so by default the image is only resized.
    pub fn new(width: u32) -> Self {
        Self {
            palette: None,
            width,
            quantizer: Quantizer::new(),
            resolution: Resolution::Original,
        }
    }

    /// Creates a new [`PixelatePipeline`] from a [`PixelateConfig`].
    pub fn from_config(config: &PixelateConfig) -> Self {
        let &PixelateConfig { width, dither, strength, resolution } = config;
        Self {
            palette: None,
            width,
            quantizer: Quantizer::new().dither_mode(dither).strength(strength),
            resolution,
        }
    }

    /// Sets the palette to map the reduced image onto.
    pub fn palette(&mut self, palette: Palette) -> &mut Self {
        self.palette = Some(palette);
        self
    }

    /// Sets the width of the reduced image. The height follows the aspect ratio of the input.
    pub fn width(&mut self, width: u32) -> &mut Self {
        self.width = width;
        self
    }

    /// Sets the dither mode.
    ///
    /// The default dither mode is [`DitherMode::None`].
    pub fn dither_mode(&mut self, mode: DitherMode) -> &mut Self {
        self.quantizer = self.quantizer.dither_mode(mode);
        self
    }

    /// Sets the dither strength, which must be in the range `0.0..=1.0`.
    ///
    /// The default strength is `0.0`.
    pub fn strength(&mut self, strength: f64) -> &mut Self {
        self.quantizer = self.quantizer.strength(strength);
        self
    }

    /// Sets the size of the returned image.
    ///
    /// The default resolution is [`Resolution::Original`].
    pub fn resolution(&mut self, resolution: Resolution) -> &mut Self {
        self.resolution = resolution;
        self
    }

    /// Checks that the options are valid without processing an image.
    ///
    /// # Errors
    /// Returns [`QuantizeError::InvalidParameter`] if the width is zero
    /// or the dither strength is out of range.
    pub fn validate(&self) -> Result<(), QuantizeError> {
        if self.width == 0 {
            return Err(QuantizeError::InvalidParameter(
                "pixelate width must be non-zero".to_owned(),
            ));
        }
        self.quantizer.ditherer()?;
        Ok(())
    }

    /// Returns the size of the reduced image for an input of the given size.
    ///
    /// The height is truncated but never less than `1`.
    fn reduced_dimensions(&self, (width, height): (u32, u32)) -> (u32, u32) {
        let reduced = u64::from(self.width) * u64::from(height) / u64::from(width);
        (self.width, u32::try_from(reduced).unwrap_or(u32::MAX).max(1))
    }

    /// Runs the pipeline with the given quantization function.
    fn run(
        &self,
        image: &RgbaImage,
        quantize: impl FnOnce(
            &Quantizer,
            &PixelGrid<Srgba<u8>>,
            &Palette,
        ) -> Result<PixelGrid<Srgba<u8>>, QuantizeError>,
    ) -> Result<RgbaImage, QuantizeError> {
        self.validate()?;

        let dimensions = image.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            return Ok(image.clone());
        }

        let time = Instant::now();
        let (width, height) = self.reduced_dimensions(dimensions);
        let reduced = image::imageops::resize(image, width, height, FilterType::Nearest);

        let reduced = match &self.palette {
            Some(palette) => {
                quantize(&self.quantizer, &PixelGrid::from(&reduced), palette)?.into_rgbaimage()
            }
            None => reduced,
        };

        let output = match self.resolution {
            Resolution::Original => {
                image::imageops::resize(&reduced, dimensions.0, dimensions.1, FilterType::Nearest)
            }
            Resolution::Pixel => reduced,
        };

        log::debug!(
            "pixelated {}x{} image at {width}x{height} in {}ms",
            dimensions.0,
            dimensions.1,
            time.elapsed().as_millis()
        );

        Ok(output)
    }

    /// Runs the pipeline on `image`.
    ///
    /// # Errors
    /// See [`PixelatePipeline::validate`]. Options are validated before the image is touched.
    pub fn pixelate(&self, image: &RgbaImage) -> Result<RgbaImage, QuantizeError> {
        self.run(image, Quantizer::quantize)
    }

    /// Opens the image at `path` and runs the pipeline on it.
    ///
    /// # Errors
    /// Returns [`PipelineError::Image`] if the image cannot be read,
    /// otherwise see [`PixelatePipeline::pixelate`].
    pub fn pixelate_file(&self, path: impl AsRef<Path>) -> Result<RgbaImage, PipelineError> {
        self.validate()?;
        let image = image::open(path)?.into_rgba8();
        Ok(self.pixelate(&image)?)
    }
}

#[cfg(feature = "threads")]
impl PixelatePipeline {
    /// Runs the pipeline on `image`, remapping pixels in parallel if no dithering is done.
    ///
    /// The output is the same as [`PixelatePipeline::pixelate`].
    ///
    /// # Errors
    /// See [`PixelatePipeline::pixelate`].
    pub fn pixelate_par(&self, image: &RgbaImage) -> Result<RgbaImage, QuantizeError> {
        self.run(image, Quantizer::quantize_par)
    }
}
