//! Contains the [`Pixel`] trait for the pixel types that can be quantized.

use palette::{Srgb, Srgba, WithAlpha};

/// A pixel type that can be quantized.
///
/// Only the RGB part of a pixel takes part in quantization.
/// Any other channel (e.g., alpha) is carried over to the output unchanged.
pub trait Pixel: Copy + 'static {
    /// Returns the RGB color of this pixel.
    fn rgb(self) -> Srgb<u8>;

    /// Returns this pixel with its RGB color replaced by `rgb`.
    #[must_use]
    fn with_rgb(self, rgb: Srgb<u8>) -> Self;
}

impl Pixel for Srgb<u8> {
    #[inline]
    fn rgb(self) -> Srgb<u8> {
        self
    }

    #[inline]
    fn with_rgb(self, rgb: Srgb<u8>) -> Self {
        rgb
    }
}

impl Pixel for Srgba<u8> {
    #[inline]
    fn rgb(self) -> Srgb<u8> {
        self.color
    }

    #[inline]
    fn with_rgb(self, rgb: Srgb<u8>) -> Self {
        rgb.with_alpha(self.alpha)
    }
}

/// Converts a color into an array of `f64` components.
#[inline]
pub(crate) fn to_f64_components(color: Srgb<u8>) -> [f64; 3] {
    [color.red, color.green, color.blue].map(f64::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_passes_through() {
        let pixel = Srgba::new(1, 2, 3, 77);
        let replaced = pixel.with_rgb(Srgb::new(9, 8, 7));
        assert_eq!(replaced, Srgba::new(9, 8, 7, 77));
        assert_eq!(replaced.rgb(), Srgb::new(9, 8, 7));
    }
}
