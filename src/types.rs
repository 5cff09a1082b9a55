//! Contains the [`PixelGrid`] type shared across the crate.

use std::slice::ChunksExact;
#[cfg(feature = "image")]
use {
    image::{RgbImage, RgbaImage},
    palette::{
        cast::{ComponentsAs, IntoComponents},
        Srgb, Srgba,
    },
};

/// A row-major grid of pixels with a fixed width and height.
///
/// The invariant is that the number of pixels is always `width * height`.
/// Grids with zero width or height are valid and simply contain no pixels.
///
/// # Examples
/// Use [`PixelGrid::new`] to create a grid from a flat `Vec` of pixels:
/// ```
/// # use pixelette::PixelGrid;
/// # use palette::Srgb;
/// let grid = PixelGrid::new(vec![Srgb::new(0u8, 0, 0); 6], 3, 2).unwrap();
/// assert_eq!(grid.dimensions(), (3, 2));
/// ```
///
/// From an image (needs the `image` feature to be enabled):
/// ```no_run
/// # use pixelette::PixelGrid;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgba8();
/// let grid = PixelGrid::from(&img);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid<P> {
    /// The pixels in row-major order.
    pixels: Vec<P>,
    /// The number of pixels in each row.
    width: u32,
    /// The number of rows.
    height: u32,
}

impl<P> PixelGrid<P> {
    /// Creates a new [`PixelGrid`] from a flat list of pixels in row-major order.
    /// Returns `None` if the length of `pixels` is not equal to `width * height`.
    #[must_use]
    pub fn new(pixels: Vec<P>, width: u32, height: u32) -> Option<Self> {
        if pixels.len() == width as usize * height as usize {
            Some(Self { pixels, width, height })
        } else {
            None
        }
    }

    /// Creates a [`PixelGrid`] without checking that `pixels.len() == width * height`.
    pub(crate) fn new_unchecked(pixels: Vec<P>, width: u32, height: u32) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self { pixels, width, height }
    }

    /// Returns the width of the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the number of pixels in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns `true` if the grid has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the pixels as a flat slice in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    /// Consumes the grid and returns its pixels in row-major order.
    #[must_use]
    pub fn into_pixels(self) -> Vec<P> {
        self.pixels
    }

    /// Returns the pixel at column `x` and row `y`, or `None` if out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<&P> {
        if x < self.width && y < self.height {
            self.pixels.get(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Returns an iterator over the rows of the grid, from top to bottom.
    pub fn rows(&self) -> ChunksExact<'_, P> {
        // a zero width grid has no pixels, so any non-zero chunk size yields no rows
        self.pixels.chunks_exact((self.width as usize).max(1))
    }
}

#[cfg(feature = "image")]
impl From<&RgbImage> for PixelGrid<Srgb<u8>> {
    fn from(image: &RgbImage) -> Self {
        let len = image.pixels().len() * 3;
        let pixels: &[Srgb<u8>] = image.as_raw()[..len].components_as();
        Self::new_unchecked(pixels.to_vec(), image.width(), image.height())
    }
}

#[cfg(feature = "image")]
impl From<&RgbaImage> for PixelGrid<Srgba<u8>> {
    fn from(image: &RgbaImage) -> Self {
        let len = image.pixels().len() * 4;
        let pixels: &[Srgba<u8>] = image.as_raw()[..len].components_as();
        Self::new_unchecked(pixels.to_vec(), image.width(), image.height())
    }
}

#[cfg(feature = "image")]
impl PixelGrid<Srgb<u8>> {
    /// Converts this grid into an [`RgbImage`].
    #[must_use]
    pub fn into_rgbimage(self) -> RgbImage {
        let Self { pixels, width, height } = self;

        #[allow(clippy::expect_used)]
        {
            // pixels.len() is width * height by the grid invariant
            RgbImage::from_vec(width, height, pixels.into_components())
                .expect("large enough buffer")
        }
    }
}

#[cfg(feature = "image")]
impl PixelGrid<Srgba<u8>> {
    /// Converts this grid into an [`RgbaImage`].
    #[must_use]
    pub fn into_rgbaimage(self) -> RgbaImage {
        let Self { pixels, width, height } = self;

        #[allow(clippy::expect_used)]
        {
            // pixels.len() is width * height by the grid invariant
            RgbaImage::from_vec(width, height, pixels.into_components())
                .expect("large enough buffer")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::Srgb;

    #[test]
    fn rejects_mismatched_length() {
        assert!(PixelGrid::new(vec![Srgb::new(0u8, 0, 0); 5], 3, 2).is_none());
        assert!(PixelGrid::new(vec![Srgb::new(0u8, 0, 0); 6], 3, 2).is_some());
    }

    #[test]
    fn zero_area_grids() {
        for (width, height) in [(0, 0), (0, 4), (4, 0)] {
            let grid = PixelGrid::<Srgb<u8>>::new(Vec::new(), width, height).unwrap();
            assert!(grid.is_empty());
            assert_eq!(grid.rows().count(), 0);
            assert_eq!(grid.dimensions(), (width, height));
        }
    }

    #[test]
    fn get_is_row_major() {
        let pixels = (0..6).map(|i| Srgb::new(i, 0, 0)).collect::<Vec<_>>();
        let grid = PixelGrid::new(pixels, 3, 2).unwrap();
        assert_eq!(grid.get(1, 1), Some(&Srgb::new(4, 0, 0)));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 2), None);
        assert_eq!(grid.rows().count(), 2);
    }

    #[cfg(feature = "image")]
    #[test]
    fn image_conversion_keeps_alpha() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(1, 0, image::Rgba([10, 20, 30, 40]));
        let grid = PixelGrid::from(&image);
        assert_eq!(grid.get(1, 0), Some(&Srgba::new(10, 20, 30, 40)));
        assert_eq!(grid.into_rgbaimage(), image);
    }
}
