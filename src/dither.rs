//! Contains the Floyd–Steinberg dither implementation.

use crate::{traits::to_f64_components, Palette, Pixel, PixelGrid};
use std::array;

/// The Floyd–Steinberg weights for the right, bottom left, bottom, and bottom right neighbors.
pub(crate) const WEIGHTS: [f64; 4] = [7.0 / 16.0, 3.0 / 16.0, 5.0 / 16.0, 1.0 / 16.0];

/// Floyd–Steinberg dithering.
///
/// The inner value is the dither strength, that is,
/// the fraction of each pixel's quantization error that is pushed onto its neighbors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloydSteinberg(f64);

impl FloydSteinberg {
    /// The default dither strength, which diffuses all of the error.
    pub const DEFAULT_STRENGTH: f64 = 1.0;

    /// Creates a new [`FloydSteinberg`] with the default strength.
    #[must_use]
    pub const fn new() -> Self {
        Self(Self::DEFAULT_STRENGTH)
    }

    /// Creates a new [`FloydSteinberg`] with the given strength.
    ///
    /// A strength of `1.0` diffuses all of the error to the neighboring pixels,
    /// while a strength of `0.0` diffuses nothing
    /// and gives the same output as [`remap`](crate::remap).
    ///
    /// This will return `None` if `strength` is not in the range `0.0..=1.0`.
    #[must_use]
    pub fn with_strength(strength: f64) -> Option<Self> {
        if (0.0..=1.0).contains(&strength) {
            Some(Self(strength))
        } else {
            None
        }
    }

    /// Gets the strength for this [`FloydSteinberg`].
    #[must_use]
    pub const fn strength(&self) -> f64 {
        self.0
    }
}

impl Default for FloydSteinberg {
    fn default() -> Self {
        Self::new()
    }
}

/// Multiplies `other` by a scalar, `alpha`, and adds the result to `arr`.
#[inline]
fn arr_mul_add_assign<const N: usize>(arr: &mut [f64; N], alpha: f64, other: [f64; N]) {
    for i in 0..N {
        arr[i] += alpha * other[i];
    }
}

/// Multiplies `other` by a scalar, `alpha`, and assigns the result to `arr`.
#[inline]
fn arr_mul_assign<const N: usize>(arr: &mut [f64; N], alpha: f64, other: [f64; N]) {
    for i in 0..N {
        arr[i] = alpha * other[i];
    }
}

/// Propagates, stores, and applies the dither error to the pixels.
///
/// Only the current and the next row are kept, since the kernel never reaches further down.
/// Both rows are padded with one cell on each side. Error pushed past the left or right edge
/// lands in the padding and is never applied, and error pushed below the last row is never read.
struct ErrorBuf<'a, const N: usize> {
    /// The propagated error for the current row of pixels.
    this_err: &'a mut [[f64; N]],
    /// The propagated error for the next row of pixels.
    next_err: &'a mut [[f64; N]],
}

impl<'a, const N: usize> ErrorBuf<'a, N> {
    /// Create the backing buffer for a new `ErrorBuf`.
    fn new_buf(width: usize) -> Vec<[f64; N]> {
        vec![[0.0; N]; 2 * (width + 2)]
    }

    /// Create a new `ErrorBuf` using the given `buf`
    fn new(width: usize, buf: &'a mut [[f64; N]]) -> Self {
        let (this_err, next_err) = buf.split_at_mut(width + 2);
        Self { this_err, next_err }
    }

    /// Propagate error using floyd steinberg dithering, going from left to right.
    ///
    /// `next_err[i + 2]` is assigned instead of added to,
    /// since no earlier pixel in this row has touched it yet.
    #[inline]
    fn propagate(&mut self, i: usize, err: [f64; N]) {
        let [right, bottom_left, bottom, bottom_right] = WEIGHTS;
        arr_mul_add_assign(&mut self.this_err[i + 2], right, err);
        arr_mul_add_assign(&mut self.next_err[i], bottom_left, err);
        arr_mul_add_assign(&mut self.next_err[i + 1], bottom, err);
        arr_mul_assign(&mut self.next_err[i + 2], bottom_right, err);
    }

    /// Apply the accumulated error to this pixel.
    #[inline]
    fn apply(&self, i: usize, point: &mut [f64; N]) {
        let err = self.this_err[i + 1];
        for i in 0..N {
            point[i] += err[i];
        }
    }

    /// Reset and swap the error buffers for the next row of pixels.
    #[inline]
    fn next_row(&mut self) {
        std::mem::swap(&mut self.this_err, &mut self.next_err);
        // the remaining cells are assigned by `propagate` before they are added to
        self.next_err[0] = [0.0; N];
        self.next_err[1] = [0.0; N];
    }
}

/// Dither a single pixel, returning the chosen palette index and the error to propagate.
///
/// The accumulated error is added to the pixel without clamping,
/// so the nearest color search may run on a point outside of the RGB cube.
#[inline]
fn dither_pixel(
    i: usize,
    mut point: [f64; 3],
    palette: &Palette,
    error: &ErrorBuf<3>,
    strength: f64,
) -> (usize, [f64; 3]) {
    error.apply(i, &mut point);
    let nearest = palette.nearest_index_f64(point);
    let nearest_point = palette.components(nearest);
    (nearest, array::from_fn(|c| strength * (point[c] - nearest_point[c])))
}

impl FloydSteinberg {
    /// Dithers `grid` onto `palette`, returning a new grid of the same dimensions.
    ///
    /// Pixels are visited in raster order:
    /// rows from top to bottom, and each row from left to right.
    /// Any non-RGB channel (e.g., alpha) is passed through unchanged.
    ///
    /// This always runs on the current thread, since each pixel depends on
    /// the error from the pixels before it. To use multiple threads,
    /// dither independent images in parallel instead
    /// (see [`Quantizer::quantize_batch_par`](crate::Quantizer::quantize_batch_par)).
    #[must_use]
    pub fn dither<P: Pixel>(&self, grid: &PixelGrid<P>, palette: &Palette) -> PixelGrid<P> {
        let &FloydSteinberg(strength) = self;
        let (width, height) = grid.dimensions();

        if grid.is_empty() {
            return PixelGrid::new_unchecked(Vec::new(), width, height);
        }

        let width = width as usize;
        let mut error = ErrorBuf::new_buf(width);
        let mut error = ErrorBuf::new(width, &mut error);
        let mut pixels = Vec::with_capacity(grid.len());

        for row in grid.rows() {
            for (i, &pixel) in row.iter().enumerate() {
                let point = to_f64_components(pixel.rgb());
                let (index, err) = dither_pixel(i, point, palette, &error, strength);
                error.propagate(i, err);
                pixels.push(pixel.with_rgb(palette.colors()[index]));
            }

            error.next_row();
        }

        PixelGrid::new_unchecked(pixels, grid.width(), grid.height())
    }
}
