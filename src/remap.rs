//! Contains direct (non-dithered) palette remapping.
//!
//! Each pixel is mapped to its nearest palette color independently of every other pixel,
//! so the parallel versions give the exact same output as the single-threaded ones.

use crate::{Palette, Pixel, PixelGrid};
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// Maps every pixel of `grid` to its nearest color in `palette`.
///
/// Any non-RGB channel (e.g., alpha) is passed through unchanged.
/// The returned grid has the same dimensions as `grid`.
#[must_use]
pub fn remap<P: Pixel>(grid: &PixelGrid<P>, palette: &Palette) -> PixelGrid<P> {
    let pixels = grid
        .pixels()
        .iter()
        .map(|&p| p.with_rgb(palette.nearest(p.rgb())))
        .collect();

    PixelGrid::new_unchecked(pixels, grid.width(), grid.height())
}

/// Maps every pixel of `grid` to its nearest color in `palette` in parallel.
///
/// This gives the same output as [`remap`].
#[cfg(feature = "threads")]
#[must_use]
pub fn remap_par<P: Pixel + Send + Sync>(grid: &PixelGrid<P>, palette: &Palette) -> PixelGrid<P> {
    let pixels = grid
        .pixels()
        .par_iter()
        .map(|&p| p.with_rgb(palette.nearest(p.rgb())))
        .collect();

    PixelGrid::new_unchecked(pixels, grid.width(), grid.height())
}
