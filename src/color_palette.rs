//! Contains the [`Palette`] type and hex color parsing.

use crate::{traits::to_f64_components, QuantizeError};
use ordered_float::OrderedFloat;
use palette::Srgb;
#[cfg(feature = "serde")]
use {
    crate::PipelineError,
    serde::Deserialize,
    std::{
        fs::File,
        io::{BufReader, Read},
        path::Path,
    },
};

/// Parses a hexadecimal color of the form `#RRGGBB` or `RRGGBB` (case-insensitive).
///
/// # Errors
/// Returns [`QuantizeError::InvalidColorFormat`] containing `text` if, after stripping
/// an optional leading `#`, it is not exactly 6 hexadecimal digits.
///
/// # Examples
/// ```
/// # use pixelette::parse_color;
/// # use palette::Srgb;
/// assert_eq!(parse_color("#FF8000"), Ok(Srgb::new(255, 128, 0)));
/// assert_eq!(parse_color("ff8000"), Ok(Srgb::new(255, 128, 0)));
/// assert!(parse_color("#FFF").is_err());
/// ```
pub fn parse_color(text: &str) -> Result<Srgb<u8>, QuantizeError> {
    let invalid = || QuantizeError::InvalidColorFormat(text.to_owned());

    let hex = text.strip_prefix('#').unwrap_or(text);
    // also rejects multi-byte characters, which keeps the slicing below on char boundaries
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |i: usize| {
        let pair = hex.get(i..i + 2).ok_or_else(invalid)?;
        u8::from_str_radix(pair, 16).map_err(|_| invalid())
    };
    Ok(Srgb::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Squared euclidean distance between two 8-bit colors.
#[inline]
fn squared_distance(a: Srgb<u8>, b: Srgb<u8>) -> u32 {
    let d = |x: u8, y: u8| {
        let d = u32::from(x.abs_diff(y));
        d * d
    };
    d(a.red, b.red) + d(a.green, b.green) + d(a.blue, b.blue)
}

/// Squared euclidean distance between two points.
#[inline]
fn squared_euclidean_distance<const N: usize>(x: [f64; N], y: [f64; N]) -> f64 {
    let mut dist = 0.0;
    for c in 0..N {
        let d = x[c] - y[c];
        dist += d * d;
    }
    dist
}

/// An ordered, non-empty list of colors that pixels are mapped onto.
///
/// The order of the colors is the order they were loaded in.
/// When two palette colors are equally near to a color,
/// the one that comes first in the palette is chosen.
///
/// # Examples
/// ```
/// # use pixelette::{Palette, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// let palette = Palette::load(["#000000", "#FFFFFF"])?;
/// assert_eq!(palette.nearest(Srgb::new(100, 100, 100)), Srgb::new(0, 0, 0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    /// The palette colors in load order.
    colors: Vec<Srgb<u8>>,
    /// The palette colors as arrays of `f64`, used when searching on dithered points.
    components: Vec<[f64; 3]>,
}

impl Palette {
    /// Creates a new [`Palette`] from already parsed colors.
    ///
    /// # Errors
    /// Returns [`QuantizeError::EmptyPalette`] if `colors` is empty.
    pub fn new(colors: Vec<Srgb<u8>>) -> Result<Self, QuantizeError> {
        if colors.is_empty() {
            return Err(QuantizeError::EmptyPalette);
        }

        let components = colors.iter().copied().map(to_f64_components).collect();
        Ok(Self { colors, components })
    }

    /// Parses each hex string in `definitions` (see [`parse_color`]) into a new [`Palette`].
    ///
    /// # Errors
    /// Returns [`QuantizeError::EmptyPalette`] if `definitions` is empty, or
    /// [`QuantizeError::InvalidColorFormat`] for the first entry that fails to parse.
    pub fn load<I>(definitions: I) -> Result<Self, QuantizeError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let colors = definitions
            .into_iter()
            .map(|text| parse_color(text.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(colors)
    }

    /// Returns the palette colors in load order.
    #[must_use]
    pub fn colors(&self) -> &[Srgb<u8>] {
        &self.colors
    }

    /// Returns the number of colors in the palette.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always returns `false`, since a [`Palette`] cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Returns the index of the palette color nearest to `color`.
    #[must_use]
    pub fn nearest_index(&self, color: Srgb<u8>) -> usize {
        // min_by_key returns the first minimum, which gives the load order tie-break
        self.colors
            .iter()
            .enumerate()
            .min_by_key(|&(_, &c)| squared_distance(color, c))
            .map_or(0, |(i, _)| i)
    }

    /// Returns the palette color nearest to `color`.
    #[must_use]
    pub fn nearest(&self, color: Srgb<u8>) -> Srgb<u8> {
        self.colors[self.nearest_index(color)]
    }

    /// Returns the index of the palette color nearest to an arbitrary point,
    /// which may lie outside of the RGB cube.
    #[must_use]
    pub(crate) fn nearest_index_f64(&self, point: [f64; 3]) -> usize {
        self.components
            .iter()
            .enumerate()
            .min_by_key(|&(_, &c)| OrderedFloat(squared_euclidean_distance(point, c)))
            .map_or(0, |(i, _)| i)
    }

    /// Returns the `f64` components of the palette color at `index`.
    #[inline]
    pub(crate) fn components(&self, index: usize) -> [f64; 3] {
        self.components[index]
    }
}

impl TryFrom<&[Srgb<u8>]> for Palette {
    type Error = QuantizeError;

    fn try_from(colors: &[Srgb<u8>]) -> Result<Self, Self::Error> {
        Self::new(colors.to_vec())
    }
}

impl From<Palette> for Vec<Srgb<u8>> {
    fn from(palette: Palette) -> Self {
        palette.colors
    }
}

/// The on-disk JSON form of a palette: `{"colors": ["#RRGGBB", ...]}`.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Deserialize)]
pub struct PaletteFile {
    /// The palette colors as hex strings.
    pub colors: Vec<String>,
}

#[cfg(feature = "serde")]
impl Palette {
    /// Parses a palette from a JSON palette definition.
    ///
    /// # Errors
    /// Returns an error if `json` is not a valid palette file
    /// or any of its colors fail to load (see [`Palette::load`]).
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let file: PaletteFile = serde_json::from_str(json)?;
        Ok(Self::load(&file.colors)?)
    }

    /// Reads a JSON palette definition from `reader`.
    ///
    /// # Errors
    /// See [`Palette::from_json_str`].
    pub fn from_reader(reader: impl Read) -> Result<Self, PipelineError> {
        let file: PaletteFile = serde_json::from_reader(reader)?;
        Ok(Self::load(&file.colors)?)
    }

    /// Reads a JSON palette definition from the file at `path`.
    ///
    /// # Errors
    /// Returns [`PipelineError::Io`] if the file cannot be opened,
    /// otherwise see [`Palette::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        log::debug!("loading palette from {}", path.display());
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Loads the palette named `name` from the directory `dir`, i.e., the file `<dir>/<name>.json`.
    ///
    /// # Errors
    /// See [`Palette::from_file`].
    pub fn from_named(dir: impl AsRef<Path>, name: &str) -> Result<Self, PipelineError> {
        Self::from_file(dir.as_ref().join(format!("{name}.json")))
    }
}
