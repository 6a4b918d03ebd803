//! RGB colors and GIF color tables.

use crate::error::Result;
use crate::source::ByteSource;
use serde::{Deserialize, Serialize};

/// A 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Black.
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    /// Create a color from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components as a `[r, g, b]` array.
    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Rgb::new(c[0], c[1], c[2])
    }
}

/// An ordered palette of 2 to 256 colors; the length is always a power of two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<Rgb>,
}

impl ColorTable {
    /// Size in entries for the 3-bit size field of a descriptor (`2^(field+1)`).
    pub fn size_for_field(field: u8) -> usize {
        1 << ((field & 0x07) + 1)
    }

    /// Read a table of `size_for_field(field)` entries.
    pub fn read<S: ByteSource + ?Sized>(source: &mut S, field: u8) -> Result<Self> {
        let len = Self::size_for_field(field);
        let mut raw = vec![0u8; len * 3];
        source.read_exact(&mut raw)?;

        let colors = raw
            .chunks_exact(3)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
            .collect();
        Ok(Self { colors })
    }

    /// Build a table from colors, padding with black up to the next power of two (minimum 2).
    ///
    /// Colors beyond 256 are dropped.
    pub fn from_colors(colors: impl IntoIterator<Item = Rgb>) -> Self {
        let mut colors: Vec<Rgb> = colors.into_iter().take(256).collect();
        let len = colors.len().max(2).next_power_of_two();
        colors.resize(len, Rgb::BLACK);
        Self { colors }
    }

    /// Look up a color. Indices past the end of the table read as black.
    #[inline]
    pub fn get(&self, index: u8) -> Rgb {
        self.colors
            .get(index as usize)
            .copied()
            .unwrap_or(Rgb::BLACK)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// All entries in order.
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }
}
