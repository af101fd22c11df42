use crate::utils::{luma, Rgb888};
use core::str::FromStr;
use snafu::{ensure, Snafu};

#[cfg(feature = "alloc")]
mod tiles;
#[cfg(feature = "alloc")]
pub use tiles::*;

#[cfg(feature = "image")]
pub mod source;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EncodeError {
    #[snafu(display("Bit depth {bit_depth} is outside of 1..=8"))]
    InvalidBitDepth { bit_depth: u8 },
    #[snafu(display(
        "Tile at ({x}, {y}) with size {tile_size} extends past the {width}x{height} image"
    ))]
    TileOutOfBounds {
        x: u32,
        y: u32,
        tile_size: u32,
        width: u32,
        height: u32,
    },
    #[snafu(display("A {width}x{height} image can't be split into tiles of size {tile_size}"))]
    UnalignedTileGrid {
        width: u32,
        height: u32,
        tile_size: u32,
    },
    #[snafu(display(
        "{colour_count} tile colours can't be packed into rows of {tiles_per_row} tiles"
    ))]
    IncompleteRow {
        colour_count: usize,
        tiles_per_row: usize,
    },
}

/// Per-pixel transform applied before tiles are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColourMode {
    /// Pixels are averaged as-is.
    #[default]
    Colour,
    /// Luma replicated into all three channels.
    Greyscale,
    /// Luma in the green channel only, red and blue forced to 0.
    GreenTint,
}

impl ColourMode {
    #[inline]
    pub const fn apply(self, pixel: Rgb888) -> Rgb888 {
        match self {
            ColourMode::Colour => pixel,
            ColourMode::Greyscale => {
                let y = luma(pixel);
                [y, y, y]
            }
            ColourMode::GreenTint => [0, luma(pixel), 0],
        }
    }
}

impl FromStr for ColourMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(mode) = s.eq_ignore_ascii_case("colour").then_some(ColourMode::Colour)
               .or_else(|| s.eq_ignore_ascii_case("color").then_some(ColourMode::Colour))
               .or_else(|| s.eq_ignore_ascii_case("greyscale").then_some(ColourMode::Greyscale))
               .or_else(|| s.eq_ignore_ascii_case("grayscale").then_some(ColourMode::Greyscale))
               .or_else(|| s.eq_ignore_ascii_case("green-tint").then_some(ColourMode::GreenTint))
        else { return Err("expected one of: colour, greyscale, green-tint"); };

        Ok(mode)
    }
}

/// Checks that `tile_size` divides both image dimensions.
pub fn check_tile_grid(width: u32, height: u32, tile_size: u32) -> Result<(), EncodeError> {
    ensure!(
        tile_size != 0 && width % tile_size == 0 && height % tile_size == 0,
        UnalignedTileGridSnafu {
            width,
            height,
            tile_size
        }
    );
    Ok(())
}
