use crate::{
    consts::{DEFAULT_BIT_DEPTH, DEFAULT_TILES_PER_ROW, DEFAULT_TILE_SIZE},
    encode::{
        check_tile_grid, ColourMode, EncodeError, IncompleteRowSnafu, TileOutOfBoundsSnafu,
    },
    pack::{pack, MemoryRow, RowEncoding},
    utils::{check_bit_depth, QuantizedColour, Rgb888},
};
use alloc::vec::Vec;
use itertools::iproduct;
use snafu::ensure;

/// An immutable RGB888 image, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: Vec<Rgb888>,
}

impl Image {
    /// Returns `None` if the number of pixels doesn't match `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb888>) -> Option<Self> {
        (width as usize * height as usize == pixels.len()).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb888) -> Self {
        let pixels = iproduct!(0..height, 0..width).map(|(y, x)| f(x, y)).collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is outside of the image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb888 {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn into_pixels(self) -> Vec<Rgb888> {
        self.pixels
    }
}

/// Options of one encoding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeConfig {
    pub tile_size: u32,
    pub bit_depth: u8,
    pub tiles_per_row: usize,
    pub colour_mode: ColourMode,
    pub row_encoding: RowEncoding,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            bit_depth: DEFAULT_BIT_DEPTH,
            tiles_per_row: DEFAULT_TILES_PER_ROW,
            colour_mode: ColourMode::Colour,
            row_encoding: RowEncoding::Binary,
        }
    }
}

impl EncodeConfig {
    /// Checks every precondition of a run over a `width`x`height` image up front, so that a
    /// failing run never gets to write anything.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), EncodeError> {
        check_bit_depth(self.bit_depth)?;
        check_tile_grid(width, height, self.tile_size)?;

        let colour_count = tile_count(width, self.tile_size) * tile_count(height, self.tile_size);
        ensure!(
            self.tiles_per_row != 0 && colour_count % self.tiles_per_row == 0,
            IncompleteRowSnafu {
                colour_count,
                tiles_per_row: self.tiles_per_row
            }
        );

        Ok(())
    }

    /// Width of one memory row in bits.
    #[inline]
    pub const fn row_width(&self) -> usize {
        self.tiles_per_row * 3 * self.bit_depth as usize
    }
}

#[inline]
fn tile_count(extent: u32, tile_size: u32) -> usize {
    (extent / tile_size) as usize
}

/// Truncated per-channel mean of the `tile_size`x`tile_size` block at `(x, y)`.
///
/// `mode` is applied to every source pixel before it is summed.
pub fn average_tile(
    image: &Image,
    x: u32,
    y: u32,
    tile_size: u32,
    mode: ColourMode,
) -> Result<Rgb888, EncodeError> {
    let fits = |origin: u32, extent: u32| {
        origin
            .checked_add(tile_size)
            .map(|end| end <= extent)
            .unwrap_or(false)
    };
    ensure!(
        tile_size != 0 && fits(x, image.width) && fits(y, image.height),
        TileOutOfBoundsSnafu {
            x,
            y,
            tile_size,
            width: image.width,
            height: image.height
        }
    );

    let mut sums = [0u64; 3];
    for (py, px) in iproduct!(y..y + tile_size, x..x + tile_size) {
        let pixel = mode.apply(image.pixel(px, py));
        for (sum, channel) in sums.iter_mut().zip(pixel) {
            *sum += u64::from(channel);
        }
    }

    let count = u64::from(tile_size) * u64::from(tile_size);
    Ok(sums.map(|sum| (sum / count) as u8))
}

/// Averages the tile at `(x, y)` and quantizes the result to `bit_depth` bits.
#[inline]
pub fn quantize_tile(
    image: &Image,
    x: u32,
    y: u32,
    tile_size: u32,
    bit_depth: u8,
    mode: ColourMode,
) -> Result<QuantizedColour, EncodeError> {
    QuantizedColour::from_rgb888(average_tile(image, x, y, tile_size, mode)?, bit_depth)
}

/// Collapses every tile of `image` to one quantized colour, in raster order.
pub fn encode_tiles(
    image: &Image,
    tile_size: u32,
    bit_depth: u8,
    mode: ColourMode,
) -> Result<Vec<QuantizedColour>, EncodeError> {
    check_bit_depth(bit_depth)?;
    check_tile_grid(image.width, image.height, tile_size)?;

    let tiles_x = image.width / tile_size;
    let tiles_y = image.height / tile_size;

    log::debug!(
        "Encoding {}x{} image into {tiles_x}x{tiles_y} tiles of {tile_size}px at {bit_depth} bits",
        image.width,
        image.height,
    );

    iproduct!(0..tiles_y, 0..tiles_x)
        .map(|(ty, tx)| {
            quantize_tile(
                image,
                tx * tile_size,
                ty * tile_size,
                tile_size,
                bit_depth,
                mode,
            )
        })
        .collect()
}

/// Runs the whole pipeline: tiles, quantization and row packing.
///
/// All preconditions are checked before any tile is visited.
pub fn encode(image: &Image, config: &EncodeConfig) -> Result<Vec<MemoryRow>, EncodeError> {
    config.validate(image.width, image.height)?;

    let colours = encode_tiles(image, config.tile_size, config.bit_depth, config.colour_mode)?;
    pack(&colours, config.tiles_per_row, config.bit_depth)
}

/// Renders tile colours back into a full resolution image, every pixel of a tile showing the
/// dequantized tile colour.
///
/// Tiles missing from `colours` are rendered black.
pub fn preview(
    colours: &[QuantizedColour],
    tiles_x: u32,
    tiles_y: u32,
    tile_size: u32,
    bit_depth: u8,
) -> Result<Image, EncodeError> {
    check_bit_depth(bit_depth)?;

    Ok(Image::from_fn(tiles_x * tile_size, tiles_y * tile_size, |x, y| {
        let index = (y / tile_size) as usize * tiles_x as usize + (x / tile_size) as usize;
        colours
            .get(index)
            .and_then(|colour| colour.to_rgb888(bit_depth).ok())
            .unwrap_or_default()
    }))
}
