use crate::{
    encode::{EncodeError, IncompleteRowSnafu},
    utils::{check_bit_depth, QuantizedColour},
};
use alloc::{string::String, vec, vec::Vec};
use core::str::FromStr;
use snafu::ensure;

mod mem_file;
pub use mem_file::*;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Textual form of a memory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowEncoding {
    /// One `0`/`1` character per bit, most significant bit first.
    #[default]
    Binary,
    /// Lowercase hex digits, least significant nibble last. The leading nibble may be partial.
    Hex,
}

impl RowEncoding {
    /// Radix as written into COE files.
    #[inline]
    pub const fn radix(self) -> u32 {
        match self {
            RowEncoding::Binary => 2,
            RowEncoding::Hex => 16,
        }
    }
}

impl FromStr for RowEncoding {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(encoding) = s.eq_ignore_ascii_case("binary").then_some(RowEncoding::Binary)
               .or_else(|| s.eq_ignore_ascii_case("bin").then_some(RowEncoding::Binary))
               .or_else(|| s.eq_ignore_ascii_case("hex").then_some(RowEncoding::Hex))
        else { return Err("expected one of: binary, hex"); };

        Ok(encoding)
    }
}

/// One addressable word of the frame memory: a fixed-width bit string.
///
/// Bit 0 is the least significant bit. Tile `i` of a row occupies bits
/// `i * 3 * bit_depth .. (i + 1) * 3 * bit_depth`, with blue in the lowest field and red in the
/// highest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryRow {
    width: usize,
    // LSB first
    bytes: Vec<u8>,
}

impl MemoryRow {
    pub fn zeroed(width: usize) -> Self {
        Self {
            width,
            bytes: vec![0; (width + 7) / 8],
        }
    }

    /// Packs `colours` into a single row, the first colour in the least significant bits.
    pub fn from_colours(colours: &[QuantizedColour], bit_depth: u8) -> Self {
        let depth = usize::from(bit_depth);
        let mut row = Self::zeroed(colours.len() * 3 * depth);

        for (tile, colour) in colours.iter().enumerate() {
            let base = tile * 3 * depth;
            row.write_field(base, colour.b(), bit_depth);
            row.write_field(base + depth, colour.g(), bit_depth);
            row.write_field(base + 2 * depth, colour.r(), bit_depth);
        }

        row
    }

    /// Width of the row in bits.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// # Panics
    ///
    /// Panics if `index` is not below [`width`](Self::width).
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        assert!(index < self.width, "bit index out of range");
        self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    #[inline]
    fn set_bit(&mut self, index: usize, value: bool) {
        let mask = 1 << (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    fn write_field(&mut self, offset: usize, value: u8, bits: u8) {
        for i in 0..usize::from(bits) {
            self.set_bit(offset + i, value & (1 << i) != 0);
        }
    }

    fn read_field(&self, offset: usize, bits: u8) -> u8 {
        (0..usize::from(bits)).fold(0, |value, i| value | (u8::from(self.bit(offset + i)) << i))
    }

    /// Value of the nibble starting at bit `4 * index`, bits past the row width read as 0.
    fn nibble(&self, index: usize) -> u8 {
        (0..4)
            .map(|i| 4 * index + i)
            .filter(|&bit| bit < self.width)
            .fold(0, |value, bit| value | (u8::from(self.bit(bit)) << (bit % 4)))
    }

    pub fn to_binary(&self) -> String {
        (0..self.width)
            .rev()
            .map(|i| if self.bit(i) { '1' } else { '0' })
            .collect()
    }

    pub fn to_hex(&self) -> String {
        (0..(self.width + 3) / 4)
            .rev()
            .map(|i| char::from(HEX_DIGITS[usize::from(self.nibble(i))]))
            .collect()
    }

    pub fn to_encoded(&self, encoding: RowEncoding) -> String {
        match encoding {
            RowEncoding::Binary => self.to_binary(),
            RowEncoding::Hex => self.to_hex(),
        }
    }

    /// Parses a row of `0`/`1` characters, most significant bit first. The row is as wide as
    /// the string is long.
    pub fn from_binary(digits: &str) -> Option<Self> {
        let mut row = Self::zeroed(digits.len());
        for (i, digit) in digits.bytes().rev().enumerate() {
            match digit {
                b'0' => {}
                b'1' => row.set_bit(i, true),
                _ => return None,
            }
        }
        Some(row)
    }

    /// Parses a `width` bit row from hex digits, least significant nibble last.
    ///
    /// Returns `None` on a digit count other than `ceil(width / 4)`, on non-hex characters or if
    /// the leading nibble sets bits above `width`.
    pub fn from_hex(digits: &str, width: usize) -> Option<Self> {
        if digits.len() != (width + 3) / 4 {
            return None;
        }

        let mut row = Self::zeroed(width);
        for (nibble, digit) in digits.chars().rev().enumerate() {
            let value = digit.to_digit(16)?;
            for i in 0..4 {
                if value & (1 << i) == 0 {
                    continue;
                }
                let bit = 4 * nibble + i;
                if bit >= width {
                    return None;
                }
                row.set_bit(bit, true);
            }
        }
        Some(row)
    }

    /// Unpacks the row into `width / (3 * bit_depth)` colours, first tile first.
    fn colours(&self, bit_depth: u8) -> Vec<QuantizedColour> {
        let depth = usize::from(bit_depth);
        (0..self.width / (3 * depth))
            .map(|tile| {
                let base = tile * 3 * depth;
                QuantizedColour::from_masked(
                    [
                        self.read_field(base + 2 * depth, bit_depth),
                        self.read_field(base + depth, bit_depth),
                        self.read_field(base, bit_depth),
                    ],
                    bit_depth,
                )
            })
            .collect()
    }
}

/// Packs tile colours into memory rows of `tiles_per_row` tiles each.
///
/// The number of colours must be a multiple of `tiles_per_row`; the last row is never padded.
pub fn pack(
    colours: &[QuantizedColour],
    tiles_per_row: usize,
    bit_depth: u8,
) -> Result<Vec<MemoryRow>, EncodeError> {
    check_bit_depth(bit_depth)?;
    ensure!(
        tiles_per_row != 0 && colours.len() % tiles_per_row == 0,
        IncompleteRowSnafu {
            colour_count: colours.len(),
            tiles_per_row
        }
    );

    let rows: Vec<_> = colours
        .chunks_exact(tiles_per_row)
        .map(|chunk| MemoryRow::from_colours(chunk, bit_depth))
        .collect();

    log::debug!(
        "Packed {} colours into {} rows of {} bits",
        colours.len(),
        rows.len(),
        tiles_per_row * 3 * usize::from(bit_depth)
    );

    Ok(rows)
}

/// Unpacks a row produced by [`pack`] back into its `tiles_per_row` colours.
pub fn unpack(
    row: &MemoryRow,
    tiles_per_row: usize,
    bit_depth: u8,
) -> Result<Vec<QuantizedColour>, EncodeError> {
    check_bit_depth(bit_depth)?;
    let tile_width = 3 * usize::from(bit_depth);
    ensure!(
        tiles_per_row != 0 && row.width() == tiles_per_row * tile_width,
        IncompleteRowSnafu {
            colour_count: row.width() / tile_width,
            tiles_per_row
        }
    );

    Ok(row.colours(bit_depth))
}

/// Unpacks a sequence of rows into the flat colour sequence they were packed from.
pub fn unpack_all(
    rows: &[MemoryRow],
    tiles_per_row: usize,
    bit_depth: u8,
) -> Result<Vec<QuantizedColour>, EncodeError> {
    let mut colours = Vec::with_capacity(rows.len() * tiles_per_row);
    for row in rows {
        colours.extend(unpack(row, tiles_per_row, bit_depth)?);
    }
    Ok(colours)
}
