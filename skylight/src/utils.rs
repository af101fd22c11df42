use crate::encode::{EncodeError, InvalidBitDepthSnafu};
use byteorder::{ByteOrder, LittleEndian};
use snafu::ensure;

/// An 8-bit-per-channel `[r, g, b]` pixel.
pub type Rgb888 = [u8; 3];

/// Fixed point luma weights (R, G, B), summing to 256.
const LUMA_WEIGHTS: [u32; 3] = [54, 183, 19];

/// Checks that a channel bit depth is in `1..=8`.
#[inline]
pub fn check_bit_depth(bit_depth: u8) -> Result<(), EncodeError> {
    ensure!((1..=8).contains(&bit_depth), InvalidBitDepthSnafu { bit_depth });
    Ok(())
}

/// Truncates an 8-bit channel value to `bit_depth` bits.
///
/// This is a scale by `2^bit_depth / 256` with truncating division, i.e. a right shift by
/// `8 - bit_depth`. The hardware assumes exactly this truncation, so there is no rounding.
#[inline]
pub fn quantize(channel: u8, bit_depth: u8) -> Result<u8, EncodeError> {
    check_bit_depth(bit_depth)?;
    Ok(channel >> (8 - bit_depth))
}

/// Scales an N-bit channel value back up to 8 bits (`value * 256 / 2^bit_depth`).
#[inline]
pub fn dequantize(value: u8, bit_depth: u8) -> Result<u8, EncodeError> {
    check_bit_depth(bit_depth)?;
    Ok(value << (8 - bit_depth))
}

/// Approximate luma of an RGB888 pixel, weighting R/G/B by roughly 0.21/0.72/0.07.
#[inline]
pub const fn luma([r, g, b]: Rgb888) -> u8 {
    let [wr, wg, wb] = LUMA_WEIGHTS;
    ((r as u32 * wr + g as u32 * wg + b as u32 * wb) >> 8) as u8
}

/// Largest value representable in `bit_depth` bits, saturating at `u8::MAX`.
#[inline]
pub const fn channel_max(bit_depth: u8) -> u8 {
    if bit_depth >= 8 {
        u8::MAX
    } else {
        (1u8 << bit_depth) - 1
    }
}

/// Decodes a 3-byte pixel unit: little-endian 24-bit, blue in the low byte, red in the high byte.
#[inline]
pub fn pixel_from_wire(bytes: [u8; 3]) -> Rgb888 {
    let value = LittleEndian::read_u24(&bytes);
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

/// Encodes a pixel as a 3-byte pixel unit. Inverse of [`pixel_from_wire`].
#[inline]
pub fn pixel_to_wire([r, g, b]: Rgb888) -> [u8; 3] {
    let mut bytes = [0; 3];
    LittleEndian::write_u24(
        &mut bytes,
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b),
    );
    bytes
}

/// A tile colour reduced to `bit_depth` bits per channel.
///
/// Every channel is guaranteed to be in `0..2^bit_depth` for the bit depth it was produced with.
/// There is no way to build one from raw 8-bit values other than through [`quantize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QuantizedColour {
    channels: [u8; 3],
}

impl QuantizedColour {
    /// Quantizes every channel of an RGB888 colour.
    pub fn from_rgb888([r, g, b]: Rgb888, bit_depth: u8) -> Result<Self, EncodeError> {
        Ok(Self {
            channels: [
                quantize(r, bit_depth)?,
                quantize(g, bit_depth)?,
                quantize(b, bit_depth)?,
            ],
        })
    }

    /// Builds a colour from values already known to fit the bit depth, masking off anything
    /// above it.
    #[inline]
    pub(crate) const fn from_masked([r, g, b]: [u8; 3], bit_depth: u8) -> Self {
        let max = channel_max(bit_depth);
        Self {
            channels: [r & max, g & max, b & max],
        }
    }

    #[inline]
    pub const fn channels(&self) -> [u8; 3] {
        self.channels
    }

    #[inline]
    pub const fn r(&self) -> u8 {
        self.channels[0]
    }

    #[inline]
    pub const fn g(&self) -> u8 {
        self.channels[1]
    }

    #[inline]
    pub const fn b(&self) -> u8 {
        self.channels[2]
    }

    /// Scales the colour back to RGB888 for previews.
    pub fn to_rgb888(self, bit_depth: u8) -> Result<Rgb888, EncodeError> {
        let [r, g, b] = self.channels;
        Ok([
            dequantize(r, bit_depth)?,
            dequantize(g, bit_depth)?,
            dequantize(b, bit_depth)?,
        ])
    }
}
