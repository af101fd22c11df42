//! Verification tooling for a tile-based VGA display controller.
//!
//! The controller under test reads its frame from a block RAM whose rows each hold a handful of
//! quantized tile colours, and a simulation of it streams the pixels it generates over a socket.
//! This crate covers both directions:
//!
//! - the encoding pipeline turning an image into memory rows ([`encode`], [`pack`]), and
//! - the frame-stream decoder rebuilding a framebuffer from the simulation output ([`decode`]).
//!
//! # Encoding pipeline
//!
//! ```plain
//! Image ── tiles ── average ── quantize ── pack ── MemFile
//! ```
//!
//! An [`Image`](encode::Image) is split into square tiles in raster order. Each tile collapses to
//! the truncated mean of its pixels (optionally after a per-pixel [`ColourMode`] transform) and
//! every channel is truncated to `bit_depth` bits. Tiles are then packed into memory rows:
//!
//! ```plain
//! .- MemoryRow, 2 tiles at 3 bits ------------------------.
//! |  17 .. 15 | 14 .. 12 | 11 .. 9 | 8 .. 6 | 5 .. 3 | 2 .. 0 |
//! |-----------+----------+---------+--------+--------+--------|
//! |    R1     |    G1    |   B1    |   R0   |   G0   |   B0   |
//! `-------------------------------------------------------`
//! ```
//!
//! The first tile of a row occupies the least significant bits, later tiles are prepended towards
//! the most significant end.
//!
//! # Frame stream
//!
//! The simulation sends an unframed byte stream:
//!
//! - pixel unit: 3 bytes, a little-endian 24-bit value with blue in the low byte and red in the
//!   high byte
//! - control unit: the 5 ASCII bytes [`RESET`](consts::RESET_MARKER), returning the scan to the
//!   top left corner
//!
//! Line boundaries are implicit: a line is complete once `width` pixels have been received since
//! the previous line or reset.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
pub mod pack;
#[cfg(feature = "alloc")]
pub mod pattern;

pub mod decode;
pub mod encode;
pub mod utils;

pub use decode::{DisplaySink, FrameCursor, FrameStreamDecoder, StreamEvent};
pub use encode::{ColourMode, EncodeError};
#[cfg(feature = "alloc")]
pub use encode::{EncodeConfig, Image};
#[cfg(feature = "alloc")]
pub use pack::{MemFile, MemoryRow, RowEncoding};
pub use utils::{quantize, QuantizedColour, Rgb888};

pub mod consts {
    /// Control unit resetting the scan position to the top left corner.
    ///
    /// ```plain
    /// .- RESET ----------------------------------.
    /// | Byte[0] | Byte[1] | Byte[2] | Byte[3] | Byte[4] |
    /// |---------+---------+---------+---------+---------|
    /// |   'R'   |   'E'   |   'S'   |   'E'   |   'T'   |
    /// `--------------------------------------------------`
    /// ```
    ///
    /// Only recognised when aligned to a pixel boundary.
    pub const RESET_MARKER: &[u8; 5] = b"RESET";

    /// Size of one pixel unit on the wire.
    ///
    /// ```plain
    /// .- Pixel --------------------.
    /// | Byte[0] | Byte[1] | Byte[2] |
    /// |---------+---------+---------|
    /// |    B    |    G    |    R    |
    /// `----------------------------`
    /// ```
    pub const PIXEL_BYTES: usize = 3;

    /// Address marker preceding the rows of a memory-init file.
    pub const ADDRESS_MARKER: &str = "@000";

    /// Default viewer endpoint used by the simulation client.
    pub const DEFAULT_ADDR: &str = "127.0.0.1:32023";

    /// Size of a single transport read.
    pub const READ_BUFFER_SIZE: usize = 2048;

    pub const DEFAULT_WIDTH: u16 = 640;
    pub const DEFAULT_HEIGHT: u16 = 480;
    pub const DEFAULT_TILE_SIZE: u32 = 4;
    pub const DEFAULT_BIT_DEPTH: u8 = 3;
    pub const DEFAULT_TILES_PER_ROW: usize = 8;
}
