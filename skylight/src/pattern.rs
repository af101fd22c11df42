//! Model of the single-port frame RAM, with deterministic fill patterns for hardware bring-up.

use crate::{
    encode::EncodeError,
    pack::{pack, MemoryRow},
    utils::{check_bit_depth, QuantizedColour},
};
use alloc::{vec, vec::Vec};
use core::str::FromStr;
use snafu::{ensure, ResultExt, Snafu};

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum MemoryError {
    #[snafu(display("Address {address} is outside of a memory of depth {depth}"))]
    AddressOutOfRange { address: usize, depth: usize },
    #[snafu(display("Row holds {found} tiles, but the memory is {expected} tiles wide"))]
    RowLengthMismatch { expected: usize, found: usize },
    #[snafu(display("Invalid memory geometry"))]
    Geometry { source: EncodeError },
}

/// Fill pattern for a [`FrameMemory`]. Values wrap at the bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Zero,
    /// Every channel of every tile set to the value.
    Constant(u8),
    /// Tile index along the row.
    Increment,
    /// Row address in every tile.
    RowAddress,
}

/// Pattern names as accepted on the command line. [`Pattern::Constant`] needs a value, so this
/// is kept apart from the pattern itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Zero,
    Constant,
    Increment,
    RowAddress,
}

impl PatternKind {
    pub const fn with_value(self, value: u8) -> Pattern {
        match self {
            PatternKind::Zero => Pattern::Zero,
            PatternKind::Constant => Pattern::Constant(value),
            PatternKind::Increment => Pattern::Increment,
            PatternKind::RowAddress => Pattern::RowAddress,
        }
    }
}

impl FromStr for PatternKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(kind) = s.eq_ignore_ascii_case("zero").then_some(PatternKind::Zero)
               .or_else(|| s.eq_ignore_ascii_case("constant").then_some(PatternKind::Constant))
               .or_else(|| s.eq_ignore_ascii_case("increment").then_some(PatternKind::Increment))
               .or_else(|| s.eq_ignore_ascii_case("row-address").then_some(PatternKind::RowAddress))
        else { return Err("expected one of: zero, constant, increment, row-address"); };

        Ok(kind)
    }
}

/// `depth` rows of `tiles_per_row` quantized colours each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMemory {
    tiles_per_row: usize,
    bit_depth: u8,
    cells: Vec<QuantizedColour>,
}

impl FrameMemory {
    /// Creates a zero filled memory.
    pub fn new(tiles_per_row: usize, depth: usize, bit_depth: u8) -> Result<Self, MemoryError> {
        check_bit_depth(bit_depth).context(GeometrySnafu)?;
        if tiles_per_row == 0 {
            return Err(EncodeError::IncompleteRow {
                colour_count: 0,
                tiles_per_row,
            })
            .context(GeometrySnafu);
        }

        Ok(Self {
            tiles_per_row,
            bit_depth,
            cells: vec![QuantizedColour::default(); tiles_per_row * depth],
        })
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.cells.len() / self.tiles_per_row
    }

    #[inline]
    pub fn tiles_per_row(&self) -> usize {
        self.tiles_per_row
    }

    #[inline]
    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    fn row_range(&self, address: usize) -> Result<core::ops::Range<usize>, MemoryError> {
        let depth = self.depth();
        ensure!(address < depth, AddressOutOfRangeSnafu { address, depth });
        let start = address * self.tiles_per_row;
        Ok(start..start + self.tiles_per_row)
    }

    pub fn write(&mut self, address: usize, row: &[QuantizedColour]) -> Result<(), MemoryError> {
        ensure!(
            row.len() == self.tiles_per_row,
            RowLengthMismatchSnafu {
                expected: self.tiles_per_row,
                found: row.len()
            }
        );
        let range = self.row_range(address)?;
        self.cells[range].copy_from_slice(row);
        Ok(())
    }

    pub fn read(&self, address: usize) -> Result<&[QuantizedColour], MemoryError> {
        let range = self.row_range(address)?;
        Ok(&self.cells[range])
    }

    pub fn fill(&mut self, pattern: Pattern) {
        let bit_depth = self.bit_depth;
        let tiles_per_row = self.tiles_per_row;

        for (index, cell) in self.cells.iter_mut().enumerate() {
            let (address, tile) = (index / tiles_per_row, index % tiles_per_row);
            // Masking keeps the low bits, i.e. the value modulo 2^bit_depth.
            let value = match pattern {
                Pattern::Zero => 0,
                Pattern::Constant(value) => value,
                Pattern::Increment => tile as u8,
                Pattern::RowAddress => address as u8,
            };
            *cell = QuantizedColour::from_masked([value; 3], bit_depth);
        }

        log::debug!(
            "Filled {}x{tiles_per_row} memory with {pattern:?}",
            self.depth()
        );
    }

    /// Packs the memory into rows, address 0 first.
    pub fn to_rows(&self) -> Vec<MemoryRow> {
        // Geometry was checked on construction.
        pack(&self.cells, self.tiles_per_row, self.bit_depth).unwrap_or_default()
    }
}
