use crate::{
    consts::ADDRESS_MARKER,
    pack::{MemoryRow, RowEncoding},
};
use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::fmt::{self, Write as _};
use snafu::{ensure, OptionExt, Snafu};

const INPUT_IMAGE: &str = "Input Image";
const OUTPUT_FILE: &str = "Output File";
const MEMORY_DEPTH: &str = "Memory Depth";
const MEMORY_WIDTH: &str = "Memory Width";
const TILE_SIZE: &str = "Tile Size";

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ParseMemError {
    #[snafu(display("No `{ADDRESS_MARKER}` address marker found"))]
    MissingAddressMarker,
    #[snafu(display("Header field `{field}` is missing"))]
    MissingHeaderField { field: &'static str },
    #[snafu(display("Header field `{field}` has an invalid value `{value}`"))]
    InvalidHeaderValue { field: &'static str, value: String },
    #[snafu(display("Line {line}: row contains characters that are neither binary nor hex"))]
    InvalidDigit { line: usize },
    #[snafu(display("Line {line}: row doesn't match the {expected} bit memory width"))]
    RowWidthMismatch { line: usize, expected: usize },
    #[snafu(display("Header declares {expected} rows, but {found} rows follow"))]
    RowCountMismatch { expected: usize, found: usize },
}

#[cfg(feature = "std")]
#[derive(Debug, Snafu)]
pub enum WriteMemError {
    WriteIo { source: std::io::Error },
}

/// Descriptive header fields of a memory-init file. Depth and width are derived from the rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemHeader {
    pub input_image: String,
    pub output_file: String,
    pub tile_size: u32,
}

/// A memory-init file: header, address marker and rows in address order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemFile {
    pub header: MemHeader,
    pub rows: Vec<MemoryRow>,
    pub encoding: RowEncoding,
}

impl MemFile {
    pub fn new(header: MemHeader, rows: Vec<MemoryRow>, encoding: RowEncoding) -> Self {
        Self {
            header,
            rows,
            encoding,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    /// Row width in bits, 0 for an empty file.
    #[inline]
    pub fn width(&self) -> usize {
        self.rows.first().map(MemoryRow::width).unwrap_or(0)
    }

    fn fmt_header(&self, f: &mut impl fmt::Write, comment: &str) -> fmt::Result {
        writeln!(f, "{comment} {INPUT_IMAGE:<12} : {}", self.header.input_image)?;
        writeln!(f, "{comment} {OUTPUT_FILE:<12} : {}", self.header.output_file)?;
        writeln!(f, "{comment} {MEMORY_DEPTH:<12} : {} rows", self.depth())?;
        writeln!(f, "{comment} {MEMORY_WIDTH:<12} : {} bits", self.width())?;
        writeln!(f, "{comment} {TILE_SIZE:<12} : {} pixels", self.header.tile_size)
    }

    /// Renders the file in Xilinx COE form. The radix follows [`MemFile::encoding`].
    pub fn to_coe(&self) -> String {
        let mut out = String::new();
        // Writing into a String can't fail.
        let _ = self.fmt_coe(&mut out);
        out
    }

    fn fmt_coe(&self, f: &mut impl fmt::Write) -> fmt::Result {
        self.fmt_header(f, ";")?;
        writeln!(f, "memory_initialization_radix={};", self.encoding.radix())?;
        writeln!(f, "memory_initialization_vector=")?;

        let last = self.rows.len().saturating_sub(1);
        for (i, row) in self.rows.iter().enumerate() {
            let terminator = if i == last { ';' } else { ',' };
            writeln!(f, "{}{terminator}", row.to_encoded(self.encoding))?;
        }
        if self.rows.is_empty() {
            writeln!(f, ";")?;
        }

        Ok(())
    }

    #[cfg(feature = "std")]
    pub fn write<W: std::io::Write>(&self, mut w: W) -> Result<(), WriteMemError> {
        use snafu::ResultExt;
        w.write_all(self.to_string().as_bytes())
            .context(WriteIoSnafu)
    }

    #[cfg(feature = "std")]
    pub fn write_coe<W: std::io::Write>(&self, mut w: W) -> Result<(), WriteMemError> {
        use snafu::ResultExt;
        w.write_all(self.to_coe().as_bytes()).context(WriteIoSnafu)
    }

    /// Parses the `.mem` form written by [`Display`](fmt::Display).
    ///
    /// Rows may be binary or hex. A row counts as binary when it is exactly as wide as the
    /// declared memory width and only contains `0` and `1`.
    pub fn parse(text: &str) -> Result<Self, ParseMemError> {
        let mut lines = text.lines().enumerate();

        let mut input_image = None;
        let mut output_file = None;
        let mut depth = None;
        let mut width = None;
        let mut tile_size = None;

        loop {
            let (_, line) = lines.next().context(MissingAddressMarkerSnafu)?;
            let line = line.trim();

            if line == ADDRESS_MARKER {
                break;
            }
            let Some(comment) = line.strip_prefix("//") else {
                continue;
            };
            let Some((key, value)) = comment.split_once(':') else {
                continue;
            };

            let value = value.trim();
            match key.trim() {
                INPUT_IMAGE => input_image = Some(value.to_string()),
                OUTPUT_FILE => output_file = Some(value.to_string()),
                MEMORY_DEPTH => depth = Some(parse_count(MEMORY_DEPTH, value, "rows")?),
                MEMORY_WIDTH => width = Some(parse_count(MEMORY_WIDTH, value, "bits")?),
                TILE_SIZE => tile_size = Some(parse_count(TILE_SIZE, value, "pixels")?),
                _ => {}
            }
        }

        let depth = depth.context(MissingHeaderFieldSnafu {
            field: MEMORY_DEPTH,
        })?;
        let width = width.context(MissingHeaderFieldSnafu {
            field: MEMORY_WIDTH,
        })?;
        let tile_size = tile_size.context(MissingHeaderFieldSnafu { field: TILE_SIZE })?;
        let tile_size = u32::try_from(tile_size).ok().context(InvalidHeaderValueSnafu {
            field: TILE_SIZE,
            value: tile_size.to_string(),
        })?;

        let mut encoding = None;
        let mut rows = Vec::with_capacity(depth);
        for (index, line) in lines {
            let digits = line.trim();
            if digits.is_empty() {
                continue;
            }

            let (row, row_encoding) = parse_row(digits, width, index + 1)?;
            encoding.get_or_insert(row_encoding);
            rows.push(row);
        }

        ensure!(
            rows.len() == depth,
            RowCountMismatchSnafu {
                expected: depth,
                found: rows.len()
            }
        );

        Ok(Self {
            header: MemHeader {
                input_image: input_image.unwrap_or_default(),
                output_file: output_file.unwrap_or_default(),
                tile_size,
            },
            rows,
            encoding: encoding.unwrap_or_default(),
        })
    }
}

impl fmt::Display for MemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_header(f, "//")?;
        writeln!(f, "{ADDRESS_MARKER}")?;
        for row in &self.rows {
            writeln!(f, "{}", row.to_encoded(self.encoding))?;
        }
        Ok(())
    }
}

/// Renders `rows` with the header fields as `.mem` text.
pub fn serialize(rows: &[MemoryRow], header: &MemHeader, encoding: RowEncoding) -> String {
    MemFile::new(header.clone(), rows.to_vec(), encoding).to_string()
}

fn parse_count(field: &'static str, value: &str, unit: &str) -> Result<usize, ParseMemError> {
    value
        .strip_suffix(unit)
        .unwrap_or(value)
        .trim()
        .parse()
        .ok()
        .context(InvalidHeaderValueSnafu {
            field,
            value: value.to_string(),
        })
}

fn parse_row(
    digits: &str,
    width: usize,
    line: usize,
) -> Result<(MemoryRow, RowEncoding), ParseMemError> {
    if digits.len() == width {
        if let Some(row) = MemoryRow::from_binary(digits) {
            return Ok((row, RowEncoding::Binary));
        }
    }
    if let Some(row) = MemoryRow::from_hex(digits, width) {
        return Ok((row, RowEncoding::Hex));
    }

    ensure!(
        digits.chars().all(|c| c.is_ascii_hexdigit()),
        InvalidDigitSnafu { line }
    );
    RowWidthMismatchSnafu {
        line,
        expected: width,
    }
    .fail()
}
