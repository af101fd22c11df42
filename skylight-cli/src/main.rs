use argh::FromArgs;
use skylight::{
    consts::{
        DEFAULT_ADDR, DEFAULT_BIT_DEPTH, DEFAULT_HEIGHT, DEFAULT_TILES_PER_ROW, DEFAULT_TILE_SIZE,
        DEFAULT_WIDTH,
    },
    decode::FrameStreamWriter,
    encode::{
        encode_tiles, preview,
        source::{self, Geometry},
        ColourMode, EncodeConfig,
    },
    pack::{pack, MemFile, MemHeader, RowEncoding},
    pattern::{FrameMemory, PatternKind},
};
use std::{
    fs::File,
    io::BufWriter,
    net::SocketAddr,
    path::Path,
    str::FromStr,
};

mod view;
#[cfg(feature = "window")]
mod window;

/// Memory-init encoder and frame-stream viewer for the VGA controller.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Encode(Encode),
    View(view::View),
    Send(Transmit),
    Pattern(Pattern),
}

#[derive(Debug, Clone, Copy)]
enum MemFormat {
    Mem,
    Coe,
}

impl FromStr for MemFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(format) = s.eq_ignore_ascii_case("mem").then_some(MemFormat::Mem)
               .or_else(|| s.eq_ignore_ascii_case("coe").then_some(MemFormat::Coe))
        else { return Err("expected one of: mem, coe"); };

        Ok(format)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = argh::from_env();

    match command {
        Command::Encode(options) => encode(options),
        Command::View(options) => view::view(options),
        Command::Send(options) => send(options),
        Command::Pattern(options) => pattern(options),
    }
}

/// Encodes an image into a memory-init file.
#[derive(FromArgs)]
#[argh(subcommand, name = "encode")]
struct Encode {
    /// target width in pixels
    #[argh(option, default = "u32::from(DEFAULT_WIDTH)")]
    width: u32,
    /// target height in pixels
    #[argh(option, default = "u32::from(DEFAULT_HEIGHT)")]
    height: u32,
    /// crop origin x. Crops instead of resizing, requires --crop-y
    #[argh(option)]
    crop_x: Option<u32>,
    /// crop origin y. Crops instead of resizing, requires --crop-x
    #[argh(option)]
    crop_y: Option<u32>,
    /// tile edge length in pixels, must divide width and height
    #[argh(option, default = "DEFAULT_TILE_SIZE")]
    tile_size: u32,
    /// bits per colour channel (1-8)
    #[argh(option, default = "DEFAULT_BIT_DEPTH")]
    bit_depth: u8,
    /// number of tiles packed into one memory row
    #[argh(option, default = "DEFAULT_TILES_PER_ROW")]
    tiles_per_row: usize,
    /// colour transform (colour, greyscale, green-tint)
    #[argh(option, default = "ColourMode::Colour")]
    colour_mode: ColourMode,
    /// row digits (binary, hex)
    #[argh(option, default = "RowEncoding::Binary")]
    row_encoding: RowEncoding,
    /// output file format (mem, coe)
    #[argh(option, default = "MemFormat::Mem")]
    format: MemFormat,
    /// also write the quantized image as PNG to this path
    #[argh(option)]
    preview: Option<String>,

    /// the input image (PNG, JPG, BMP or TIFF)
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

fn encode(options: Encode) -> Result<(), Box<dyn std::error::Error>> {
    let Encode {
        width,
        height,
        crop_x,
        crop_y,
        tile_size,
        bit_depth,
        tiles_per_row,
        colour_mode,
        row_encoding,
        format,
        preview: preview_path,
        input,
        output,
    } = options;

    let geometry = match (crop_x, crop_y) {
        (None, None) => Geometry::resize(width, height),
        (Some(x), Some(y)) => Geometry::crop(width, height, x, y),
        _ => return Err("cropping needs both --crop-x and --crop-y".into()),
    };
    let config = EncodeConfig {
        tile_size,
        bit_depth,
        tiles_per_row,
        colour_mode,
        row_encoding,
    };
    // Fail before touching the source or the output.
    config.validate(width, height)?;

    let image = source::load(&input, &geometry)?;
    println!("Encoding `{input}` as {width}x{height}, {tile_size}px tiles at {bit_depth} bits");

    let colours = encode_tiles(&image, tile_size, bit_depth, colour_mode)?;
    let rows = pack(&colours, tiles_per_row, bit_depth)?;

    let mem_file = MemFile::new(
        MemHeader {
            input_image: input,
            output_file: file_name(&output),
            tile_size,
        },
        rows,
        row_encoding,
    );
    write_mem_file(&mem_file, format, &output)?;
    println!(
        "Written {} rows of {} bits to `{output}`",
        mem_file.depth(),
        config.row_width()
    );

    if let Some(path) = preview_path {
        preview(
            &colours,
            width / tile_size,
            height / tile_size,
            tile_size,
            bit_depth,
        )?
        .into_rgb_image()
        .save(&path)?;
        println!("Written preview to `{path}`");
    }

    Ok(())
}

/// Streams an image to a running viewer, as the simulation would.
#[derive(FromArgs)]
#[argh(subcommand, name = "send")]
struct Transmit {
    /// viewer address
    #[argh(option, default = "default_addr()")]
    addr: SocketAddr,
    /// frame width in pixels
    #[argh(option, default = "DEFAULT_WIDTH")]
    width: u16,
    /// frame height in pixels
    #[argh(option, default = "DEFAULT_HEIGHT")]
    height: u16,
    /// number of frames to send, each preceded by a reset
    #[argh(option, default = "1")]
    frames: u32,
    /// bytes per transport write, need not be a multiple of 3
    #[argh(option, default = "skylight::consts::READ_BUFFER_SIZE")]
    chunk: usize,
    /// send each reset as its own zero padded packet
    #[argh(switch)]
    reset_packets: bool,

    /// the input image
    #[argh(positional)]
    input: String,
}

fn send(options: Transmit) -> Result<(), Box<dyn std::error::Error>> {
    let Transmit {
        addr,
        width,
        height,
        frames,
        chunk,
        reset_packets,
        input,
    } = options;

    let image = source::load(
        &input,
        &Geometry::resize(u32::from(width), u32::from(height)),
    )?;

    let mut writer = FrameStreamWriter::connect_with_chunk_size(addr, chunk)?;
    for frame in 0..frames {
        log::debug!("Sending frame {frame}");
        if reset_packets {
            writer.reset_packet()?;
        } else {
            writer.reset()?;
        }
        writer.frame(&image)?;
    }
    writer.flush()?;

    println!("Sent {frames} {width}x{height} frames of `{input}` to {addr}");

    Ok(())
}

/// Writes a memory-init file filled with a test pattern.
#[derive(FromArgs)]
#[argh(subcommand, name = "pattern")]
struct Pattern {
    /// pattern (zero, constant, increment, row-address)
    #[argh(option)]
    kind: PatternKind,
    /// value for the constant pattern
    #[argh(option, default = "0")]
    value: u8,
    /// number of memory rows
    #[argh(option, default = "default_depth()")]
    depth: usize,
    /// number of tiles per memory row
    #[argh(option, default = "DEFAULT_TILES_PER_ROW")]
    tiles_per_row: usize,
    /// bits per colour channel (1-8)
    #[argh(option, default = "DEFAULT_BIT_DEPTH")]
    bit_depth: u8,
    /// tile size noted in the header
    #[argh(option, default = "DEFAULT_TILE_SIZE")]
    tile_size: u32,
    /// row digits (binary, hex)
    #[argh(option, default = "RowEncoding::Binary")]
    row_encoding: RowEncoding,
    /// output file format (mem, coe)
    #[argh(option, default = "MemFormat::Mem")]
    format: MemFormat,

    /// the output file
    #[argh(positional)]
    output: String,
}

fn pattern(options: Pattern) -> Result<(), Box<dyn std::error::Error>> {
    let Pattern {
        kind,
        value,
        depth,
        tiles_per_row,
        bit_depth,
        tile_size,
        row_encoding,
        format,
        output,
    } = options;

    let pattern = kind.with_value(value);
    let mut memory = FrameMemory::new(tiles_per_row, depth, bit_depth)?;
    memory.fill(pattern);

    let mem_file = MemFile::new(
        MemHeader {
            input_image: format!("{pattern:?} pattern"),
            output_file: file_name(&output),
            tile_size,
        },
        memory.to_rows(),
        row_encoding,
    );
    write_mem_file(&mem_file, format, &output)?;
    println!(
        "Written {depth} rows of {} bits to `{output}`",
        mem_file.width()
    );

    Ok(())
}

fn write_mem_file(
    mem_file: &MemFile,
    format: MemFormat,
    output: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let w = BufWriter::new(File::create(output)?);
    match format {
        MemFormat::Mem => mem_file.write(w)?,
        MemFormat::Coe => mem_file.write_coe(w)?,
    }
    Ok(())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_owned())
}

fn default_addr() -> SocketAddr {
    // DEFAULT_ADDR is a valid literal.
    DEFAULT_ADDR
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 32023)))
}

fn default_depth() -> usize {
    let tiles = usize::from(DEFAULT_WIDTH) * usize::from(DEFAULT_HEIGHT)
        / (DEFAULT_TILE_SIZE * DEFAULT_TILE_SIZE) as usize;
    tiles / DEFAULT_TILES_PER_ROW
}
