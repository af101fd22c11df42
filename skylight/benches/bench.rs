use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skylight::{
    consts::{DEFAULT_HEIGHT, DEFAULT_WIDTH, RESET_MARKER},
    decode::{Framebuffer, FrameStreamDecoder},
    encode::{encode, encode_tiles, ColourMode, EncodeConfig, Image},
    pack::{MemFile, MemHeader, RowEncoding},
    utils::pixel_to_wire,
};

fn test_image() -> Image {
    Image::from_fn(
        u32::from(DEFAULT_WIDTH),
        u32::from(DEFAULT_HEIGHT),
        |x, y| [(x ^ y) as u8, (x * 3) as u8, (y * 5) as u8],
    )
}

fn encode_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode 640x480");
    let image = test_image();
    group.throughput(Throughput::Elements(image.pixels().len() as u64));

    for mode in [ColourMode::Colour, ColourMode::Greyscale] {
        group.bench_with_input(
            BenchmarkId::new("tiles", format!("{mode:?}")),
            &image,
            |b, image| b.iter(|| encode_tiles(image, 4, 3, mode).unwrap()),
        );
    }

    for row_encoding in [RowEncoding::Binary, RowEncoding::Hex] {
        let config = EncodeConfig {
            row_encoding,
            ..EncodeConfig::default()
        };
        group.bench_with_input(
            BenchmarkId::new("mem file", format!("{row_encoding:?}")),
            &image,
            |b, image| {
                b.iter(|| {
                    let rows = encode(image, &config).unwrap();
                    MemFile::new(MemHeader::default(), rows, row_encoding).to_string()
                })
            },
        );
    }

    group.finish();
}

fn decode_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode 640x480");
    let image = test_image();

    let mut stream = RESET_MARKER.to_vec();
    stream.extend(image.pixels().iter().flat_map(|&pixel| pixel_to_wire(pixel)));
    group.throughput(Throughput::Bytes(stream.len() as u64));

    for read_size in [3, 2048, 2047] {
        group.bench_with_input(
            BenchmarkId::new("framebuffer", read_size),
            &stream,
            |b, stream| {
                let mut framebuffer = Framebuffer::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
                b.iter(|| {
                    let mut decoder = FrameStreamDecoder::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
                    decoder.accept();
                    for chunk in stream.chunks(read_size) {
                        decoder.feed(chunk, &mut framebuffer);
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, encode_pipeline, decode_stream);
criterion_main!(benches);
