use skylight::{
    consts::RESET_MARKER,
    decode::{
        ConnectionState, Framebuffer, FrameStreamDecoder, FrameStreamWriter, SessionError,
        StreamListener, StreamSession,
    },
    utils::pixel_to_wire,
    Image, StreamEvent,
};
use std::{
    io::{self, Cursor, Read},
    sync::mpsc,
    thread,
};

use StreamEvent::*;

fn streaming(width: u16, height: u16) -> FrameStreamDecoder {
    let mut decoder = FrameStreamDecoder::new(width, height);
    decoder.accept();
    decoder
}

fn draw(x: u16, y: u16, colour: [u8; 3]) -> StreamEvent {
    Draw { x, y, colour }
}

/// Hands out at most `chunk` bytes per read, then fails if `error` is set.
struct ChunkedReader {
    data: Cursor<Vec<u8>>,
    chunk: usize,
    error: bool,
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.chunk);
        let read = self.data.read(&mut buf[..len])?;
        if read == 0 && self.error {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
        }
        Ok(read)
    }
}

#[test]
fn pixel_byte_order() {
    assert_eq!(pixel_to_wire([0xFF, 0x00, 0x00]), [0x00, 0x00, 0xFF]);
    assert_eq!(pixel_to_wire([0x01, 0x02, 0x03]), [0x03, 0x02, 0x01]);
}

#[test]
fn pixel_split_across_reads() {
    let mut decoder = streaming(640, 480);
    let mut events: Vec<StreamEvent> = Vec::new();

    decoder.feed(&[0x00], &mut events);
    assert_eq!(decoder.pending_len(), 1);
    decoder.feed(&[0x00], &mut events);
    assert_eq!(decoder.pending_len(), 2);
    assert!(events.is_empty());

    decoder.feed(&[0xFF], &mut events);
    assert_eq!(decoder.pending_len(), 0);
    assert_eq!(events, [draw(0, 0, [255, 0, 0])]);
    assert_eq!(decoder.cursor().x(), 1);
}

#[test]
fn lines_complete_and_wrap() {
    let mut decoder = streaming(2, 2);
    let mut events: Vec<StreamEvent> = Vec::new();

    let data: Vec<u8> = (1..=5u8).flat_map(|i| [i, 0, 0]).collect();
    decoder.feed(&data, &mut events);

    assert_eq!(
        events,
        [
            draw(0, 0, [0, 0, 1]),
            draw(1, 0, [0, 0, 2]),
            LineComplete { line: 0 },
            draw(0, 1, [0, 0, 3]),
            draw(1, 1, [0, 0, 4]),
            LineComplete { line: 1 },
            draw(0, 0, [0, 0, 5]),
        ]
    );
}

#[test]
fn reset_mid_line() {
    let mut decoder = streaming(4, 4);
    let mut events: Vec<StreamEvent> = Vec::new();

    decoder.feed(&[1, 2, 3, 4, 5, 6], &mut events);
    decoder.feed(RESET_MARKER, &mut events);
    decoder.feed(&[7, 8, 9], &mut events);

    assert_eq!(
        events,
        [
            draw(0, 0, [3, 2, 1]),
            draw(1, 0, [6, 5, 4]),
            FrameReset,
            draw(0, 0, [9, 8, 7]),
        ]
    );
}

#[test]
fn reset_inside_one_read() {
    let mut decoder = streaming(4, 4);
    let mut events: Vec<StreamEvent> = Vec::new();

    let mut data = vec![1, 2, 3];
    data.extend_from_slice(RESET_MARKER);
    data.extend_from_slice(RESET_MARKER);
    data.extend_from_slice(&[4, 5, 6]);
    decoder.feed(&data, &mut events);

    assert_eq!(
        events,
        [
            draw(0, 0, [3, 2, 1]),
            FrameReset,
            FrameReset,
            draw(0, 0, [6, 5, 4]),
        ]
    );
}

#[test]
fn reset_drops_partial_pixel() {
    let mut decoder = streaming(4, 4);
    let mut events: Vec<StreamEvent> = Vec::new();

    decoder.feed(&[1, 2, 3, 4, 5], &mut events);
    assert_eq!(decoder.pending_len(), 2);

    let mut data = RESET_MARKER.to_vec();
    data.extend_from_slice(&[3, 4, 5]);
    decoder.feed(&data, &mut events);

    assert_eq!(
        events,
        [draw(0, 0, [3, 2, 1]), FrameReset, draw(0, 0, [5, 4, 3])]
    );
    assert_eq!(decoder.pending_len(), 0);
}

#[test]
fn reset_split_across_reads() {
    let mut decoder = streaming(4, 4);
    let mut events: Vec<StreamEvent> = Vec::new();

    decoder.feed(b"RE", &mut events);
    decoder.feed(b"SET", &mut events);
    decoder.feed(&[1, 2, 3], &mut events);

    assert_eq!(events, [FrameReset, draw(0, 0, [3, 2, 1])]);
}

#[test]
fn partial_marker_is_pixel_data() {
    let mut decoder = streaming(4, 4);
    let mut events: Vec<StreamEvent> = Vec::new();

    decoder.feed(b"RESEX\0", &mut events);

    assert_eq!(
        events,
        [draw(0, 0, [b'S', b'E', b'R']), draw(1, 0, [0, b'X', b'E'])]
    );
}

#[test]
fn misaligned_marker_is_pixel_data() {
    let mut decoder = streaming(4, 4);
    let mut events: Vec<StreamEvent> = Vec::new();

    // One byte ahead of a pixel boundary.
    decoder.feed(b"\0RESET", &mut events);

    assert_eq!(
        events,
        [draw(0, 0, [b'E', b'R', 0]), draw(1, 0, [b'T', b'E', b'S'])]
    );
}

#[test]
fn reset_packets() {
    let mut packet = RESET_MARKER.to_vec();
    packet.resize(2048, 0);

    let mut decoder = streaming(4, 4).with_reset_packets(true);
    let mut events: Vec<StreamEvent> = Vec::new();
    decoder.feed(&[1, 2, 3, 4], &mut events);
    decoder.feed(&packet, &mut events);
    decoder.feed(&[7, 8, 9], &mut events);

    assert_eq!(
        events,
        [draw(0, 0, [3, 2, 1]), FrameReset, draw(0, 0, [9, 8, 7])]
    );

    // Without packet mode the padding decodes as black pixels.
    let mut decoder = streaming(4, 4);
    events.clear();
    decoder.feed(&packet, &mut events);

    let pixels = events
        .iter()
        .filter(|event| matches!(event, Draw { .. }))
        .count();
    assert_eq!(events[0], FrameReset);
    assert_eq!(pixels, (2048 - RESET_MARKER.len()) / 3);
}

#[test]
fn writer_reset_packet() {
    let mut writer = FrameStreamWriter::with_chunk_size(Vec::new(), 16);
    writer.pixel([1, 2, 3]).unwrap();
    writer.reset_packet().unwrap();
    let data = writer.into_inner().unwrap();

    assert_eq!(data.len(), 3 + 16);
    assert_eq!(&data[..3], [3, 2, 1]);
    assert_eq!(&data[3..8], RESET_MARKER);
    assert!(data[8..].iter().all(|&byte| byte == 0));
}

#[test]
fn connection_lifecycle() {
    let mut decoder = FrameStreamDecoder::new(4, 4);
    let mut events: Vec<StreamEvent> = Vec::new();
    assert_eq!(decoder.state(), ConnectionState::AwaitingConnection);

    decoder.feed(&[1, 2, 3], &mut events);
    assert!(events.is_empty());

    decoder.accept();
    assert_eq!(decoder.state(), ConnectionState::Streaming);
    decoder.feed(&[1, 2, 3, 4], &mut events);
    decoder.receive(&[], &mut events);

    assert_eq!(decoder.state(), ConnectionState::Draining);
    assert_eq!(decoder.pending_len(), 0);
    assert_eq!(events, [draw(0, 0, [3, 2, 1]), ConnectionClosed]);

    events.clear();
    decoder.receive(&[1, 2, 3], &mut events);
    decoder.receive(&[], &mut events);
    assert!(events.is_empty());

    decoder.accept();
    decoder.feed(&[7, 8, 9], &mut events);
    assert_eq!(events, [draw(0, 0, [9, 8, 7])]);
}

#[test]
fn framebuffer_sink() {
    let mut decoder = streaming(2, 2);
    let mut framebuffer = Framebuffer::new(2, 2);

    let data: Vec<u8> = (1..=4u8).flat_map(|i| [i, i, i]).collect();
    decoder.feed(&data, &mut framebuffer);

    assert_eq!(framebuffer.frames_completed(), 1);
    assert_eq!(framebuffer.pixel(1, 1), Some([4, 4, 4]));
    assert_eq!(framebuffer.pixel(2, 0), None);
    assert_eq!(&framebuffer.to_rgb_bytes()[..3], [1, 1, 1]);

    decoder.feed(RESET_MARKER, &mut framebuffer);
    assert!(framebuffer.pixels().iter().all(|&pixel| pixel == [0, 0, 0]));
    assert_eq!(framebuffer.frames_completed(), 1);

    decoder.receive(&[], &mut framebuffer);
    assert!(framebuffer.is_closed());
}

#[test]
fn events_replay() {
    let mut decoder = streaming(2, 1);
    let mut events: Vec<StreamEvent> = Vec::new();
    decoder.feed(&[1, 2, 3, 4, 5, 6], &mut events);

    let mut framebuffer = Framebuffer::new(2, 1);
    for event in events {
        event.dispatch(&mut framebuffer);
    }
    assert_eq!(framebuffer.pixels(), [[3, 2, 1], [6, 5, 4]]);
    assert_eq!(framebuffer.frames_completed(), 1);
}

#[test]
fn session_with_odd_chunks() {
    let image = Image::from_fn(5, 3, |x, y| [x as u8 * 40, y as u8 * 80, 200]);

    // Neither the writes nor the reads line up with pixel boundaries.
    let mut writer = FrameStreamWriter::with_chunk_size(Vec::new(), 7);
    writer.reset().unwrap();
    writer.frame(&image).unwrap();
    let data = writer.into_inner().unwrap();
    assert_eq!(data.len(), RESET_MARKER.len() + 5 * 3 * 3);

    let reader = ChunkedReader {
        data: Cursor::new(data),
        chunk: 4,
        error: false,
    };
    let mut framebuffer = Framebuffer::new(5, 3);
    let mut session = StreamSession::new(reader, 5, 3);
    session.run(&mut framebuffer).unwrap();

    assert_eq!(framebuffer.to_image(), image);
    assert_eq!(framebuffer.frames_completed(), 1);
    assert!(framebuffer.is_closed());
    assert_eq!(session.decoder().state(), ConnectionState::Draining);
}

#[test]
fn session_read_error_closes() {
    let reader = ChunkedReader {
        data: Cursor::new(vec![1, 2, 3, 4]),
        chunk: 2048,
        error: true,
    };
    let mut events: Vec<StreamEvent> = Vec::new();
    let mut session = StreamSession::new(reader, 4, 4);

    assert!(matches!(
        session.run(&mut events),
        Err(SessionError::TransportRead { .. })
    ));
    assert_eq!(events, [draw(0, 0, [3, 2, 1]), ConnectionClosed]);
}

#[test]
fn session_reuses_decoder() {
    let mut events: Vec<StreamEvent> = Vec::new();
    let mut session = StreamSession::new(Cursor::new(vec![1, 2, 3]), 4, 4);
    session.run(&mut events).unwrap();

    let decoder = session.into_decoder();
    let mut session = StreamSession::with_decoder(Cursor::new(vec![4, 5, 6]), decoder);
    session.run(&mut events).unwrap();

    assert_eq!(
        events,
        [
            draw(0, 0, [3, 2, 1]),
            ConnectionClosed,
            draw(0, 0, [6, 5, 4]),
            ConnectionClosed
        ]
    );
}

#[test]
fn connect_without_viewer() {
    let addr = {
        let listener = StreamListener::bind("127.0.0.1:0".parse().unwrap(), 4, 2).unwrap();
        listener.local_addr().unwrap()
    };

    assert!(matches!(
        FrameStreamWriter::connect_with_chunk_size(addr, 7),
        Err(SessionError::Connect { addr: failed, .. }) if failed == addr
    ));
}

#[test]
fn channel_sink() {
    let (mut sender, receiver) = mpsc::channel::<StreamEvent>();
    let mut decoder = streaming(4, 4);
    decoder.feed(&[1, 2, 3], &mut sender);
    decoder.receive(&[], &mut sender);
    drop(sender);

    let events: Vec<_> = receiver.iter().collect();
    assert_eq!(events, [draw(0, 0, [3, 2, 1]), ConnectionClosed]);
}

#[test]
fn tcp_loopback() {
    let listener = StreamListener::bind("127.0.0.1:0".parse().unwrap(), 4, 2).unwrap();
    let addr = listener.local_addr().unwrap();
    let image = Image::from_fn(4, 2, |x, y| [x as u8, y as u8, 9]);

    let sender = {
        let image = image.clone();
        thread::spawn(move || {
            // Writes of 7 bytes split pixels across transport reads.
            let mut writer = FrameStreamWriter::connect_with_chunk_size(addr, 7).unwrap();
            for _ in 0..3 {
                writer.reset().unwrap();
                writer.frame(&image).unwrap();
            }
            writer.flush().unwrap();
        })
    };

    let (mut session, _peer) = listener.accept().unwrap();
    let mut framebuffer = Framebuffer::new(4, 2);
    session.run(&mut framebuffer).unwrap();
    sender.join().unwrap();

    assert_eq!(framebuffer.to_image(), image);
    assert_eq!(framebuffer.frames_completed(), 3);
    assert!(framebuffer.is_closed());
}
