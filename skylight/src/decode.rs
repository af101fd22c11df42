use crate::{
    consts::{PIXEL_BYTES, RESET_MARKER},
    utils::{pixel_from_wire, Rgb888},
};

#[cfg(feature = "alloc")]
mod framebuffer;
#[cfg(feature = "alloc")]
pub use framebuffer::*;

#[cfg(feature = "std")]
mod session;
#[cfg(feature = "std")]
pub use session::*;

/// Receiver of decoded frame-stream events, e.g. a window or an in-memory framebuffer.
pub trait DisplaySink {
    /// A pixel was decoded for column `x` of scanline `y`.
    fn draw(&mut self, x: u16, y: u16, colour: Rgb888);
    /// Scanline `line` received all of its pixels. Doubles as the cue to present.
    fn line_complete(&mut self, line: u16);
    /// A reset marker was received; the scan restarts at the top left corner.
    fn frame_reset(&mut self);
    /// The peer closed the connection. No further events follow for it.
    fn connection_closed(&mut self);
}

impl<S: DisplaySink + ?Sized> DisplaySink for &mut S {
    #[inline]
    fn draw(&mut self, x: u16, y: u16, colour: Rgb888) {
        (**self).draw(x, y, colour)
    }

    #[inline]
    fn line_complete(&mut self, line: u16) {
        (**self).line_complete(line)
    }

    #[inline]
    fn frame_reset(&mut self) {
        (**self).frame_reset()
    }

    #[inline]
    fn connection_closed(&mut self) {
        (**self).connection_closed()
    }
}

/// A [`DisplaySink`] call as a value, for recording or sending events elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Draw { x: u16, y: u16, colour: Rgb888 },
    LineComplete { line: u16 },
    FrameReset,
    ConnectionClosed,
}

impl StreamEvent {
    /// Replays the event on `sink`.
    pub fn dispatch<S: DisplaySink + ?Sized>(self, sink: &mut S) {
        match self {
            StreamEvent::Draw { x, y, colour } => sink.draw(x, y, colour),
            StreamEvent::LineComplete { line } => sink.line_complete(line),
            StreamEvent::FrameReset => sink.frame_reset(),
            StreamEvent::ConnectionClosed => sink.connection_closed(),
        }
    }
}

#[cfg(feature = "alloc")]
impl DisplaySink for alloc::vec::Vec<StreamEvent> {
    fn draw(&mut self, x: u16, y: u16, colour: Rgb888) {
        self.push(StreamEvent::Draw { x, y, colour });
    }

    fn line_complete(&mut self, line: u16) {
        self.push(StreamEvent::LineComplete { line });
    }

    fn frame_reset(&mut self) {
        self.push(StreamEvent::FrameReset);
    }

    fn connection_closed(&mut self) {
        self.push(StreamEvent::ConnectionClosed);
    }
}

/// Scan position within a `width`x`height` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCursor {
    x: u16,
    line: u16,
    width: u16,
    height: u16,
}

impl FrameCursor {
    /// # Panics
    ///
    /// Panics if `width` or `height` is 0.
    pub const fn new(width: u16, height: u16) -> Self {
        assert!(width != 0 && height != 0, "frame dimensions must be non-zero");
        Self {
            x: 0,
            line: 0,
            width,
            height,
        }
    }

    /// Next column to be drawn on the current line.
    #[inline]
    pub const fn x(&self) -> u16 {
        self.x
    }

    /// Current scanline, always in `0..height`.
    #[inline]
    pub const fn line(&self) -> u16 {
        self.line
    }

    #[inline]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    pub fn reset(&mut self) {
        self.x = 0;
        self.line = 0;
    }

    /// Moves past one pixel. Returns the finished scanline when this pixel completed it.
    #[inline]
    pub fn advance(&mut self) -> Option<u16> {
        self.x += 1;
        if self.x < self.width {
            return None;
        }

        let finished = self.line;
        self.x = 0;
        self.line = if self.line + 1 == self.height {
            0
        } else {
            self.line + 1
        };
        Some(finished)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingConnection,
    Streaming,
    /// The peer closed the connection. Terminal until the next [`accept`].
    ///
    /// [`accept`]: FrameStreamDecoder::accept
    Draining,
}

/// Turns the raw frame stream into [`DisplaySink`] events.
///
/// Reads of any size can be fed; bytes of a pixel split across reads are carried over to the
/// next one. A reset marker is recognised at pixel boundaries only, across the carried bytes and
/// the new read. If a read starts with the marker while an incomplete pixel is carried, the
/// incomplete pixel is dropped in favour of the reset. Anything else, including a partial
/// marker like `RESEX`, is pixel data.
///
/// Clients that send the marker as a padded packet of its own can be decoded with
/// [`with_reset_packets`](Self::with_reset_packets).
#[derive(Debug, Clone)]
pub struct FrameStreamDecoder {
    state: ConnectionState,
    cursor: FrameCursor,
    pending: [u8; PIXEL_BYTES - 1],
    pending_len: usize,
    reset_packets: bool,
}

impl FrameStreamDecoder {
    /// # Panics
    ///
    /// Panics if `width` or `height` is 0.
    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            state: ConnectionState::AwaitingConnection,
            cursor: FrameCursor::new(width, height),
            pending: [0; PIXEL_BYTES - 1],
            pending_len: 0,
            reset_packets: false,
        }
    }

    /// When enabled, a read starting with the reset marker is a control packet: the bytes after
    /// the marker are padding and dropped with the rest of the read.
    pub const fn with_reset_packets(mut self, enabled: bool) -> Self {
        self.reset_packets = enabled;
        self
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn cursor(&self) -> &FrameCursor {
        &self.cursor
    }

    /// Number of bytes of an incomplete pixel carried over to the next read.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending_len
    }

    /// Starts a new connection with an empty buffer and the scan at the top left corner.
    pub fn accept(&mut self) {
        if self.state == ConnectionState::Streaming {
            log::warn!("New connection while streaming, dropping the previous one");
        }
        self.state = ConnectionState::Streaming;
        self.cursor.reset();
        self.pending_len = 0;
    }

    /// Handles the result of one transport read: an empty read means the peer closed.
    pub fn receive<S: DisplaySink + ?Sized>(&mut self, data: &[u8], sink: &mut S) {
        if data.is_empty() {
            self.close(sink);
        } else {
            self.feed(data, sink);
        }
    }

    /// Ends the current connection, dropping buffered bytes and the scan position.
    pub fn close<S: DisplaySink + ?Sized>(&mut self, sink: &mut S) {
        if self.state != ConnectionState::Streaming {
            return;
        }

        if self.pending_len != 0 {
            log::debug!(
                "Connection closed with {} bytes of an incomplete pixel",
                self.pending_len
            );
        }

        self.state = ConnectionState::Draining;
        self.cursor.reset();
        self.pending_len = 0;
        sink.connection_closed();
    }

    /// Decodes the bytes of one read. Ignored unless streaming.
    pub fn feed<S: DisplaySink + ?Sized>(&mut self, data: &[u8], sink: &mut S) {
        if self.state != ConnectionState::Streaming {
            log::warn!(
                "Ignoring {} bytes received in state {:?}",
                data.len(),
                self.state
            );
            return;
        }

        if self.reset_packets && data.starts_with(RESET_MARKER) {
            log::trace!(
                "Dropping {} bytes of reset packet padding",
                data.len() - RESET_MARKER.len()
            );
            self.reset(sink);
            return;
        }

        let mut data = data;

        if self.pending_len != 0 {
            let pending_buf = self.pending;
            let pending = &pending_buf[..self.pending_len];

            if starts_with_reset(pending, data) {
                data = &data[RESET_MARKER.len() - pending.len()..];
                self.reset(sink);
            } else if data.starts_with(RESET_MARKER) {
                log::trace!(
                    "Dropping {} bytes of an incomplete pixel for a reset",
                    pending.len()
                );
                data = &data[RESET_MARKER.len()..];
                self.reset(sink);
            } else {
                let needed = PIXEL_BYTES - pending.len();
                if data.len() < needed {
                    self.pending[pending.len()..][..data.len()].copy_from_slice(data);
                    self.pending_len += data.len();
                    return;
                }

                let mut bytes = [0; PIXEL_BYTES];
                bytes[..pending.len()].copy_from_slice(pending);
                bytes[pending.len()..].copy_from_slice(&data[..needed]);
                data = &data[needed..];
                self.pending_len = 0;
                self.pixel(bytes, sink);
            }
        }

        loop {
            if let Some(rest) = data.strip_prefix(RESET_MARKER.as_slice()) {
                data = rest;
                self.reset(sink);
                continue;
            }

            match data {
                &[b0, b1, b2, ref rest @ ..] => {
                    data = rest;
                    self.pixel([b0, b1, b2], sink);
                }
                _ => break,
            }
        }

        self.pending[..data.len()].copy_from_slice(data);
        self.pending_len = data.len();
    }

    #[inline]
    fn pixel<S: DisplaySink + ?Sized>(&mut self, bytes: [u8; PIXEL_BYTES], sink: &mut S) {
        let colour = pixel_from_wire(bytes);
        sink.draw(self.cursor.x(), self.cursor.line(), colour);

        if let Some(line) = self.cursor.advance() {
            log::trace!("Line {line} complete");
            sink.line_complete(line);
        }
    }

    fn reset<S: DisplaySink + ?Sized>(&mut self, sink: &mut S) {
        log::trace!(
            "Reset at ({}, {})",
            self.cursor.x(),
            self.cursor.line()
        );
        self.cursor.reset();
        self.pending_len = 0;
        sink.frame_reset();
    }
}

/// Whether the carried bytes followed by `data` begin with a full reset marker.
#[inline]
fn starts_with_reset(pending: &[u8], data: &[u8]) -> bool {
    pending
        .iter()
        .chain(data)
        .take(RESET_MARKER.len())
        .eq(RESET_MARKER.iter())
}
