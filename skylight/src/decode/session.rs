use crate::{
    consts::{READ_BUFFER_SIZE, RESET_MARKER},
    decode::{DisplaySink, FrameStreamDecoder, StreamEvent},
    encode::Image,
    utils::{pixel_to_wire, Rgb888},
};
use snafu::{ResultExt, Snafu};
use std::{
    io::{ErrorKind, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::mpsc::Sender,
};

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("Failed to listen on {addr}"))]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[snafu(display("Failed to connect to {addr}"))]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[snafu(display("Failed to accept a connection"))]
    ConnectionAccept { source: std::io::Error },
    #[snafu(display("Failed to read from the connection"))]
    TransportRead { source: std::io::Error },
    #[snafu(display("Failed to write to the connection"))]
    TransportWrite { source: std::io::Error },
}

/// Listening socket of the viewer. Every accepted connection gets its own [`StreamSession`].
#[derive(Debug)]
pub struct StreamListener {
    listener: TcpListener,
    width: u16,
    height: u16,
    reset_packets: bool,
}

impl StreamListener {
    pub fn bind(addr: SocketAddr, width: u16, height: u16) -> Result<Self, SessionError> {
        let listener = TcpListener::bind(addr).context(BindSnafu { addr })?;
        log::info!("Listening for a {width}x{height} frame stream on {addr}");

        Ok(Self {
            listener,
            width,
            height,
            reset_packets: false,
        })
    }

    /// Decodes every accepted connection with
    /// [`FrameStreamDecoder::with_reset_packets`].
    pub fn with_reset_packets(mut self, enabled: bool) -> Self {
        self.reset_packets = enabled;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Blocks until a client connects.
    pub fn accept(&self) -> Result<(StreamSession<TcpStream>, SocketAddr), SessionError> {
        let (stream, peer) = self.listener.accept().context(ConnectionAcceptSnafu)?;
        log::info!("Connected to {peer}");

        let decoder =
            FrameStreamDecoder::new(self.width, self.height).with_reset_packets(self.reset_packets);
        Ok((StreamSession::with_decoder(stream, decoder), peer))
    }
}

/// One connection's worth of decoding: the transport, the decoder and its read buffer.
#[derive(Debug)]
pub struct StreamSession<R> {
    reader: R,
    decoder: FrameStreamDecoder,
    buffer: Box<[u8; READ_BUFFER_SIZE]>,
}

impl<R: Read> StreamSession<R> {
    pub fn new(reader: R, width: u16, height: u16) -> Self {
        Self::with_decoder(reader, FrameStreamDecoder::new(width, height))
    }

    /// Reuses a decoder from a previous connection.
    pub fn with_decoder(reader: R, mut decoder: FrameStreamDecoder) -> Self {
        decoder.accept();
        Self {
            reader,
            decoder,
            buffer: Box::new([0; READ_BUFFER_SIZE]),
        }
    }

    #[inline]
    pub fn decoder(&self) -> &FrameStreamDecoder {
        &self.decoder
    }

    pub fn into_decoder(self) -> FrameStreamDecoder {
        self.decoder
    }

    /// Reads and decodes until the peer closes the connection.
    ///
    /// A read error ends the connection as well: the sink is told the connection closed before
    /// the error is returned.
    pub fn run<S: DisplaySink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SessionError> {
        let mut total = 0usize;

        loop {
            match self.reader.read(&mut self.buffer[..]) {
                Ok(len) => {
                    total += len;
                    self.decoder.receive(&self.buffer[..len], sink);
                    if len == 0 {
                        log::info!("Connection closed after {total} bytes");
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("Read failed after {total} bytes: {e}");
                    self.decoder.close(sink);
                    return Err(e).context(TransportReadSnafu);
                }
            }
        }
    }
}

/// Forwards events to another thread, typically the one owning the window.
///
/// Events sent after the receiver hung up are dropped.
impl DisplaySink for Sender<StreamEvent> {
    fn draw(&mut self, x: u16, y: u16, colour: Rgb888) {
        let _ = self.send(StreamEvent::Draw { x, y, colour });
    }

    fn line_complete(&mut self, line: u16) {
        let _ = self.send(StreamEvent::LineComplete { line });
    }

    fn frame_reset(&mut self) {
        let _ = self.send(StreamEvent::FrameReset);
    }

    fn connection_closed(&mut self) {
        if self.send(StreamEvent::ConnectionClosed).is_err() {
            log::debug!("Display went away before the connection closed");
        }
    }
}

/// Sending side of the frame stream, as the simulation's socket client would produce it.
///
/// Output is buffered and handed to the transport in `chunk_size` writes, which need not line
/// up with pixel boundaries.
#[derive(Debug)]
pub struct FrameStreamWriter<W: Write> {
    inner: W,
    chunk_size: usize,
    buffer: Vec<u8>,
}

impl FrameStreamWriter<TcpStream> {
    pub fn connect(addr: SocketAddr) -> Result<Self, SessionError> {
        Self::connect_with_chunk_size(addr, READ_BUFFER_SIZE)
    }

    pub fn connect_with_chunk_size(
        addr: SocketAddr,
        chunk_size: usize,
    ) -> Result<Self, SessionError> {
        let stream = TcpStream::connect(addr).context(ConnectSnafu { addr })?;
        log::info!("Connected to viewer at {addr}");
        Ok(Self::with_chunk_size(stream, chunk_size))
    }
}

impl<W: Write> FrameStreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_chunk_size(inner, READ_BUFFER_SIZE)
    }

    pub fn with_chunk_size(inner: W, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            inner,
            chunk_size,
            buffer: Vec::with_capacity(chunk_size * 2),
        }
    }

    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.buffer.extend_from_slice(RESET_MARKER);
        self.write_full_chunks()
    }

    /// Sends the reset marker as a packet of its own, zero padded to the chunk size. Pixels
    /// buffered so far are written out first.
    ///
    /// Only meaningful for viewers decoding with reset packets.
    pub fn reset_packet(&mut self) -> Result<(), SessionError> {
        self.write_buffered()?;

        let mut packet = vec![0; self.chunk_size.max(RESET_MARKER.len())];
        packet[..RESET_MARKER.len()].copy_from_slice(RESET_MARKER);
        self.inner.write_all(&packet).context(TransportWriteSnafu)
    }

    pub fn pixel(&mut self, colour: Rgb888) -> Result<(), SessionError> {
        self.buffer.extend_from_slice(&pixel_to_wire(colour));
        self.write_full_chunks()
    }

    pub fn line(&mut self, pixels: &[Rgb888]) -> Result<(), SessionError> {
        for &pixel in pixels {
            self.buffer.extend_from_slice(&pixel_to_wire(pixel));
        }
        self.write_full_chunks()
    }

    /// Writes every line of `image`, top to bottom. No reset is sent.
    pub fn frame(&mut self, image: &Image) -> Result<(), SessionError> {
        for line in image.pixels().chunks(image.width().max(1) as usize) {
            self.line(line)?;
        }
        Ok(())
    }

    /// Writes out everything buffered, including a trailing partial chunk.
    pub fn flush(&mut self) -> Result<(), SessionError> {
        self.write_buffered()?;
        self.inner.flush().context(TransportWriteSnafu)
    }

    /// Flushes and hands back the transport.
    pub fn into_inner(mut self) -> Result<W, SessionError> {
        self.flush()?;
        Ok(self.inner)
    }

    fn write_buffered(&mut self) -> Result<(), SessionError> {
        self.write_full_chunks()?;
        if !self.buffer.is_empty() {
            self.inner
                .write_all(&self.buffer)
                .context(TransportWriteSnafu)?;
            self.buffer.clear();
        }
        Ok(())
    }

    fn write_full_chunks(&mut self) -> Result<(), SessionError> {
        let full = self.buffer.len() / self.chunk_size * self.chunk_size;
        if full == 0 {
            return Ok(());
        }

        for chunk in self.buffer[..full].chunks(self.chunk_size) {
            self.inner.write_all(chunk).context(TransportWriteSnafu)?;
        }
        self.buffer.drain(..full);
        Ok(())
    }
}
