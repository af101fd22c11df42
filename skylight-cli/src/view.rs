use argh::FromArgs;
use skylight::{
    consts::{DEFAULT_HEIGHT, DEFAULT_WIDTH},
    decode::{DisplaySink, Framebuffer, SessionError, StreamListener},
    Rgb888,
};
use std::net::SocketAddr;

/// Receives the simulation's frame stream and shows it.
#[derive(FromArgs)]
#[argh(subcommand, name = "view")]
pub struct View {
    /// address to listen on
    #[argh(option, default = "crate::default_addr()")]
    addr: SocketAddr,
    /// frame width in pixels
    #[argh(option, default = "DEFAULT_WIDTH")]
    width: u16,
    /// frame height in pixels
    #[argh(option, default = "DEFAULT_HEIGHT")]
    height: u16,
    /// write the framebuffer as PNG to this path after every completed frame
    #[argh(option)]
    snapshot: Option<String>,
    /// keep accepting connections after the first one closed
    #[argh(switch)]
    keep_listening: bool,
    /// don't open a window even if built with one
    #[argh(switch)]
    headless: bool,
    /// treat a read starting with RESET as a padded control packet
    #[argh(switch)]
    reset_packets: bool,
}

pub fn view(options: View) -> Result<(), Box<dyn std::error::Error>> {
    let View {
        addr,
        width,
        height,
        snapshot,
        keep_listening,
        headless,
        reset_packets,
    } = options;

    if width == 0 || height == 0 {
        return Err("frame dimensions must be non-zero".into());
    }

    let listener = StreamListener::bind(addr, width, height)?.with_reset_packets(reset_packets);
    let sink = SnapshotSink::new(Framebuffer::new(width, height), snapshot);

    #[cfg(feature = "window")]
    {
        if !headless {
            return crate::window::run(listener, sink, keep_listening);
        }
    }

    if !headless && sink.path.is_none() {
        log::warn!("Built without a window and no --snapshot given, frames are only counted");
    }

    let mut sink = sink;
    serve(&listener, &mut sink, keep_listening)?;
    println!(
        "Received {} complete frames",
        sink.framebuffer.frames_completed()
    );

    Ok(())
}

/// Accepts connections and decodes each of them to completion.
///
/// With `keep_listening`, failed connections are logged and the next one is awaited.
pub(crate) fn serve<S: DisplaySink>(
    listener: &StreamListener,
    sink: &mut S,
    keep_listening: bool,
) -> Result<(), SessionError> {
    loop {
        let (mut session, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if keep_listening => {
                log::error!("{e}");
                continue;
            }
            Err(e) => return Err(e),
        };

        match session.run(sink) {
            Ok(()) => log::info!("{peer} disconnected"),
            Err(e) if keep_listening => log::error!("Connection to {peer} failed: {e}"),
            Err(e) => return Err(e),
        }

        if !keep_listening {
            return Ok(());
        }
    }
}

/// [`Framebuffer`] that saves itself as PNG whenever a frame completes and when the connection
/// closes.
pub(crate) struct SnapshotSink {
    pub(crate) framebuffer: Framebuffer,
    path: Option<String>,
}

impl SnapshotSink {
    pub(crate) fn new(framebuffer: Framebuffer, path: Option<String>) -> Self {
        Self { framebuffer, path }
    }

    fn save(&self) {
        let Some(path) = &self.path else { return };

        match self.framebuffer.to_image().into_rgb_image().save(path) {
            Ok(()) => log::debug!("Written snapshot to `{path}`"),
            Err(e) => log::error!("Failed to write snapshot to `{path}`: {e}"),
        }
    }
}

impl DisplaySink for SnapshotSink {
    fn draw(&mut self, x: u16, y: u16, colour: Rgb888) {
        self.framebuffer.draw(x, y, colour);
    }

    fn line_complete(&mut self, line: u16) {
        let frames = self.framebuffer.frames_completed();
        self.framebuffer.line_complete(line);
        if self.framebuffer.frames_completed() != frames {
            self.save();
        }
    }

    fn frame_reset(&mut self) {
        self.framebuffer.frame_reset();
    }

    fn connection_closed(&mut self) {
        self.framebuffer.connection_closed();
        self.save();
    }
}
