use crate::view::{serve, SnapshotSink};
use minifb::{Key, Window, WindowOptions};
use skylight::decode::{StreamEvent, StreamListener};
use std::{sync::mpsc, thread};

const TITLE: &str = "VGA Simulator";

/// Shows the stream in a window. Decoding runs on a worker thread, the window owns the
/// framebuffer and is redrawn from it once per display refresh.
pub fn run(
    listener: StreamListener,
    mut sink: SnapshotSink,
    keep_listening: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let width = usize::from(sink.framebuffer.width());
    let height = usize::from(sink.framebuffer.height());

    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("frame-stream".into())
        .spawn(move || {
            let mut sender = sender;
            if let Err(e) = serve(&listener, &mut sender, keep_listening) {
                log::error!("{e}");
            }
        })?;

    let options = WindowOptions {
        resize: true,
        ..WindowOptions::default()
    };
    let mut window = Window::new(&format!("{TITLE} - No Connection"), width, height, options)?;
    window.set_target_fps(60);

    let mut buffer = vec![0u32; width * height];
    let mut connected = false;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        for event in receiver.try_iter() {
            match event {
                StreamEvent::ConnectionClosed => {
                    connected = false;
                    window.set_title(&format!("{TITLE} - Connection closed"));
                }
                _ if !connected => {
                    connected = true;
                    window.set_title(&format!("{TITLE} - Connected"));
                }
                _ => {}
            }
            event.dispatch(&mut sink);
        }

        for (out, &[r, g, b]) in buffer.iter_mut().zip(sink.framebuffer.pixels()) {
            *out = (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
        }
        window.update_with_buffer(&buffer, width, height)?;
    }

    log::info!(
        "Window closed after {} complete frames",
        sink.framebuffer.frames_completed()
    );

    Ok(())
}
