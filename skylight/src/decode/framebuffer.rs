use crate::{decode::DisplaySink, encode::Image, utils::Rgb888};
use alloc::{vec, vec::Vec};

/// In-memory [`DisplaySink`] holding the most recent state of every pixel.
///
/// A reset blanks the buffer, like the viewer clearing its screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u16,
    height: u16,
    pixels: Vec<Rgb888>,
    frames_completed: u64,
    closed: bool,
}

impl Framebuffer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 3]; usize::from(width) * usize::from(height)],
            frames_completed: 0,
            closed: false,
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb888> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[usize::from(y) * usize::from(self.width) + usize::from(x)])
    }

    /// Number of times the last scanline of the frame was completed.
    #[inline]
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn clear(&mut self) {
        self.pixels.fill([0; 3]);
    }

    /// Packed `r, g, b` bytes, row-major.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flatten().copied().collect()
    }

    pub fn to_image(&self) -> Image {
        Image::from_fn(u32::from(self.width), u32::from(self.height), |x, y| {
            self.pixels[y as usize * usize::from(self.width) + x as usize]
        })
    }
}

impl DisplaySink for Framebuffer {
    fn draw(&mut self, x: u16, y: u16, colour: Rgb888) {
        if x >= self.width || y >= self.height {
            log::warn!("Dropping pixel ({x}, {y}) outside of the framebuffer");
            return;
        }
        self.pixels[usize::from(y) * usize::from(self.width) + usize::from(x)] = colour;
    }

    fn line_complete(&mut self, line: u16) {
        if u32::from(line) + 1 == u32::from(self.height) {
            self.frames_completed += 1;
        }
    }

    fn frame_reset(&mut self) {
        self.clear();
    }

    fn connection_closed(&mut self) {
        self.closed = true;
    }
}
