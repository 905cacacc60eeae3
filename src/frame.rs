//! Frame and rectangle types shared by ingest, the controllers and the renderer.
//!
//! - `Frame`: an RGB24 image produced by a frame source, already mirrored.
//! - `Rect`: an integer pixel rectangle with exclusive far corner, the shape the
//!   motion controller hands to the renderer and the capture path.

use anyhow::{anyhow, Result};
use image::{imageops, RgbImage};
use std::time::Instant;

// ----------------------------------------------------------------------------
// Rect
// ----------------------------------------------------------------------------

/// Pixel rectangle `(x1, y1)..(x2, y2)`; `x2`/`y2` are exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rect {
    pub const fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Intersection with a `width x height` frame.
    pub fn clipped_to(&self, width: u32, height: u32) -> Rect {
        Rect {
            x1: self.x1.min(width),
            y1: self.y1.min(height),
            x2: self.x2.min(width),
            y2: self.y2.min(height),
        }
    }
}

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One RGB24 video frame.
#[derive(Clone)]
pub struct Frame {
    image: RgbImage,
    /// Sequence number assigned by the source (1-based).
    pub sequence: u64,
    captured_at: Instant,
}

impl Frame {
    /// Wrap packed RGB24 pixels. Fails if the buffer length does not match.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let len = pixels.len();
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            anyhow!(
                "RGB frame length mismatch: {}x{} needs {} bytes, got {}",
                width,
                height,
                width as usize * height as usize * 3,
                len
            )
        })?;
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn age(&self) -> std::time::Duration {
        self.captured_at.elapsed()
    }

    /// Flip left-to-right so the preview behaves like a mirror.
    pub fn mirrored(mut self) -> Self {
        imageops::flip_horizontal_in_place(&mut self.image);
        self
    }

    /// Copy out the pixels under `rect`. `None` when the clipped area is empty.
    pub fn crop(&self, rect: &Rect) -> Option<Frame> {
        let rect = rect.clipped_to(self.width(), self.height());
        if rect.is_empty() {
            return None;
        }
        let view = imageops::crop_imm(&self.image, rect.x1, rect.y1, rect.width(), rect.height());
        Some(Frame {
            image: view.to_image(),
            sequence: self.sequence,
            captured_at: self.captured_at,
        })
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("sequence", &self.sequence)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
