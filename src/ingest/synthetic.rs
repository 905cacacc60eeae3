use anyhow::Result;
use image::{Rgb, RgbImage};
use std::time::{Duration, Instant};

use super::camera::{CameraConfig, CameraStats};
use crate::frame::Frame;

/// Synthetic camera for `stub://` devices.
///
/// Renders a drifting diagonal gradient with a bright square sweeping across
/// it, so overlays and crops have something recognisable to show. Frames are
/// paced to `target_fps`.
pub(crate) struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
    last_frame_at: Option<Instant>,
}

impl SyntheticCamera {
    pub(crate) fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            last_frame_at: None,
        }
    }

    /// Synthetic cameras are always "connected".
    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic, {}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        self.pace();
        self.frame_count += 1;
        let image = self.render();
        Ok(Frame::from_image(image).with_sequence(self.frame_count))
    }

    fn pace(&mut self) {
        let interval = Duration::from_secs(1) / self.config.target_fps.max(1);
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }

    fn render(&self) -> RgbImage {
        let (width, height) = (self.config.width, self.config.height);
        let shift = self.frame_count as u32;
        let side = (width.min(height) / 6).max(1);
        let square_x = shift.wrapping_mul(4) % width.max(1);
        let square_y = height / 2 - side.min(height / 2) / 2;

        RgbImage::from_fn(width, height, |x, y| {
            let in_square = x >= square_x
                && x < square_x + side
                && y >= square_y
                && y < square_y + side;
            if in_square {
                Rgb([250, 250, 250])
            } else {
                Rgb([
                    (x.wrapping_add(shift) % 256) as u8,
                    (y % 256) as u8,
                    ((x + y) / 4 % 256) as u8,
                ])
            }
        })
    }

    pub(crate) fn is_healthy(&self) -> bool {
        true
    }

    pub(crate) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
            width: self.config.width,
            height: self.config.height,
        }
    }
}
