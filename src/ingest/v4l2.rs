//! V4L2 webcam backend.
//!
//! Webcams rarely offer RGB24 natively, so negotiation walks a preference
//! list (RGB3, YUYV, MJPG) and keeps the first format the driver echoes back.
//! Buffers are normalised to RGB24 before they leave this module.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};
use v4l::video::Capture;

use super::camera::{CameraConfig, CameraStats};
use super::normalize::{normalize_to_rgb, PixelFormat};
use crate::frame::Frame;

const PREFERRED_FOURCCS: [&[u8; 4]; 3] = [b"RGB3", b"YUYV", b"MJPG"];
const STREAM_BUFFERS: u32 = 4;
/// Consecutive read failures before the camera reports itself unhealthy.
const UNHEALTHY_AFTER: u32 = 3;

#[self_referencing]
struct Stream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    mmap: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[derive(Clone, Copy, Debug)]
struct Negotiated {
    width: u32,
    height: u32,
    format: PixelFormat,
}

pub(crate) struct DeviceCamera {
    config: CameraConfig,
    stream: Option<Stream>,
    negotiated: Negotiated,
    frame_count: u64,
    read_errors: u32,
    last_frame_at: Option<Instant>,
}

impl DeviceCamera {
    pub(crate) fn new(config: CameraConfig) -> Self {
        let negotiated = Negotiated {
            width: config.width,
            height: config.height,
            format: PixelFormat::Rgb24,
        };
        Self {
            config,
            stream: None,
            negotiated,
            frame_count: 0,
            read_errors: 0,
            last_frame_at: None,
        }
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        let device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open camera device {}", self.config.device))?;
        let negotiated = negotiate(&device, &self.config)?;
        request_fps(&device, &self.config);

        let stream = StreamBuilder {
            device,
            mmap_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(
                    device,
                    v4l::buffer::Type::VideoCapture,
                    STREAM_BUFFERS,
                )
                .map_err(|err| anyhow::Error::new(err).context("map camera buffers"))
            },
        }
        .try_build()?;

        self.negotiated = negotiated;
        self.stream = Some(stream);
        self.read_errors = 0;
        log::info!(
            "CameraSource: connected to {} ({}x{}, {:?})",
            self.config.device,
            negotiated.width,
            negotiated.height,
            negotiated.format
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let result = self.read_frame();
        match &result {
            Ok(_) => {
                self.read_errors = 0;
                self.frame_count += 1;
                self.last_frame_at = Some(Instant::now());
            }
            Err(_) => self.read_errors = self.read_errors.saturating_add(1),
        }
        Ok(result?.with_sequence(self.frame_count))
    }

    fn read_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let Negotiated {
            width,
            height,
            format,
        } = self.negotiated;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("camera {} is not connected", self.config.device))?;
        let pixels = stream.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, meta) = fields.mmap.next().context("dequeue camera buffer")?;
            // Some drivers leave bytesused at zero for fixed-size formats.
            let used = match meta.bytesused as usize {
                0 => buf.len(),
                n => n.min(buf.len()),
            };
            normalize_to_rgb(&buf[..used], width, height, format)
        })?;
        Frame::from_rgb(width, height, pixels)
    }

    pub(crate) fn is_healthy(&self) -> bool {
        if self.stream.is_none() || self.read_errors >= UNHEALTHY_AFTER {
            return false;
        }
        self.last_frame_at
            .map(|at| at.elapsed() <= self.stall_limit())
            .unwrap_or(true)
    }

    pub(crate) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
            width: self.negotiated.width,
            height: self.negotiated.height,
        }
    }

    /// Six frame periods, never below two seconds.
    fn stall_limit(&self) -> Duration {
        let period_ms = 1000 / u64::from(self.config.target_fps.max(1));
        Duration::from_millis((period_ms * 6).max(2_000))
    }
}

fn negotiate(device: &v4l::Device, config: &CameraConfig) -> Result<Negotiated> {
    let mut format = device.format().context("read camera format")?;
    for fourcc in PREFERRED_FOURCCS {
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(fourcc);
        let applied = match device.set_format(&format) {
            Ok(applied) => applied,
            Err(err) => {
                log::debug!(
                    "CameraSource: {} rejected {}: {}",
                    config.device,
                    String::from_utf8_lossy(fourcc),
                    err
                );
                continue;
            }
        };
        let Some(pixel_format) = PixelFormat::from_fourcc(&applied.fourcc.repr) else {
            continue;
        };
        if applied.width != config.width || applied.height != config.height {
            log::warn!(
                "CameraSource: {} runs at {}x{} instead of {}x{}",
                config.device,
                applied.width,
                applied.height,
                config.width,
                config.height
            );
        }
        return Ok(Negotiated {
            width: applied.width,
            height: applied.height,
            format: pixel_format,
        });
    }
    Err(anyhow!(
        "camera {} offers none of RGB3, YUYV or MJPG",
        config.device
    ))
}

fn request_fps(device: &v4l::Device, config: &CameraConfig) {
    if config.target_fps == 0 {
        return;
    }
    let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
    if let Err(err) = device.set_params(&params) {
        log::warn!(
            "CameraSource: failed to set {} fps on {}: {}",
            config.target_fps,
            config.device,
            err
        );
    }
}
