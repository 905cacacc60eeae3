//! Camera frame source.
//!
//! `CameraSource` picks a backend from the device string: `stub://` paths get
//! the synthetic camera, anything else is opened as a V4L2 device node.

use anyhow::Result;
#[cfg(not(feature = "camera-v4l2"))]
use anyhow::anyhow;

use super::synthetic::SyntheticCamera;
#[cfg(feature = "camera-v4l2")]
use super::v4l2::DeviceCamera;
use crate::config::CameraSettings;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or `stub://name`.
    pub device: String,
    /// Target frame rate. Synthetic sources pace themselves to it.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Flip frames left-to-right before handing them out.
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
            mirror: true,
        }
    }
}

impl From<&CameraSettings> for CameraConfig {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            device: settings.device.clone(),
            target_fps: settings.target_fps,
            width: settings.width,
            height: settings.height,
            mirror: true,
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
    pub width: u32,
    pub height: u32,
}

pub struct CameraSource {
    mirror: bool,
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "camera-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let mirror = config.mirror;
        if config.device.starts_with("stub://") {
            return Ok(Self {
                mirror,
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            });
        }
        #[cfg(feature = "camera-v4l2")]
        {
            Ok(Self {
                mirror,
                backend: CameraBackend::Device(DeviceCamera::new(config)),
            })
        }
        #[cfg(not(feature = "camera-v4l2"))]
        {
            Err(anyhow!(
                "camera device {} requires the camera-v4l2 feature (use stub:// for a synthetic camera)",
                config.device
            ))
        }
    }

    /// Open the device. A failure here means no frames will ever arrive.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    /// Block until the next frame is available.
    pub fn next_frame(&mut self) -> Result<Frame> {
        let frame = match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame()?,
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.next_frame()?,
        };
        Ok(if self.mirror { frame.mirrored() } else { frame })
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}
