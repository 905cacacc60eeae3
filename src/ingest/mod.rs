//! Frame sources.
//!
//! - `stub://...` synthetic camera (tests, headless demos)
//! - USB/V4L2 webcams (feature: camera-v4l2)
//!
//! Every source produces RGB24 `Frame`s at the configured resolution, mirrored
//! horizontally so the player sees themselves as in a mirror. Sources block in
//! `next_frame`; they are driven from the capture thread in `handoff`, never
//! from the event loop.

pub mod camera;
#[cfg(feature = "camera-v4l2")]
mod normalize;
mod synthetic;
#[cfg(feature = "camera-v4l2")]
mod v4l2;

pub use camera::{CameraConfig, CameraSource, CameraStats};
