//! Optional on-disk copies of captured stills.
//!
//! The round controller never touches the filesystem; a driver that wants to
//! keep the snapshots hands them to a `CaptureWriter` after each capture.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::frame::Frame;

pub struct CaptureWriter {
    dir: PathBuf,
    written: u64,
}

impl CaptureWriter {
    /// Create the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create capture directory {}", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write `still` as `capture_<round>_<unix-ms>.png`.
    pub fn write(&mut self, still: &Frame, round: u64) -> Result<PathBuf> {
        let stamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = self
            .dir
            .join(format!("capture_{:04}_{}.png", round, stamp_ms));
        still
            .image()
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("write capture {}", path.display()))?;
        self.written += 1;
        log::info!("round {} capture saved to {}", round, path.display());
        Ok(path)
    }
}
