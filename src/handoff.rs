//! Capture thread and the single-slot frame handoff.
//!
//! The capture thread blocks on device I/O and overwrites the slot with every
//! new frame; the event loop takes whatever is newest. There is no queue: a
//! frame the consumer never saw is simply replaced and counted as dropped.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::frame::Frame;
use crate::ingest::CameraSource;

const READ_ERROR_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Default)]
struct SlotState {
    latest: Option<Arc<Frame>>,
    published: u64,
    dropped: u64,
}

/// Latest-value-wins mailbox between one producer and one consumer.
#[derive(Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub published: u64,
    pub dropped: u64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents with `frame`.
    pub fn publish(&self, frame: Frame) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        if state.latest.replace(Arc::new(frame)).is_some() {
            state.dropped += 1;
        }
        state.published += 1;
        Ok(())
    }

    /// Take the newest unseen frame, leaving the slot empty.
    pub fn take(&self) -> Result<Option<Arc<Frame>>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        Ok(state.latest.take())
    }

    pub fn stats(&self) -> Result<SlotStats> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        Ok(SlotStats {
            published: state.published,
            dropped: state.dropped,
        })
    }
}

/// Handle to a running capture thread.
#[derive(Debug)]
pub struct CaptureHandle {
    shutdown: Arc<AtomicBool>,
    healthy: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Whether the most recent read succeeded.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.join
            .as_ref()
            .map(|join| !join.is_finished())
            .unwrap_or(false)
    }

    /// Signal the thread and wait for it. The thread notices the flag after
    /// its current blocking read returns.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("capture thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

pub struct CaptureLoop;

impl CaptureLoop {
    /// Run `source` on a dedicated thread, publishing every frame into `slot`.
    /// The source must already be connected.
    pub fn spawn(source: CameraSource, slot: Arc<FrameSlot>) -> Result<CaptureHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let healthy = Arc::new(AtomicBool::new(true));
        let shutdown_thread = shutdown.clone();
        let healthy_thread = healthy.clone();
        let join = std::thread::Builder::new()
            .name("frame-capture".to_string())
            .spawn(move || run_capture(source, slot, shutdown_thread, healthy_thread))?;
        Ok(CaptureHandle {
            shutdown,
            healthy,
            join: Some(join),
        })
    }
}

fn run_capture(
    mut source: CameraSource,
    slot: Arc<FrameSlot>,
    shutdown: Arc<AtomicBool>,
    healthy: Arc<AtomicBool>,
) {
    let mut consecutive_errors = 0u32;
    while !shutdown.load(Ordering::SeqCst) {
        match source.next_frame() {
            Ok(frame) => {
                if consecutive_errors > 0 {
                    log::info!("frame capture recovered after {} errors", consecutive_errors);
                    consecutive_errors = 0;
                }
                healthy.store(true, Ordering::SeqCst);
                if let Err(err) = slot.publish(frame) {
                    log::error!("frame capture stopped: {}", err);
                    break;
                }
            }
            Err(err) => {
                consecutive_errors += 1;
                healthy.store(false, Ordering::SeqCst);
                if consecutive_errors == 1 {
                    log::warn!("frame read failed: {}", err);
                } else {
                    log::debug!("frame read failed ({}x): {}", consecutive_errors, err);
                }
                std::thread::sleep(READ_ERROR_BACKOFF);
            }
        }
    }
    let stats = source.stats();
    log::info!(
        "frame capture stopped after {} frames from {}",
        stats.frames_captured,
        stats.device
    );
}
