//! dodge-cam
//!
//! A webcam dodge game. A highlighted capture zone drifts over the mirrored
//! live feed; after a random delay the pixels under it are snapped and shown
//! as a still. Keep out of the zone.
//!
//! # Module Structure
//!
//! - `ingest`: Camera sources (V4L2 devices, synthetic `stub://` camera)
//! - `handoff`: Capture thread and the single-slot frame mailbox
//! - `motion`: Zone movement toward randomly drawn targets
//! - `schedule`: Cooperative, cancellable timers
//! - `round`: Round lifecycle and the `GameState` it owns
//! - `render`: Dashed zone overlay and view composition
//! - `captures`: Optional PNG copies of captured stills
//! - `config`: File + environment configuration
//!
//! All game state is mutated on one thread. The only other thread is the
//! capture thread, which talks to the game through `FrameSlot` alone.

pub mod captures;
pub mod config;
pub mod frame;
pub mod handoff;
pub mod ingest;
pub mod motion;
pub mod render;
pub mod round;
pub mod schedule;
pub mod ui;

pub use captures::CaptureWriter;
pub use config::GameConfig;
pub use frame::{Frame, Rect};
pub use handoff::{CaptureHandle, CaptureLoop, FrameSlot, SlotStats};
pub use ingest::{CameraConfig, CameraSource, CameraStats};
pub use motion::{MotionController, RoiState, RoiTarget, TickOutcome, Vec2};
pub use render::{OverlayColor, Renderer};
pub use round::{GameState, RoundController, RoundEvent, RoundPhase, RoundTimer, View};
pub use schedule::{Fired, Scheduler, TimerId};
