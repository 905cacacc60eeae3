//! Round lifecycle.
//!
//! `RoundController` owns the whole `GameState` and the scheduler that drives
//! it. The event loop feeds it frames (`on_frame`) and the current monotonic
//! time (`advance`); everything else happens inside, on the caller's thread.
//!
//! ```text
//! Idle --start--> Running --capture--> Captured --next_round--> Running ...
//!                    |
//!                    +--stop--> Stopped --start--> Running ...
//! ```
//!
//! Each round registers exactly two timers: the repeating motion tick and the
//! one-shot capture. Both ids are forgotten the moment they are cancelled, and
//! a fired timer is only honoured if its id is still the registered one, so a
//! late delivery after `stop_round` or a restart is a no-op.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

use crate::config::GameConfig;
use crate::frame::{Frame, Rect};
use crate::motion::MotionController;
use crate::schedule::{Fired, Scheduler, TimerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Running,
    Captured,
    Stopped,
}

impl RoundPhase {
    /// One-line status for a display shell.
    pub fn status_line(&self, speed: f64) -> String {
        match self {
            RoundPhase::Idle => "Press start to begin".to_string(),
            RoundPhase::Running => format!("Round in progress... speed {:.1}", speed),
            RoundPhase::Captured => {
                "Captured! The zone has been snapped. Start the next round.".to_string()
            }
            RoundPhase::Stopped => "Game stopped. Press start to play again.".to_string(),
        }
    }
}

/// Which image a display should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Live,
    Captured,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundTimer {
    Tick,
    Capture,
}

/// Things that happened while timers were dispatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundEvent {
    Captured { round: u64, rect: Rect },
    /// The capture found nothing to crop and a new round was started.
    Restarted { round: u64 },
}

/// All mutable game state. Read-only outside the controller.
pub struct GameState {
    phase: RoundPhase,
    view: View,
    round: u64,
    motion: MotionController,
    current_frame: Option<Arc<Frame>>,
    captured: Option<Frame>,
    capture_delay: Option<Duration>,
    ticks: u64,
}

impl GameState {
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RoundPhase::Running
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// 1-based number of the current (or last) round; 0 before the first start.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    pub fn current_rectangle(&self) -> Rect {
        self.motion.current_rectangle()
    }

    pub fn current_frame(&self) -> Option<&Arc<Frame>> {
        self.current_frame.as_ref()
    }

    pub fn captured(&self) -> Option<&Frame> {
        self.captured.as_ref()
    }

    pub fn capture_delay(&self) -> Option<Duration> {
        self.capture_delay
    }

    /// Motion ticks applied in the current round.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

pub struct RoundController {
    state: GameState,
    scheduler: Scheduler<RoundTimer>,
    tick_timer: Option<TimerId>,
    capture_timer: Option<TimerId>,
    tick_interval: Duration,
    capture_delay_ms: (u64, u64),
    frame_size: (u32, u32),
    rng: StdRng,
    source_error: Option<String>,
}

impl RoundController {
    pub fn new(config: &GameConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let motion_rng = StdRng::seed_from_u64(rng.gen());
        let frame_size = (config.camera.width, config.camera.height);
        let motion =
            MotionController::new(config.motion.clone(), frame_size.0, frame_size.1, motion_rng);
        Self {
            state: GameState {
                phase: RoundPhase::Idle,
                view: View::Live,
                round: 0,
                motion,
                current_frame: None,
                captured: None,
                capture_delay: None,
                ticks: 0,
            },
            scheduler: Scheduler::new(),
            tick_timer: None,
            capture_timer: None,
            tick_interval: config.round.tick_interval,
            capture_delay_ms: config.round.capture_delay_ms,
            frame_size,
            rng,
            source_error: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Currently registered (tick, capture) timers.
    pub fn timer_ids(&self) -> (Option<TimerId>, Option<TimerId>) {
        (self.tick_timer, self.capture_timer)
    }

    /// Time until the next timer is due, for sizing the event loop's sleep.
    pub fn next_due_in(&self) -> Option<Duration> {
        self.scheduler.next_due_in()
    }

    /// Record that the frame source could not be opened. No round starts after this.
    pub fn mark_source_unavailable(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        log::error!("frame source unavailable: {}", reason);
        self.source_error = Some(reason);
        if self.state.phase == RoundPhase::Running {
            self.stop_round();
        }
    }

    pub fn source_available(&self) -> bool {
        self.source_error.is_none()
    }

    pub fn set_speed(&mut self, value: f64) -> f64 {
        self.state.motion.set_speed(value)
    }

    /// Hand over the newest frame from the capture thread.
    pub fn on_frame(&mut self, frame: Arc<Frame>) {
        self.frame_size = (frame.width(), frame.height());
        self.state.current_frame = Some(frame);
    }

    pub fn start_round(&mut self) -> Result<()> {
        if let Some(reason) = &self.source_error {
            return Err(anyhow!("cannot start round: frame source unavailable ({})", reason));
        }
        self.cancel_timers();

        self.state.captured = None;
        self.state.view = View::Live;
        self.state.round += 1;
        self.state.ticks = 0;

        let (width, height) = self.frame_size;
        self.state.motion.reset(width, height);
        self.state.motion.retarget();

        let (min, max) = self.capture_delay_ms;
        let delay = Duration::from_millis(self.rng.gen_range(min..=max));
        self.tick_timer = Some(
            self.scheduler
                .schedule_repeating(self.tick_interval, RoundTimer::Tick),
        );
        self.capture_timer = Some(self.scheduler.schedule_once(delay, RoundTimer::Capture));
        self.state.capture_delay = Some(delay);
        self.state.phase = RoundPhase::Running;

        log::info!(
            "round {} started (speed {:.1}, capture in {} ms)",
            self.state.round,
            self.state.motion.speed(),
            delay.as_millis()
        );
        Ok(())
    }

    /// Stop a running round. Returns false (and changes nothing) otherwise.
    pub fn stop_round(&mut self) -> bool {
        if self.state.phase != RoundPhase::Running {
            return false;
        }
        self.cancel_timers();
        self.state.phase = RoundPhase::Stopped;
        self.state.view = View::Live;
        log::info!("round {} stopped", self.state.round);
        true
    }

    pub fn next_round(&mut self) -> Result<()> {
        self.start_round()
    }

    /// Start/stop button: stops a running round, starts one otherwise.
    pub fn toggle(&mut self) -> Result<()> {
        if self.state.phase == RoundPhase::Running {
            self.stop_round();
            Ok(())
        } else {
            self.start_round()
        }
    }

    /// Advance the clock to `now` and run every timer that came due.
    ///
    /// Timers registered while dispatching (a restart) wait for the next call.
    pub fn advance(&mut self, now: Duration) -> Vec<RoundEvent> {
        let mut events = Vec::new();
        let horizon = self.scheduler.horizon();
        while let Some(fired) = self.scheduler.pop_due_before(now, horizon) {
            if let Some(event) = self.on_timer(fired) {
                events.push(event);
            }
        }
        events
    }

    /// Dispatch one fired timer. Timers that are no longer registered are ignored.
    pub fn on_timer(&mut self, fired: Fired<RoundTimer>) -> Option<RoundEvent> {
        if self.state.phase != RoundPhase::Running {
            log::trace!("ignoring {:?} timer outside a running round", fired.event);
            return None;
        }
        match fired.event {
            RoundTimer::Tick if self.tick_timer == Some(fired.id) => {
                self.state.motion.tick();
                self.state.ticks += 1;
                None
            }
            RoundTimer::Capture if self.capture_timer == Some(fired.id) => {
                self.capture_timer = None;
                Some(self.capture())
            }
            _ => {
                log::trace!("ignoring stale {:?} timer {:?}", fired.event, fired.id);
                None
            }
        }
    }

    fn capture(&mut self) -> RoundEvent {
        if let Some(tick) = self.tick_timer.take() {
            self.scheduler.cancel(tick);
        }

        let rect = self.state.motion.current_rectangle();
        let still = self
            .state
            .current_frame
            .as_ref()
            .and_then(|frame| frame.crop(&rect));

        let Some(still) = still else {
            let round = self.state.round;
            log::debug!(
                "round {}: nothing to capture under {:?}, restarting",
                round,
                rect
            );
            if let Err(err) = self.start_round() {
                log::warn!("round {}: restart failed: {}", round, err);
                self.state.phase = RoundPhase::Stopped;
            }
            return RoundEvent::Restarted {
                round: self.state.round,
            };
        };

        self.state.captured = Some(still);
        self.state.view = View::Captured;
        self.state.phase = RoundPhase::Captured;
        log::info!(
            "round {} captured {}x{} at ({}, {}) after {} ticks",
            self.state.round,
            rect.width(),
            rect.height(),
            rect.x1,
            rect.y1,
            self.state.ticks
        );
        RoundEvent::Captured {
            round: self.state.round,
            rect,
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(tick) = self.tick_timer.take() {
            self.scheduler.cancel(tick);
        }
        if let Some(capture) = self.capture_timer.take() {
            self.scheduler.cancel(capture);
        }
    }
}
