//! dodge - headless driver for the webcam dodge game
//!
//! This binary:
//! 1. Opens the configured camera and runs it on a capture thread
//! 2. Plays rounds: the zone drifts, and after a random delay it is snapped
//! 3. Optionally saves each captured still as PNG
//! 4. Optionally keeps a preview PNG of the live view (frame + zone) up to date
//! 5. Stops the running round cleanly on Ctrl-C

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dodge_cam::ui::{RoundCountdown, Ui};
use dodge_cam::{
    CameraConfig, CameraSource, CaptureLoop, CaptureWriter, FrameSlot, GameConfig,
    Renderer, RoundController, RoundEvent, RoundPhase,
};

const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(5);
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);
const PREVIEW_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Rounds to play before exiting (0 = until Ctrl-C).
    #[arg(long, default_value_t = 3)]
    rounds: u64,
    /// Zone speed in pixels per tick (clamped to the configured range).
    #[arg(long)]
    speed: Option<f64>,
    /// Zone outline colour, #rrggbb.
    #[arg(long)]
    color: Option<String>,
    /// Camera device path, or stub://name for a synthetic camera.
    #[arg(long)]
    device: Option<String>,
    /// Deterministic seed for zone targets and capture delays.
    #[arg(long)]
    seed: Option<u64>,
    /// Directory for captured stills (created if missing).
    #[arg(long)]
    save_captures: Option<PathBuf>,
    /// PNG path refreshed with the live view about once per second.
    #[arg(long)]
    preview: Option<PathBuf>,
    /// Pause between a capture and the next round, in milliseconds.
    #[arg(long, default_value_t = 1500)]
    pause_ms: u64,
    /// Terminal output: auto, plain or pretty.
    #[arg(long)]
    ui: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = GameConfig::load()?;
    if let Some(device) = &args.device {
        cfg.camera.device = device.clone();
    }
    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }
    if let Some(dir) = &args.save_captures {
        cfg.capture_dir = Some(dir.clone());
    }
    if let Some(color) = &args.color {
        cfg.overlay.color = color.clone();
    }
    cfg.validate()?;

    let ui = Ui::from_args(args.ui.as_deref(), std::io::stderr().is_terminal());
    let renderer = Renderer::new(&cfg.overlay)?;
    let mut controller = RoundController::new(&cfg);
    if let Some(speed) = args.speed {
        controller.set_speed(speed);
    }
    let mut writer = match &cfg.capture_dir {
        Some(dir) => Some(CaptureWriter::new(dir)?),
        None => None,
    };

    let mut source = CameraSource::new(CameraConfig::from(&cfg.camera))?;
    if let Err(err) = source.connect() {
        controller.mark_source_unavailable(err.to_string());
        return Err(err.context(format!("camera {} unavailable", cfg.camera.device)));
    }
    let slot = Arc::new(FrameSlot::new());
    let capture = CaptureLoop::spawn(source, slot.clone())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    log::info!(
        "dodge running: {} at {}x{}, overlay {}, {} rounds",
        cfg.camera.device,
        cfg.camera.width,
        cfg.camera.height,
        renderer.color().to_hex(),
        if args.rounds == 0 {
            "unlimited".to_string()
        } else {
            args.rounds.to_string()
        }
    );

    let first_frame_deadline = Instant::now() + FIRST_FRAME_TIMEOUT;
    loop {
        if let Some(frame) = slot.take()? {
            controller.on_frame(frame);
            break;
        }
        if shutdown.load(Ordering::SeqCst) {
            capture.stop()?;
            return Ok(());
        }
        if Instant::now() >= first_frame_deadline {
            controller.mark_source_unavailable("no frames received");
            capture.stop()?;
            return Err(anyhow!(
                "camera {} delivered no frames within {:?}",
                cfg.camera.device,
                FIRST_FRAME_TIMEOUT
            ));
        }
        std::thread::sleep(MAX_IDLE_SLEEP);
    }

    let clock = Instant::now();
    let pause = Duration::from_millis(args.pause_ms);
    let mut completed = 0u64;
    let mut next_round_at: Option<Duration> = None;
    let mut last_health_log = Instant::now();
    let mut last_preview = Instant::now();
    let mut capture_lost = false;

    controller.start_round()?;
    let mut round_started = Duration::ZERO;
    let mut countdown = Some(start_countdown(&ui, &controller));

    'game: loop {
        if shutdown.load(Ordering::SeqCst) {
            log::info!("shutdown signal received");
            controller.stop_round();
            break;
        }

        if !capture.is_running() {
            log::error!("frame capture thread exited, stopping the game");
            controller.mark_source_unavailable("capture thread exited");
            capture_lost = true;
            break;
        }

        if let Some(frame) = slot.take()? {
            controller.on_frame(frame);
        }

        let now = clock.elapsed();
        for event in controller.advance(now) {
            match event {
                RoundEvent::Captured { round, rect } => {
                    if let Some(countdown) = countdown.take() {
                        countdown.finish(&format!(
                            "captured {}x{} at ({}, {})",
                            rect.width(),
                            rect.height(),
                            rect.x1,
                            rect.y1
                        ));
                    }
                    if let (Some(writer), Some(still)) =
                        (writer.as_mut(), controller.state().captured())
                    {
                        if let Err(err) = writer.write(still, round) {
                            log::error!("failed to save capture: {}", err);
                        }
                    }
                    completed += 1;
                    if args.rounds > 0 && completed >= args.rounds {
                        break 'game;
                    }
                    next_round_at = Some(now + pause);
                }
                RoundEvent::Restarted { round } => {
                    if let Some(countdown) = countdown.take() {
                        countdown.finish("nothing under the zone, restarting");
                    }
                    log::debug!("round {} restarted after an empty capture", round);
                    round_started = now;
                    countdown = Some(start_countdown(&ui, &controller));
                }
            }
        }

        if controller.state().phase() == RoundPhase::Captured
            && next_round_at.is_some_and(|at| now >= at)
        {
            next_round_at = None;
            controller.next_round()?;
            round_started = now;
            countdown = Some(start_countdown(&ui, &controller));
        }

        if let Some(countdown) = &countdown {
            countdown.update(now.saturating_sub(round_started));
        }

        if let Some(path) = &args.preview {
            if last_preview.elapsed() >= PREVIEW_INTERVAL {
                if let Some(image) = renderer.compose(controller.state()) {
                    if let Err(err) = image.save(path) {
                        log::warn!("failed to write preview {}: {}", path.display(), err);
                    }
                }
                last_preview = Instant::now();
            }
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = slot.stats()?;
            log::info!(
                "camera health={} frames={} dropped={} status=\"{}\"",
                capture.is_healthy(),
                stats.published,
                stats.dropped,
                controller
                    .state()
                    .phase()
                    .status_line(controller.state().motion().speed())
            );
            last_health_log = Instant::now();
        }

        let sleep = controller
            .next_due_in()
            .unwrap_or(MAX_IDLE_SLEEP)
            .min(MAX_IDLE_SLEEP);
        std::thread::sleep(sleep);
    }

    capture.stop()?;
    log::info!(
        "played {} round(s){}",
        completed,
        writer
            .as_ref()
            .map(|w| format!(", {} capture(s) in {}", w.written(), w.dir().display()))
            .unwrap_or_default()
    );
    if capture_lost {
        return Err(anyhow!("camera {} stopped delivering frames", cfg.camera.device));
    }
    Ok(())
}

fn start_countdown(ui: &Ui, controller: &RoundController) -> RoundCountdown {
    let state = controller.state();
    ui.round_countdown(state.round(), state.capture_delay().unwrap_or_default())
}
