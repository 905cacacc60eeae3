use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use dodge_cam::{
    CameraConfig, CameraSource, CaptureLoop, FrameSlot, GameConfig, Renderer, RoundController,
    RoundEvent, RoundPhase, View,
};

fn stub_game(seed: u64) -> GameConfig {
    let mut cfg = GameConfig::default();
    cfg.camera.device = "stub://round-flow".to_string();
    cfg.camera.target_fps = 200;
    cfg.camera.width = 320;
    cfg.camera.height = 240;
    cfg.round.capture_delay_ms = (150, 250);
    cfg.seed = Some(seed);
    cfg
}

#[test]
fn stub_camera_round_ends_in_a_still() -> Result<()> {
    let cfg = stub_game(21);
    let renderer = Renderer::new(&cfg.overlay)?;
    let mut controller = RoundController::new(&cfg);

    let mut source = CameraSource::new(CameraConfig::from(&cfg.camera))?;
    source.connect()?;
    let slot = Arc::new(FrameSlot::new());
    let capture = CaptureLoop::spawn(source, slot.clone())?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while controller.state().current_frame().is_none() {
        if Instant::now() > deadline {
            return Err(anyhow!("no frame from stub camera"));
        }
        if let Some(frame) = slot.take()? {
            controller.on_frame(frame);
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    let clock = Instant::now();
    controller.start_round()?;
    assert_eq!(controller.state().phase(), RoundPhase::Running);

    let mut captured = None;
    while captured.is_none() {
        if Instant::now() > deadline {
            return Err(anyhow!("round never captured"));
        }
        if let Some(frame) = slot.take()? {
            controller.on_frame(frame);
        }
        for event in controller.advance(clock.elapsed()) {
            if let RoundEvent::Captured { round, rect } = event {
                captured = Some((round, rect));
            }
        }
        if controller.state().is_running() {
            let rect = controller.state().current_rectangle();
            assert!(rect.x2 <= 320 && rect.y2 <= 240, "zone left the frame: {:?}", rect);
            assert!(renderer.compose(controller.state()).is_some());
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    capture.stop()?;

    let (round, rect) = captured.expect("captured");
    let state = controller.state();
    assert_eq!(round, 1);
    assert_eq!(state.phase(), RoundPhase::Captured);
    assert_eq!(state.view(), View::Captured);
    assert!(state.ticks() > 0);

    let still = state.captured().expect("still");
    assert_eq!((still.width(), still.height()), (rect.width(), rect.height()));
    let frame = state.current_frame().expect("frame");
    assert_eq!(
        still.image().get_pixel(0, 0),
        frame.image().get_pixel(rect.x1, rect.y1)
    );

    // No timer outlives the capture.
    assert!(controller.advance(clock.elapsed() + Duration::from_secs(60)).is_empty());
    assert_eq!(controller.state().current_rectangle(), rect);

    let shown = renderer.compose(controller.state()).expect("captured view");
    assert_eq!(shown.dimensions(), (rect.width(), rect.height()));
    Ok(())
}

#[test]
fn missing_camera_blocks_rounds() {
    let mut cfg = stub_game(3);
    cfg.camera.device = "/dev/dodge-cam-missing".to_string();
    let mut controller = RoundController::new(&cfg);

    let opened = CameraSource::new(CameraConfig::from(&cfg.camera)).and_then(|mut source| {
        source.connect()?;
        Ok(source)
    });
    let err = match opened {
        Ok(_) => panic!("missing device must not open"),
        Err(err) => err,
    };
    controller.mark_source_unavailable(err.to_string());

    assert!(!controller.source_available());
    assert!(controller.start_round().is_err());
    assert_eq!(controller.state().phase(), RoundPhase::Idle);
    assert!(controller.advance(Duration::from_secs(10)).is_empty());
}

#[test]
fn seeded_games_replay_identically() -> Result<()> {
    let play = |seed: u64| -> Result<Vec<(u32, u32, u32, u32)>> {
        let cfg = stub_game(seed);
        let mut source = CameraSource::new(CameraConfig::from(&cfg.camera))?;
        source.connect()?;
        let mut controller = RoundController::new(&cfg);
        controller.on_frame(Arc::new(source.next_frame()?));
        controller.start_round()?;
        let mut zones = Vec::new();
        for step in 1..=40u64 {
            controller.advance(Duration::from_millis(step * 25));
            let rect = controller.state().current_rectangle();
            zones.push((rect.x1, rect.y1, rect.x2, rect.y2));
        }
        Ok(zones)
    };
    assert_eq!(play(5)?, play(5)?);
    Ok(())
}
