use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::Builder;

use dodge_cam::config::{GameConfig, SpanU32};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DODGE_CONFIG",
        "DODGE_CAMERA_DEVICE",
        "DODGE_CAMERA_FPS",
        "DODGE_SPEED",
        "DODGE_CAPTURE_DIR",
        "DODGE_SEED",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = GameConfig::load().expect("load defaults");
    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!(cfg.motion.speed, 5.0);
    assert_eq!(cfg.round.tick_interval, Duration::from_millis(25));
    assert_eq!(cfg.overlay.color, "#ffff00");
    assert!(cfg.capture_dir.is_none());
    assert!(cfg.seed.is_none());
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    let json = r##"{
        "camera": { "device": "stub://lab", "target_fps": 15, "width": 320, "height": 240 },
        "motion": { "speed": 3.5, "long_side": [120, 200], "short_side": [60, 90] },
        "round": { "tick_ms": 40, "capture_delay_ms": [500, 900] },
        "overlay": { "color": "#00ff00", "thickness": 2 },
        "captures": { "dir": "snaps" },
        "seed": 11
    }"##;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("DODGE_CONFIG", file.path());
    std::env::set_var("DODGE_SPEED", "12");
    std::env::set_var("DODGE_SEED", "99");

    let cfg = GameConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://lab");
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!((cfg.camera.width, cfg.camera.height), (320, 240));
    assert_eq!(cfg.motion.speed, 12.0);
    assert_eq!(cfg.motion.long_side, SpanU32::new(120, 200));
    assert_eq!(cfg.motion.short_side, SpanU32::new(60, 90));
    assert_eq!(cfg.round.tick_interval, Duration::from_millis(40));
    assert_eq!(cfg.round.capture_delay_ms, (500, 900));
    assert_eq!(cfg.overlay.color, "#00ff00");
    assert_eq!(cfg.overlay.thickness, 2);
    assert_eq!(cfg.overlay.dash, 20);
    assert_eq!(cfg.capture_dir, Some(PathBuf::from("snaps")));
    assert_eq!(cfg.seed, Some(99));

    clear_env();
}

#[test]
fn loads_toml_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r##"
seed = 4

[camera]
device = "stub://desk"

[motion]
speed = 8.0
speed_range = [2.0, 10.0]

[overlay]
color = "#ff0000"
"##;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("DODGE_CONFIG", file.path());
    std::env::set_var("DODGE_CAPTURE_DIR", "/tmp/dodge-captures");

    let cfg = GameConfig::load().expect("load config");
    assert_eq!(cfg.camera.device, "stub://desk");
    assert_eq!(cfg.motion.speed, 8.0);
    assert_eq!((cfg.motion.speed_min, cfg.motion.speed_max), (2.0, 10.0));
    assert_eq!(cfg.overlay.color, "#ff0000");
    assert_eq!(cfg.seed, Some(4));
    assert_eq!(cfg.capture_dir, Some(PathBuf::from("/tmp/dodge-captures")));

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DODGE_SPEED", "fast");
    assert!(GameConfig::load().is_err());
    std::env::set_var("DODGE_SPEED", "40");
    assert!(GameConfig::load().is_err());
    std::env::remove_var("DODGE_SPEED");

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    std::io::Write::write_all(&mut file, br##"{ "overlay": { "color": "yellow" } }"##)
        .expect("write config");
    std::env::set_var("DODGE_CONFIG", file.path());
    assert!(GameConfig::load().is_err());

    std::env::set_var("DODGE_CONFIG", "/nonexistent/dodge.json");
    assert!(GameConfig::load().is_err());

    clear_env();
}
