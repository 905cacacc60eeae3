use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
pub const DEFAULT_CAMERA_FPS: u32 = 30;
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;
pub const DEFAULT_TICK_MS: u64 = 25;
pub const DEFAULT_SPEED: f64 = 5.0;
pub const DEFAULT_SPEED_RANGE: (f64, f64) = (1.0, 15.0);
pub const DEFAULT_CAPTURE_DELAY_MS: (u64, u64) = (2000, 6000);
pub const DEFAULT_LONG_SIDE: (u32, u32) = (200, 400);
pub const DEFAULT_SHORT_SIDE: (u32, u32) = (80, 150);
pub const DEFAULT_ROI_SIZE: f64 = 150.0;
pub const DEFAULT_MIN_DIMENSION: u32 = 50;
pub const DEFAULT_SIZE_EASING: f64 = 0.05;
pub const DEFAULT_OVERLAY_COLOR: &str = "#ffff00";
pub const DEFAULT_OVERLAY_THICKNESS: u32 = 3;
pub const DEFAULT_DASH_LENGTH: u32 = 20;
pub const DEFAULT_GAP_LENGTH: u32 = 10;

#[derive(Debug, Deserialize, Default)]
struct GameConfigFile {
    camera: Option<CameraConfigFile>,
    motion: Option<MotionConfigFile>,
    round: Option<RoundConfigFile>,
    overlay: Option<OverlayConfigFile>,
    captures: Option<CapturesConfigFile>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct MotionConfigFile {
    speed: Option<f64>,
    speed_range: Option<[f64; 2]>,
    long_side: Option<[u32; 2]>,
    short_side: Option<[u32; 2]>,
    default_size: Option<f64>,
    min_dimension: Option<u32>,
    size_easing: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct RoundConfigFile {
    tick_ms: Option<u64>,
    capture_delay_ms: Option<[u64; 2]>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    color: Option<String>,
    thickness: Option<u32>,
    dash: Option<u32>,
    gap: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CapturesConfigFile {
    dir: Option<PathBuf>,
}

/// Inclusive integer range used for the random size and delay draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanU32 {
    pub min: u32,
    pub max: u32,
}

impl SpanU32 {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.min > self.max {
            return Err(anyhow!(
                "{} range is inverted ({} > {})",
                what,
                self.min,
                self.max
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub camera: CameraSettings,
    pub motion: MotionSettings,
    pub round: RoundSettings,
    pub overlay: OverlaySettings,
    pub capture_dir: Option<PathBuf>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct MotionSettings {
    pub speed: f64,
    pub speed_min: f64,
    pub speed_max: f64,
    /// Width range for wide targets, height range for tall ones.
    pub long_side: SpanU32,
    pub short_side: SpanU32,
    pub default_size: f64,
    pub min_dimension: u32,
    pub size_easing: f64,
}

#[derive(Debug, Clone)]
pub struct RoundSettings {
    pub tick_interval: Duration,
    pub capture_delay_ms: (u64, u64),
}

#[derive(Debug, Clone)]
pub struct OverlaySettings {
    pub color: String,
    pub thickness: u32,
    pub dash: u32,
    pub gap: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            motion: MotionSettings::default(),
            round: RoundSettings::default(),
            overlay: OverlaySettings::default(),
            capture_dir: None,
            seed: None,
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: DEFAULT_CAMERA_DEVICE.to_string(),
            target_fps: DEFAULT_CAMERA_FPS,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            speed_min: DEFAULT_SPEED_RANGE.0,
            speed_max: DEFAULT_SPEED_RANGE.1,
            long_side: SpanU32::new(DEFAULT_LONG_SIDE.0, DEFAULT_LONG_SIDE.1),
            short_side: SpanU32::new(DEFAULT_SHORT_SIDE.0, DEFAULT_SHORT_SIDE.1),
            default_size: DEFAULT_ROI_SIZE,
            min_dimension: DEFAULT_MIN_DIMENSION,
            size_easing: DEFAULT_SIZE_EASING,
        }
    }
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            capture_delay_ms: DEFAULT_CAPTURE_DELAY_MS,
        }
    }
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            color: DEFAULT_OVERLAY_COLOR.to_string(),
            thickness: DEFAULT_OVERLAY_THICKNESS,
            dash: DEFAULT_DASH_LENGTH,
            gap: DEFAULT_GAP_LENGTH,
        }
    }
}

impl GameConfig {
    /// Loads the file named by `DODGE_CONFIG` (if any), then applies env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DODGE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GameConfigFile) -> Self {
        let defaults = Self::default();

        let camera = file.camera.unwrap_or_default();
        let camera = CameraSettings {
            device: camera.device.unwrap_or(defaults.camera.device),
            target_fps: camera.target_fps.unwrap_or(defaults.camera.target_fps),
            width: camera.width.unwrap_or(defaults.camera.width),
            height: camera.height.unwrap_or(defaults.camera.height),
        };

        let motion = file.motion.unwrap_or_default();
        let speed_range = motion
            .speed_range
            .unwrap_or([defaults.motion.speed_min, defaults.motion.speed_max]);
        let motion = MotionSettings {
            speed: motion.speed.unwrap_or(defaults.motion.speed),
            speed_min: speed_range[0],
            speed_max: speed_range[1],
            long_side: motion
                .long_side
                .map(|[min, max]| SpanU32::new(min, max))
                .unwrap_or(defaults.motion.long_side),
            short_side: motion
                .short_side
                .map(|[min, max]| SpanU32::new(min, max))
                .unwrap_or(defaults.motion.short_side),
            default_size: motion.default_size.unwrap_or(defaults.motion.default_size),
            min_dimension: motion
                .min_dimension
                .unwrap_or(defaults.motion.min_dimension),
            size_easing: motion.size_easing.unwrap_or(defaults.motion.size_easing),
        };

        let round = file.round.unwrap_or_default();
        let round = RoundSettings {
            tick_interval: round
                .tick_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.round.tick_interval),
            capture_delay_ms: round
                .capture_delay_ms
                .map(|[min, max]| (min, max))
                .unwrap_or(defaults.round.capture_delay_ms),
        };

        let overlay = file.overlay.unwrap_or_default();
        let overlay = OverlaySettings {
            color: overlay.color.unwrap_or(defaults.overlay.color),
            thickness: overlay.thickness.unwrap_or(defaults.overlay.thickness),
            dash: overlay.dash.unwrap_or(defaults.overlay.dash),
            gap: overlay.gap.unwrap_or(defaults.overlay.gap),
        };

        Self {
            camera,
            motion,
            round,
            overlay,
            capture_dir: file.captures.and_then(|captures| captures.dir),
            seed: file.seed,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("DODGE_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(fps) = std::env::var("DODGE_CAMERA_FPS") {
            self.camera.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("DODGE_CAMERA_FPS must be an integer"))?;
        }
        if let Ok(speed) = std::env::var("DODGE_SPEED") {
            self.motion.speed = speed
                .parse()
                .map_err(|_| anyhow!("DODGE_SPEED must be a number"))?;
        }
        if let Ok(dir) = std::env::var("DODGE_CAPTURE_DIR") {
            if !dir.trim().is_empty() {
                self.capture_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(seed) = std::env::var("DODGE_SEED") {
            let seed: u64 = seed
                .parse()
                .map_err(|_| anyhow!("DODGE_SEED must be an unsigned integer"))?;
            self.seed = Some(seed);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("frame width and height must be greater than zero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be >= 1"));
        }
        if self.round.tick_interval.is_zero() {
            return Err(anyhow!("tick interval must be greater than zero"));
        }
        let (delay_min, delay_max) = self.round.capture_delay_ms;
        if Duration::from_millis(delay_min) < self.round.tick_interval {
            return Err(anyhow!(
                "capture delay minimum {} ms is shorter than the {} ms tick",
                delay_min,
                self.round.tick_interval.as_millis()
            ));
        }
        if delay_min > delay_max {
            return Err(anyhow!(
                "capture delay range is inverted ({} > {})",
                delay_min,
                delay_max
            ));
        }

        let motion = &self.motion;
        if !(motion.speed_min > 0.0
            && motion.speed_min <= motion.speed_max
            && motion.speed_max.is_finite())
        {
            return Err(anyhow!(
                "speed range must be positive and ordered (got {}..{})",
                motion.speed_min,
                motion.speed_max
            ));
        }
        if !(motion.speed_min..=motion.speed_max).contains(&motion.speed) {
            return Err(anyhow!(
                "speed {} is outside the configured range {}..{}",
                motion.speed,
                motion.speed_min,
                motion.speed_max
            ));
        }
        motion.long_side.check("long side")?;
        motion.short_side.check("short side")?;
        if motion.short_side.min == 0 {
            return Err(anyhow!("target sides must be greater than zero"));
        }
        if motion.min_dimension == 0 {
            return Err(anyhow!("min_dimension must be greater than zero"));
        }
        if !(motion.size_easing > 0.0 && motion.size_easing <= 1.0) {
            return Err(anyhow!("size_easing must be within (0, 1]"));
        }
        if !(motion.default_size > 0.0 && motion.default_size.is_finite()) {
            return Err(anyhow!("default ROI size must be greater than zero"));
        }

        if self.overlay.thickness == 0 || self.overlay.dash == 0 {
            return Err(anyhow!("overlay thickness and dash must be greater than zero"));
        }
        crate::render::OverlayColor::parse(&self.overlay.color)?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<GameConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
