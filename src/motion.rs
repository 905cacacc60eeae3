//! ROI motion: the moving capture zone.
//!
//! The zone glides toward a randomly drawn target at a constant per-tick step.
//! Reaching the target never stops it; the tick that arrives draws a fresh
//! target instead of moving, which is what makes the zone appear to dodge.
//! Size eases toward the target size independently of speed.

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::MotionSettings;
use crate::frame::Rect;

/// Continuous 2D quantity (position or size), in frame pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Vec2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Where the zone is now. `position` is the top-left corner; `size` is (w, h).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoiState {
    pub position: Vec2,
    pub size: Vec2,
}

/// Where the zone is heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoiTarget {
    pub position: Vec2,
    pub size: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Wide,
    Tall,
}

impl RoiTarget {
    pub fn orientation(&self) -> Orientation {
        if self.size.x >= self.size.y {
            Orientation::Wide
        } else {
            Orientation::Tall
        }
    }
}

/// What a tick did to the position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Moved,
    Retargeted,
}

pub struct MotionController {
    settings: MotionSettings,
    frame_width: u32,
    frame_height: u32,
    speed: f64,
    state: RoiState,
    target: RoiTarget,
    rect: Rect,
    rng: StdRng,
}

impl MotionController {
    pub fn new(settings: MotionSettings, frame_width: u32, frame_height: u32, rng: StdRng) -> Self {
        let speed = settings.speed;
        let center = Vec2::new(frame_width as f64 / 2.0, frame_height as f64 / 2.0);
        let size = Vec2::new(settings.default_size, settings.default_size);
        let mut motion = Self {
            settings,
            frame_width,
            frame_height,
            speed,
            state: RoiState {
                position: center,
                size,
            },
            target: RoiTarget {
                position: center,
                size,
            },
            rect: Rect::default(),
            rng,
        };
        motion.update_rect();
        motion
    }

    /// Re-centre the zone in a `frame_width x frame_height` frame at the default size.
    pub fn reset(&mut self, frame_width: u32, frame_height: u32) {
        self.frame_width = frame_width;
        self.frame_height = frame_height;
        let center = Vec2::new(frame_width as f64 / 2.0, frame_height as f64 / 2.0);
        let size = Vec2::new(self.settings.default_size, self.settings.default_size);
        self.state = RoiState {
            position: center,
            size,
        };
        self.target = RoiTarget {
            position: center,
            size,
        };
        self.update_rect();
    }

    /// Set the per-tick step. Values outside the configured range are clamped.
    /// Returns the speed actually applied.
    pub fn set_speed(&mut self, value: f64) -> f64 {
        let clamped = if value.is_nan() {
            self.settings.speed_min
        } else {
            value.clamp(self.settings.speed_min, self.settings.speed_max)
        };
        if clamped != value {
            log::warn!(
                "speed {} outside {}..{}, using {}",
                value,
                self.settings.speed_min,
                self.settings.speed_max,
                clamped
            );
        }
        self.speed = clamped;
        clamped
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn state(&self) -> RoiState {
        self.state
    }

    pub fn target(&self) -> RoiTarget {
        self.target
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Last computed clamped rectangle.
    pub fn current_rectangle(&self) -> Rect {
        self.rect
    }

    /// Draw a new random target for the current frame size.
    pub fn retarget(&mut self) -> RoiTarget {
        self.target = random_target(
            &mut self.rng,
            &self.settings,
            self.frame_width,
            self.frame_height,
        );
        self.target
    }

    pub fn tick(&mut self) -> TickOutcome {
        let dx = self.target.position.x - self.state.position.x;
        let dy = self.target.position.y - self.state.position.y;
        let dist = dx.hypot(dy);

        let outcome = if dist < self.speed {
            self.retarget();
            TickOutcome::Retargeted
        } else {
            self.state.position.x += dx / dist * self.speed;
            self.state.position.y += dy / dist * self.speed;
            TickOutcome::Moved
        };

        let easing = self.settings.size_easing;
        self.state.size.x += (self.target.size.x - self.state.size.x) * easing;
        self.state.size.y += (self.target.size.y - self.state.size.y) * easing;

        self.update_rect();
        outcome
    }

    fn update_rect(&mut self) {
        let RoiState { position, size } = self.state;
        self.rect = clamp_corners(
            position.x as i64,
            position.y as i64,
            (position.x + size.x) as i64,
            (position.y + size.y) as i64,
            self.frame_width,
            self.frame_height,
            self.settings.min_dimension,
        );
    }
}

/// Clamp raw corners into `[0, frame_width] x [0, frame_height]`.
///
/// A collapsed axis (`x2 <= x1`) gets its far corner pushed out by
/// `min_dimension`, re-clamped to the frame edge.
pub fn clamp_corners(
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
    frame_width: u32,
    frame_height: u32,
    min_dimension: u32,
) -> Rect {
    let w = frame_width as i64;
    let h = frame_height as i64;
    let x1 = x1.clamp(0, w);
    let y1 = y1.clamp(0, h);
    let mut x2 = x2.clamp(0, w);
    let mut y2 = y2.clamp(0, h);

    if x2 <= x1 {
        x2 = (x1 + min_dimension as i64).min(w);
    }
    if y2 <= y1 {
        y2 = (y1 + min_dimension as i64).min(h);
    }

    Rect::new(x1 as u32, y1 as u32, x2 as u32, y2 as u32)
}

/// Draw a target: orientation uniformly, then sides from the long/short ranges,
/// then a top-left corner that keeps the whole rectangle in frame where possible.
pub fn random_target<R: Rng>(
    rng: &mut R,
    settings: &MotionSettings,
    frame_width: u32,
    frame_height: u32,
) -> RoiTarget {
    let long = settings.long_side.min..=settings.long_side.max;
    let short = settings.short_side.min..=settings.short_side.max;
    let (width, height) = if rng.gen_bool(0.5) {
        (rng.gen_range(long), rng.gen_range(short))
    } else {
        (rng.gen_range(short), rng.gen_range(long))
    };

    let max_x = frame_width.saturating_sub(width);
    let max_y = frame_height.saturating_sub(height);
    let x = rng.gen_range(0..=max_x);
    let y = rng.gen_range(0..=max_y);

    RoiTarget {
        position: Vec2::new(x as f64, y as f64),
        size: Vec2::new(width as f64, height as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const EPS: f64 = 1e-9;

    fn controller(seed: u64) -> MotionController {
        MotionController::new(
            MotionSettings::default(),
            640,
            480,
            StdRng::seed_from_u64(seed),
        )
    }

    fn assert_target_shape(target: &RoiTarget, frame_width: u32, frame_height: u32) {
        let (w, h) = (target.size.x, target.size.y);
        let wide = (200.0..=400.0).contains(&w) && (80.0..=150.0).contains(&h);
        let tall = (80.0..=150.0).contains(&w) && (200.0..=400.0).contains(&h);
        assert!(wide || tall, "target size {}x{} fits neither orientation", w, h);
        assert_eq!(w.fract(), 0.0);
        assert_eq!(h.fract(), 0.0);
        assert!(target.position.x >= 0.0 && target.position.y >= 0.0);
        assert!(target.position.x <= (frame_width as f64 - w).max(0.0));
        assert!(target.position.y <= (frame_height as f64 - h).max(0.0));
    }

    fn assert_rect_in_frame(rect: Rect, frame_width: u32, frame_height: u32) {
        assert!(rect.x1 <= rect.x2 && rect.x2 <= frame_width, "{:?}", rect);
        assert!(rect.y1 <= rect.y2 && rect.y2 <= frame_height, "{:?}", rect);
    }

    #[test]
    fn reset_centres_zone() {
        let mut motion = controller(1);
        motion.retarget();
        for _ in 0..40 {
            motion.tick();
        }
        motion.reset(640, 480);
        assert_eq!(motion.state().position, Vec2::new(320.0, 240.0));
        assert_eq!(motion.state().size, Vec2::new(150.0, 150.0));
        assert_eq!(motion.target().position, Vec2::new(320.0, 240.0));
        assert_eq!(motion.current_rectangle(), Rect::new(320, 240, 470, 390));
    }

    #[test]
    fn rectangle_stays_in_frame_across_many_ticks() {
        for (seed, speed) in [(3u64, 1.0), (4, 5.0), (5, 15.0), (6, 7.5)] {
            let mut motion = controller(seed);
            motion.set_speed(speed);
            motion.retarget();
            for _ in 0..5_000 {
                motion.tick();
                assert_rect_in_frame(motion.current_rectangle(), 640, 480);
            }
        }
    }

    #[test]
    fn rectangle_stays_in_frame_when_targets_exceed_frame() {
        let mut motion = MotionController::new(
            MotionSettings::default(),
            120,
            90,
            StdRng::seed_from_u64(11),
        );
        motion.set_speed(15.0);
        motion.retarget();
        for _ in 0..2_000 {
            motion.tick();
            assert_rect_in_frame(motion.current_rectangle(), 120, 90);
        }
    }

    #[test]
    fn moves_exactly_speed_or_retargets() {
        let mut motion = controller(21);
        motion.set_speed(6.0);
        motion.retarget();
        let mut moved = 0;
        let mut retargeted = 0;
        for _ in 0..3_000 {
            let before = motion.state().position;
            let target = motion.target();
            let dist = before.distance_to(target.position);
            match motion.tick() {
                TickOutcome::Moved => {
                    moved += 1;
                    assert!(dist >= 6.0);
                    let step = before.distance_to(motion.state().position);
                    assert!((step - 6.0).abs() < 1e-6, "step was {}", step);
                    assert_eq!(motion.target(), target);
                }
                TickOutcome::Retargeted => {
                    retargeted += 1;
                    assert!(dist < 6.0);
                    assert_eq!(motion.state().position, before);
                    assert_target_shape(&motion.target(), 640, 480);
                }
            }
        }
        assert!(moved > 0 && retargeted > 0);
    }

    #[test]
    fn reaches_target_then_dodges() {
        let mut motion = controller(7);
        motion.set_speed(5.0);
        let first = RoiTarget {
            position: Vec2::new(500.0, 100.0),
            size: Vec2::new(100.0, 100.0),
        };
        motion.target = first;
        let start = motion.state().position;
        assert_eq!(start, Vec2::new(320.0, 240.0));
        let dist = start.distance_to(Vec2::new(500.0, 100.0));
        let budget = (dist / 5.0).ceil() as usize;

        let mut ticks = 0;
        while motion.target() == first {
            ticks += 1;
            assert!(ticks <= budget, "target not reached within {} ticks", budget);
            let before = motion.state().position;
            if motion.tick() == TickOutcome::Retargeted {
                assert!(before.distance_to(Vec2::new(500.0, 100.0)) < 5.0);
            }
        }
        assert_eq!(ticks, budget);
        assert_target_shape(&motion.target(), 640, 480);
    }

    #[test]
    fn size_eases_by_fixed_fraction() {
        let mut motion = controller(8);
        motion.target = RoiTarget {
            position: Vec2::new(0.0, 0.0),
            size: Vec2::new(350.0, 50.0),
        };
        motion.tick();
        let size = motion.state().size;
        assert!((size.x - 160.0).abs() < EPS);
        assert!((size.y - 145.0).abs() < EPS);
    }

    #[test]
    fn speed_change_applies_next_tick() {
        let mut motion = controller(9);
        motion.target = RoiTarget {
            position: Vec2::new(0.0, 240.0),
            size: Vec2::new(150.0, 150.0),
        };
        motion.tick();
        assert!((motion.state().position.x - 315.0).abs() < EPS);
        motion.set_speed(12.0);
        motion.tick();
        assert!((motion.state().position.x - 303.0).abs() < EPS);
    }

    #[test]
    fn speed_is_clamped_to_range() {
        let mut motion = controller(10);
        assert_eq!(motion.set_speed(1.0), 1.0);
        assert_eq!(motion.set_speed(15.0), 15.0);
        assert_eq!(motion.set_speed(40.0), 15.0);
        assert_eq!(motion.set_speed(0.0), 1.0);
        assert_eq!(motion.speed(), 1.0);
    }

    #[test]
    fn collapsed_rectangle_gets_min_dimension() {
        assert_eq!(
            clamp_corners(10, 10, 5, 5, 640, 480, 50),
            Rect::new(10, 10, 60, 60)
        );
    }

    #[test]
    fn collapsed_rectangle_at_edge_stays_in_frame() {
        assert_eq!(
            clamp_corners(630, 470, 600, 400, 640, 480, 50),
            Rect::new(630, 470, 640, 480)
        );
        assert_eq!(
            clamp_corners(700, 500, 900, 700, 640, 480, 50),
            Rect::new(640, 480, 640, 480)
        );
    }

    #[test]
    fn overhanging_rectangle_is_clipped() {
        assert_eq!(
            clamp_corners(-20, 400, 200, 600, 640, 480, 50),
            Rect::new(0, 400, 200, 480)
        );
    }

    #[test]
    fn random_targets_cover_both_orientations() {
        let mut rng = StdRng::seed_from_u64(99);
        let settings = MotionSettings::default();
        let mut wide = 0;
        let mut tall = 0;
        for _ in 0..500 {
            let target = random_target(&mut rng, &settings, 640, 480);
            assert_target_shape(&target, 640, 480);
            match target.orientation() {
                Orientation::Wide => wide += 1,
                Orientation::Tall => tall += 1,
            }
        }
        assert!(wide > 100 && tall > 100);
    }
}
