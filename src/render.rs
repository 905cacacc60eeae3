//! Overlay rendering.
//!
//! Draws the zone as a dashed outline over the live frame and picks which
//! image a display should show for the current `GameState`.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

use crate::config::OverlaySettings;
use crate::frame::Rect;
use crate::round::{GameState, View};

/// Outline colour. Parsed from `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayColor(pub Rgb<u8>);

impl OverlayColor {
    pub const YELLOW: OverlayColor = OverlayColor(Rgb([255, 255, 0]));

    pub fn parse(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("overlay colour must look like #rrggbb, got '{}'", value));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| anyhow!("invalid overlay colour '{}': {}", value, e))
        };
        Ok(Self(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?])))
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.0 .0;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Whether dark text reads better on this colour (for a colour swatch).
    pub fn is_light(&self) -> bool {
        let [r, g, b] = self.0 .0;
        r as u32 + g as u32 + b as u32 >= 384
    }
}

impl Default for OverlayColor {
    fn default() -> Self {
        Self::YELLOW
    }
}

pub struct Renderer {
    color: OverlayColor,
    thickness: u32,
    dash: u32,
    gap: u32,
}

impl Renderer {
    pub fn new(settings: &OverlaySettings) -> Result<Self> {
        Ok(Self {
            color: OverlayColor::parse(&settings.color)?,
            thickness: settings.thickness.max(1),
            dash: settings.dash.max(1),
            gap: settings.gap,
        })
    }

    pub fn color(&self) -> OverlayColor {
        self.color
    }

    pub fn set_color(&mut self, color: OverlayColor) {
        self.color = color;
    }

    /// Draw the dashed outline of `rect` into `image`.
    ///
    /// Dashes start every `dash + gap` pixels from the top-left corner and
    /// only every other slot is inked, so the visible rhythm is a dash
    /// followed by a long gap. Strokes are centred on the edge and clipped.
    pub fn draw_zone(&self, image: &mut RgbImage, rect: Rect) {
        let period = (self.dash + self.gap) as usize;
        let (x1, y1, x2, y2) = (rect.x1, rect.y1, rect.x2, rect.y2);

        for x in (x1..x2).step_by(period) {
            if (x - x1) as usize / period % 2 == 0 {
                let end = (x + self.dash).min(x2);
                self.stroke(image, x, y1, end, y1);
                self.stroke(image, x, y2, end, y2);
            }
        }
        for y in (y1..y2).step_by(period) {
            if (y - y1) as usize / period % 2 == 0 {
                let end = (y + self.dash).min(y2);
                self.stroke(image, x1, y, x1, end);
                self.stroke(image, x2, y, x2, end);
            }
        }
    }

    /// The image a display should show right now, if there is one.
    ///
    /// Live view: the newest frame, with the zone drawn while a round runs.
    /// Captured view: the captured still, untouched.
    pub fn compose(&self, state: &GameState) -> Option<RgbImage> {
        match state.view() {
            View::Captured => state.captured().map(|still| still.image().clone()),
            View::Live => {
                let frame = state.current_frame()?;
                let mut image = frame.image().clone();
                if state.is_running() {
                    self.draw_zone(&mut image, state.current_rectangle());
                }
                Some(image)
            }
        }
    }

    /// Axis-aligned segment `(xa, ya)..=(xb, yb)` widened to `thickness`.
    fn stroke(&self, image: &mut RgbImage, xa: u32, ya: u32, xb: u32, yb: u32) {
        let half = (self.thickness / 2) as i64;
        let x0 = xa as i64 - half;
        let y0 = ya as i64 - half;
        let x1 = xb as i64 - half + self.thickness as i64 - 1;
        let y1 = yb as i64 - half + self.thickness as i64 - 1;
        fill(image, x0, y0, x1, y1, self.color.0);
    }
}

/// Fill the inclusive box `(x0, y0)..=(x1, y1)`, clipped to the image.
fn fill(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (w, h) = image.dimensions();
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(w as i64 - 1);
    let y1 = y1.min(h as i64 - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    for y in y0..=y1 {
        for x in x0..=x1 {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::frame::Frame;
    use crate::round::RoundController;
    use std::sync::Arc;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

    fn renderer() -> Renderer {
        Renderer::new(&OverlaySettings::default()).unwrap()
    }

    #[test]
    fn parses_hex_colours() -> Result<()> {
        assert_eq!(OverlayColor::parse("#ffff00")?, OverlayColor::YELLOW);
        assert_eq!(OverlayColor::parse("00ff7f")?.0, Rgb([0, 255, 127]));
        assert_eq!(OverlayColor::parse("#0A0B0C")?.to_hex(), "#0a0b0c");
        assert!(OverlayColor::parse("#fff").is_err());
        assert!(OverlayColor::parse("#gg0000").is_err());
        assert!(OverlayColor::YELLOW.is_light());
        assert!(!OverlayColor::parse("#202020")?.is_light());
        Ok(())
    }

    #[test]
    fn draws_dashed_outline() {
        let mut image = RgbImage::new(100, 100);
        renderer().draw_zone(&mut image, Rect::new(10, 10, 90, 90));

        // Top edge: dashes at 10..=30 and 70..=90, blank slot in between.
        assert_eq!(image.get_pixel(15, 10), &YELLOW);
        assert_eq!(image.get_pixel(15, 9), &YELLOW);
        assert_eq!(image.get_pixel(15, 11), &YELLOW);
        assert_eq!(image.get_pixel(15, 12), &BLACK);
        assert_eq!(image.get_pixel(50, 10), &BLACK);
        assert_eq!(image.get_pixel(75, 10), &YELLOW);
        // Bottom, left and right edges.
        assert_eq!(image.get_pixel(15, 90), &YELLOW);
        assert_eq!(image.get_pixel(10, 20), &YELLOW);
        assert_eq!(image.get_pixel(90, 20), &YELLOW);
        // Interior untouched.
        assert_eq!(image.get_pixel(50, 50), &BLACK);
    }

    #[test]
    fn outline_on_frame_edge_is_clipped() {
        let mut image = RgbImage::new(64, 48);
        renderer().draw_zone(&mut image, Rect::new(0, 0, 64, 48));
        assert_eq!(image.get_pixel(5, 0), &YELLOW);
        assert_eq!(image.get_pixel(5, 47), &YELLOW);
        assert_eq!(image.get_pixel(63, 5), &YELLOW);
    }

    #[test]
    fn colour_change_applies_to_next_draw() {
        let mut renderer = renderer();
        renderer.set_color(OverlayColor(Rgb([255, 0, 0])));
        let mut image = RgbImage::new(40, 40);
        renderer.draw_zone(&mut image, Rect::new(5, 5, 35, 35));
        assert_eq!(image.get_pixel(8, 5), &Rgb([255, 0, 0]));
    }

    #[test]
    fn compose_follows_view() -> Result<()> {
        let mut config = GameConfig::default();
        config.seed = Some(17);
        let mut controller = RoundController::new(&config);
        let renderer = renderer();
        assert!(renderer.compose(controller.state()).is_none());

        controller.on_frame(Arc::new(Frame::from_image(RgbImage::new(640, 480))));
        let idle = renderer.compose(controller.state()).unwrap();
        assert!(idle.pixels().all(|p| *p == BLACK));

        controller.start_round()?;
        let live = renderer.compose(controller.state()).unwrap();
        let rect = controller.state().current_rectangle();
        assert_eq!(live.get_pixel(rect.x1 + 2, rect.y1), &YELLOW);

        let delay = controller.state().capture_delay().unwrap();
        controller.advance(delay);
        let still = renderer.compose(controller.state()).unwrap();
        let rect = controller.state().current_rectangle();
        assert_eq!(still.dimensions(), (rect.width(), rect.height()));
        assert!(still.pixels().all(|p| *p == BLACK));
        Ok(())
    }
}
