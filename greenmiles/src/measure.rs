//! The tap-two-edges measuring interaction.

use embedded_graphics::{
    geometry::{Point, Size},
    mono_font::{iso_8859_1::FONT_7X14, MonoTextStyle},
    pixelcolor::{Rgb888, RgbColor},
    prelude::Primitive,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
    text::{Alignment, Text},
    Drawable,
};
use image::RgbaImage;

use crate::{
    drawing::Blend,
    trunk::{self, EstimateResult, PixelPoint, TrunkParams},
    Error,
};

const MARKER: Rgb888 = Rgb888::new(0x00, 0xFF, 0x88);
const CROSSHAIR: i32 = 15;

/// Where the interaction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Measuring, with this many points placed.
    Measuring(usize),
    /// A result is on screen.
    Computed,
}

#[derive(Debug, Default, Clone)]
pub struct Measurement {
    active: bool,
    points: Vec<PixelPoint>,
    estimate: Option<EstimateResult>,
}

impl Measurement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.active {
            Phase::Measuring(self.points.len())
        } else if self.estimate.is_some() {
            Phase::Computed
        } else {
            Phase::Idle
        }
    }

    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn estimate(&self) -> Option<&EstimateResult> {
        self.estimate.as_ref()
    }

    /// The Measure / Cancel button. Either way, points and result are cleared.
    pub fn toggle(&mut self) {
        self.active = !self.active;
        self.points.clear();
        self.estimate = None;
    }

    /// A tap on the view. A third tap starts over from that tap.
    pub fn tap(&mut self, p: PixelPoint) {
        if !self.active {
            return;
        }
        if self.points.len() >= 2 {
            self.points.clear();
        }
        self.points.push(p);
    }

    /// The Clear button.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// The Calculate button: needs exactly two points while measuring.
    pub fn calculate(
        &mut self,
        params: &TrunkParams,
        display_width: f64,
    ) -> Result<&EstimateResult, Error> {
        if !self.active {
            return Err(Error::invalid("not measuring"));
        }
        let [p0, p1] = self.points[..] else {
            return Err(Error::invalid(format!(
                "need two points, have {}",
                self.points.len()
            )));
        };
        let result = trunk::estimate(p0, p1, display_width, params)?;
        tracing::info!("estimated DBH {:.1} cm", result.dbh_cm);
        self.active = false;
        Ok(self.estimate.insert(result))
    }

    /// Instruction for the current step, if measuring.
    pub fn prompt(&self) -> Option<&'static str> {
        match self.phase() {
            Phase::Measuring(0) => Some("Tap the LEFT edge of the trunk at chest height"),
            Phase::Measuring(1) => Some("Now tap the RIGHT edge of the trunk"),
            Phase::Measuring(_) => Some("Measurement complete! Press Calculate"),
            _ => None,
        }
    }

    /// Draw guide, markers and the measured chord onto `overlay`.
    pub fn draw(&self, overlay: &mut RgbaImage) {
        let (w, h) = (overlay.width(), overlay.height());
        if self.active {
            self.draw_guide(overlay, w, h);
        }
        let mut target = Blend::opaque(overlay);
        let stroke = PrimitiveStyle::with_stroke(MARKER, 3);
        for p in &self.points {
            let c = to_point(p);
            Circle::with_center(c, 12)
                .into_styled(PrimitiveStyle::with_fill(MARKER))
                .draw(&mut target)
                .expect("infallible");
            for (a, b) in [
                (c - Point::new(CROSSHAIR, 0), c + Point::new(CROSSHAIR, 0)),
                (c - Point::new(0, CROSSHAIR), c + Point::new(0, CROSSHAIR)),
            ] {
                Line::new(a, b)
                    .into_styled(stroke)
                    .draw(&mut target)
                    .expect("infallible");
            }
        }
        if let [p0, p1] = self.points[..] {
            draw_dashed(&mut target, to_point(&p0), to_point(&p1), stroke);
            let mid = to_point(&PixelPoint::new((p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0));
            let mut label = Blend::new(overlay, 0.7);
            label_box(&mut label, mid);
            Text::with_alignment(
                &format!("{:.0} px", p0.distance(&p1)),
                mid - Point::new(0, 5),
                MonoTextStyle::new(&FONT_7X14, MARKER),
                Alignment::Center,
            )
            .draw(&mut Blend::opaque(overlay))
            .expect("infallible");
        }
    }

    fn draw_guide(&self, overlay: &mut RgbaImage, w: u32, h: u32) {
        // Darken everything but the middle, where the trunk should be.
        let (x0, x1, y0, y1) = (w / 4, w / 4 + w / 2, h / 3, h / 3 + h / 3);
        for (x, y, px) in overlay.enumerate_pixels_mut() {
            if !(x0..x1).contains(&x) || !(y0..y1).contains(&y) {
                crate::drawing::blend(px, Rgb888::BLACK, 0.3);
            }
        }
        let band = Rectangle::new(Point::new(0, 40), Size::new(w, 60));
        band.into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
            .draw(&mut Blend::new(overlay, 0.65))
            .expect("infallible");
        if let Some(prompt) = self.prompt() {
            Text::with_alignment(
                prompt,
                Point::new(w as i32 / 2, 74),
                MonoTextStyle::new(&FONT_7X14, Rgb888::WHITE),
                Alignment::Center,
            )
            .draw(&mut Blend::opaque(overlay))
            .expect("infallible");
        }
    }
}

/// Far enough off any screen; keeps marker arithmetic clear of overflow.
const FAR: f64 = (1 << 20) as f64;

fn to_point(p: &PixelPoint) -> Point {
    let clamp = |v: f64| v.round().clamp(-FAR, FAR) as i32;
    Point::new(clamp(p.x), clamp(p.y))
}

fn label_box(target: &mut Blend<'_>, mid: Point) {
    Rectangle::new(mid - Point::new(40, 25), Size::new(80, 30))
        .into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
        .draw(target)
        .expect("infallible");
}

/// A 10-on, 5-off dashed line.
fn draw_dashed(target: &mut Blend<'_>, a: Point, b: Point, style: PrimitiveStyle<Rgb888>) {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let len = dx.hypot(dy);
    if len < 1.0 {
        return;
    }
    let at = |s: f64| {
        let s = s.min(len) / len;
        Point::new((ax + dx * s).round() as i32, (ay + dy * s).round() as i32)
    };
    let mut s = 0.0;
    while s < len {
        Line::new(at(s), at(s + 10.0))
            .into_styled(style)
            .draw(target)
            .expect("infallible");
        s += 15.0;
    }
}
