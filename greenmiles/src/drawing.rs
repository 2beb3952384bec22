//! Utilities for drawing onto RGBA frames.
//!
//! Everything here blends source-over: overlays start fully transparent and
//! are composited onto camera frames later. Coverage is sampled at pixel
//! centers; no anti-aliasing.

use std::convert::Infallible;

use embedded_graphics::primitives::Rectangle;
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::{Rgb888, RgbColor},
    Pixel,
};
use image::{Rgba, RgbaImage};

/// Blend `color` at `alpha` over a pixel.
pub fn blend(px: &mut Rgba<u8>, color: Rgb888, alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let [dr, dg, db, da] = px.0;
    let da = da as f32 / 255.0;
    let out_a = a + da * (1.0 - a);
    let mix = |s: u8, d: u8| {
        ((s as f32 * a + d as f32 * da * (1.0 - a)) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    px.0 = [
        mix(color.r(), dr),
        mix(color.g(), dg),
        mix(color.b(), db),
        (out_a * 255.0).round() as u8,
    ];
}

/// Make every pixel transparent black.
pub fn clear(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        *px = Rgba([0, 0, 0, 0]);
    }
}

/// Text as the mono fonts can draw it: anything past Latin-1 becomes `-`.
pub fn latin1(s: &str) -> String {
    s.chars()
        .map(|c| if (c as u32) < 0x100 { c } else { '-' })
        .collect()
}

/// Pixel-index range covering `[center - extent, center + extent]`,
/// cut to `0..limit`.
fn span(center: f32, extent: f32, limit: u32) -> std::ops::Range<u32> {
    let lo = (center - extent).floor().max(0.0) as u32;
    let hi = ((center + extent).ceil().max(0.0) as u32).min(limit);
    lo..hi.max(lo)
}

/// Fill a disc.
pub fn fill_circle(image: &mut RgbaImage, cx: f32, cy: f32, r: f32, color: Rgb888, alpha: f32) {
    if r <= 0.0 {
        return;
    }
    let r2 = r * r;
    for y in span(cy, r, image.height()) {
        let dy = y as f32 + 0.5 - cy;
        for x in span(cx, r, image.width()) {
            let dx = x as f32 + 0.5 - cx;
            if dx * dx + dy * dy <= r2 {
                blend(image.get_pixel_mut(x, y), color, alpha);
            }
        }
    }
}

/// Fill an ellipse with semi-axes `rx`, `ry`, its `rx` axis turned by
/// `angle` radians.
#[allow(clippy::too_many_arguments)]
pub fn fill_ellipse(
    image: &mut RgbaImage,
    cx: f32,
    cy: f32,
    rx: f32,
    ry: f32,
    angle: f32,
    color: Rgb888,
    alpha: f32,
) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let (sin, cos) = angle.sin_cos();
    let reach = rx.max(ry);
    for y in span(cy, reach, image.height()) {
        let dy = y as f32 + 0.5 - cy;
        for x in span(cx, reach, image.width()) {
            let dx = x as f32 + 0.5 - cx;
            // Rotate the sample back into the ellipse's own frame.
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;
            if (u / rx).powi(2) + (v / ry).powi(2) <= 1.0 {
                blend(image.get_pixel_mut(x, y), color, alpha);
            }
        }
    }
}

/// A vertical alpha ramp between two rows.
#[derive(Debug, Clone, Copy)]
pub struct Gradient {
    pub top: i32,
    pub bottom: i32,
    pub top_alpha: f32,
    pub bottom_alpha: f32,
}

impl Gradient {
    pub fn alpha_at(&self, y: f32) -> f32 {
        let span = (self.bottom - self.top) as f32;
        if span <= 0.0 {
            return self.top_alpha;
        }
        let t = ((y - self.top as f32) / span).clamp(0.0, 1.0);
        self.top_alpha + (self.bottom_alpha - self.top_alpha) * t
    }
}

/// Fill a rounded rectangle with a vertical alpha gradient.
pub fn fill_panel(
    image: &mut RgbaImage,
    area: Rectangle,
    radius: u32,
    color: Rgb888,
    gradient: Gradient,
) {
    let left = area.top_left.x as f32;
    let top = area.top_left.y as f32;
    let right = left + area.size.width as f32;
    let bottom = top + area.size.height as f32;
    let r = (radius as f32)
        .min(area.size.width as f32 / 2.0)
        .min(area.size.height as f32 / 2.0);
    let (w, h) = (image.width(), image.height());
    for y in span((top + bottom) / 2.0, (bottom - top) / 2.0, h) {
        let py = y as f32 + 0.5;
        if py < top || py > bottom {
            continue;
        }
        let alpha = gradient.alpha_at(py);
        for x in span((left + right) / 2.0, (right - left) / 2.0, w) {
            let px = x as f32 + 0.5;
            if px < left || px > right {
                continue;
            }
            // Distance to the inner rectangle decides the corners.
            let qx = px.clamp(left + r, right - r);
            let qy = py.clamp(top + r, bottom - r);
            if (px - qx).powi(2) + (py - qy).powi(2) <= r * r {
                blend(image.get_pixel_mut(x, y), color, alpha);
            }
        }
    }
}

/// An embedded-graphics target that blends into an RGBA frame at a fixed
/// opacity.
pub struct Blend<'a> {
    image: &'a mut RgbaImage,
    alpha: f32,
}

impl<'a> Blend<'a> {
    pub fn new(image: &'a mut RgbaImage, alpha: f32) -> Self {
        Blend { image, alpha }
    }

    pub fn opaque(image: &'a mut RgbaImage) -> Self {
        Self::new(image, 1.0)
    }
}

impl OriginDimensions for Blend<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for Blend<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        for Pixel(Point { x, y }, color) in pixels {
            if (0..w).contains(&x) && (0..h).contains(&y) {
                blend(self.image.get_pixel_mut(x as u32, y as u32), color, self.alpha);
            }
        }
        Ok(())
    }
}
