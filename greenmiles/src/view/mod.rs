//! The two camera views and what they share.

use embedded_graphics::{
    geometry::{Point, Size},
    mono_font::{iso_8859_1::FONT_7X14, MonoTextStyle},
    pixelcolor::Rgb888,
    primitives::Rectangle,
    text::Text,
    Drawable,
};
use image::{imageops, Rgba, RgbImage, RgbaImage};

use crate::{
    drawing::{fill_panel, latin1, Blend, Gradient},
    export::Snapshot,
    refresh::AirUpdate,
};

pub mod air;
pub mod tree;

pub use air::AirView;
pub use tree::TreeView;

/// Something the user did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Quit,
    /// Pointer down / up, in view coordinates.
    Press(Point),
    Release(Point),
    /// Any other pointer activity.
    Motion,
    /// A press too short to be a long press.
    Tap(Point),
    Snapshot,
    /// The Measure / Cancel toggle.
    Measure,
    Calculate,
    Clear,
    /// Pick the field of view from the screen shape.
    AutoFov,
    /// The show / hide controls button.
    ToggleControls,
}

/// A full-screen view over the camera.
pub trait View {
    /// Size of the view, and of the frames it draws.
    fn size(&self) -> Size;

    /// A new air sample, or the failure to get one.
    fn update_air(&mut self, _update: AirUpdate) {}

    /// Show a message in place of the view's data.
    fn show_error(&mut self, message: String);

    fn handle(&mut self, input: Input);

    /// Draw a frame at animation time `t`, in seconds. `controls` is the
    /// opacity of on-screen text.
    fn draw(&mut self, camera: Option<&RgbImage>, t: f32, controls: f32) -> RgbaImage;

    fn snapshot(&self, camera: Option<&RgbImage>) -> Result<Snapshot, crate::Error>;
}

/// The camera frame stretched to `size`, or black without one.
pub(crate) fn backdrop(camera: Option<&RgbImage>, size: Size) -> RgbaImage {
    let (w, h) = (size.width, size.height);
    match camera {
        Some(frame) if frame.dimensions() == (w, h) => {
            image::DynamicImage::ImageRgb8(frame.clone()).into_rgba8()
        }
        Some(frame) => {
            let scaled = imageops::resize(frame, w, h, imageops::FilterType::Triangle);
            image::DynamicImage::ImageRgb8(scaled).into_rgba8()
        }
        None => RgbaImage::from_pixel(w, h, Rgba([0x11, 0x11, 0x11, 0xFF])),
    }
}

/// A pill of text across the top of the view.
pub(crate) fn status_bar(frame: &mut RgbaImage, text: &str, opacity: f32) {
    if opacity <= 0.0 {
        return;
    }
    let area = Rectangle::new(Point::new(16, 16), Size::new(frame.width().saturating_sub(32), 28));
    let gradient = Gradient {
        top: 16,
        bottom: 44,
        top_alpha: 0.25 * opacity,
        bottom_alpha: 0.25 * opacity,
    };
    fill_panel(frame, area, 14, Rgb888::new(0x30, 0x30, 0x30), gradient);
    Text::new(
        &latin1(text),
        Point::new(30, 35),
        MonoTextStyle::new(&FONT_7X14, Rgb888::new(0xDD, 0xDD, 0xDD)),
    )
    .draw(&mut Blend::new(frame, 0.75 * opacity))
    .expect("infallible");
}

/// An error message near the bottom of the view. Errors ignore the
/// controls' fade.
pub(crate) fn error_bar(frame: &mut RgbaImage, message: &str) {
    let (w, h) = (frame.width(), frame.height());
    let top = h as i32 - 60;
    let area = Rectangle::new(Point::new(16, top), Size::new(w.saturating_sub(32), 36));
    let gradient = Gradient {
        top,
        bottom: top + 36,
        top_alpha: 0.8,
        bottom_alpha: 0.8,
    };
    fill_panel(frame, area, 10, Rgb888::new(0x7A, 0x1E, 0x1E), gradient);
    Text::new(
        &latin1(message),
        Point::new(28, top + 23),
        MonoTextStyle::new(&FONT_7X14, Rgb888::new(0xFF, 0xE0, 0xE0)),
    )
    .draw(&mut Blend::opaque(frame))
    .expect("infallible");
}
