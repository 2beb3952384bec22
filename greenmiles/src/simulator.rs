//! An SDL preview window standing in for the phone screen.

use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::Rgb888,
    Pixel,
};
use embedded_graphics_simulator::{
    sdl2::Keycode, OutputSettings, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};
use image::RgbaImage;

use crate::{view::Input, Error, Screen};

pub struct SimScreen {
    display: SimulatorDisplay<Rgb888>,
    window: Option<Window>,
    settings: OutputSettings,
    // Window::events panics before the first update.
    shown: bool,
}

impl SimScreen {
    pub fn new(size: Size, title: &str) -> Self {
        let mut screen = Self::new_hidden(size);
        screen.window = Some(Window::new(title, &screen.settings));
        screen
    }

    /// A screen with no window; frames can still be captured with
    /// [screenshot](Self::screenshot).
    pub fn new_hidden(size: Size) -> Self {
        SimScreen {
            display: SimulatorDisplay::new(size),
            window: None,
            settings: OutputSettingsBuilder::new().scale(1).build(),
            shown: false,
        }
    }

    pub fn screenshot(&self) -> embedded_graphics_simulator::OutputImage<Rgb888> {
        self.display.to_rgb_output_image(&self.settings)
    }
}

fn key_input(keycode: Keycode) -> Option<Input> {
    match keycode {
        Keycode::S => Some(Input::Snapshot),
        Keycode::M => Some(Input::Measure),
        Keycode::C => Some(Input::Calculate),
        Keycode::X => Some(Input::Clear),
        Keycode::A => Some(Input::AutoFov),
        Keycode::H => Some(Input::ToggleControls),
        Keycode::Q | Keycode::Escape => Some(Input::Quit),
        _ => None,
    }
}

impl Screen for SimScreen {
    fn size(&self) -> Size {
        self.display.size()
    }

    fn present(&mut self, frame: &RgbaImage) -> Result<(), Error> {
        let pixels = frame.enumerate_pixels().map(|(x, y, p)| {
            let [r, g, b, _] = p.0;
            Pixel(Point::new(x as i32, y as i32), Rgb888::new(r, g, b))
        });
        self.display.draw_iter(pixels).expect("infallible");
        if let Some(window) = &mut self.window {
            window.update(&self.display);
            self.shown = true;
        }
        Ok(())
    }

    fn poll(&mut self) -> Vec<Input> {
        let Some(window) = self.window.as_mut().filter(|_| self.shown) else {
            return Vec::new();
        };
        window
            .events()
            .filter_map(|event| match event {
                SimulatorEvent::Quit => Some(Input::Quit),
                SimulatorEvent::MouseButtonDown { point, .. } => Some(Input::Press(point)),
                SimulatorEvent::MouseButtonUp { point, .. } => Some(Input::Release(point)),
                SimulatorEvent::MouseMove { .. } => Some(Input::Motion),
                SimulatorEvent::KeyDown {
                    keycode,
                    repeat: false,
                    ..
                } => key_input(keycode),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_screen_keeps_frames() {
        let mut s = SimScreen::new_hidden(Size::new(4, 3));
        assert_eq!(s.size(), Size::new(4, 3));
        let frame = RgbaImage::from_pixel(4, 3, image::Rgba([9, 8, 7, 255]));
        s.present(&frame).expect("presents");
        assert!(s.poll().is_empty());
        assert_eq!(s.display.get_pixel(Point::new(3, 2)), Rgb888::new(9, 8, 7));
    }

    #[test]
    fn keys() {
        assert_eq!(key_input(Keycode::S), Some(Input::Snapshot));
        assert_eq!(key_input(Keycode::A), Some(Input::AutoFov));
        assert_eq!(key_input(Keycode::H), Some(Input::ToggleControls));
        assert_eq!(key_input(Keycode::Z), None);
    }
}
