//! Green Miles: air quality and tree impact, over a camera view.
//!
//! Two views share the frame loop in [run]:
//! - the air view animates a particle field tinted and sized by the latest
//!   PM2.5 / CO2 readings, drifting with the wind;
//! - the tree view turns two taps on a trunk into a diameter, and that into
//!   the tree's CO2 uptake and O2 output.
//!
//! # Features
//! - `proxy`: fetch air samples from the `/env` proxy (see the `envproxy` crate)
//! - `simulator`: an SDL preview window; requires SDL2
//! - `video`: render field clips offline; requires ffmpeg at runtime
//! - `web`: wasm-bindgen exports for the browser
use std::time::Instant;

use embedded_graphics::geometry::Size;
use image::RgbaImage;

pub mod atmosphere;
pub mod context;
pub mod device;
pub mod drawing;
pub mod error;
pub mod export;
pub mod field;
pub mod measure;
pub mod quality;
pub mod refresh;
pub mod settings;
pub mod trunk;
pub mod ui;
pub mod view;
pub mod wind;

#[cfg(feature = "simulator")]
pub mod simulator;

#[cfg(feature = "web")]
pub mod web;

use context::Context;
use device::FrameSource;
use refresh::{AirUpdate, Latest};
use settings::Settings;
use ui::Visibility;
use view::{Input, View};

pub use error::Error;

/// Somewhere to show frames and get input from.
pub trait Screen {
    fn size(&self) -> Size;

    /// Show a finished frame.
    fn present(&mut self, frame: &RgbaImage) -> Result<(), Error>;

    /// Input since the last poll, oldest first.
    fn poll(&mut self) -> Vec<Input>;
}

/// A screen that shows nothing: keeps the last frame, and plays back a
/// script of inputs, one batch per frame.
#[derive(Default)]
pub struct HeadlessScreen {
    size: Size,
    script: Vec<Vec<Input>>,
    last: Option<RgbaImage>,
    presented: usize,
}

impl HeadlessScreen {
    pub fn new(size: Size) -> Self {
        HeadlessScreen {
            size,
            ..Default::default()
        }
    }

    /// Inputs to deliver, one batch per poll. Once the script runs out the
    /// screen asks to quit.
    pub fn scripted(size: Size, script: Vec<Vec<Input>>) -> Self {
        let mut script = script;
        script.reverse();
        HeadlessScreen {
            size,
            script,
            ..Default::default()
        }
    }

    pub fn last_frame(&self) -> Option<&RgbaImage> {
        self.last.as_ref()
    }

    pub fn presented(&self) -> usize {
        self.presented
    }
}

impl Screen for HeadlessScreen {
    fn size(&self) -> Size {
        self.size
    }

    fn present(&mut self, frame: &RgbaImage) -> Result<(), Error> {
        self.presented += 1;
        self.last = Some(frame.clone());
        Ok(())
    }

    fn poll(&mut self) -> Vec<Input> {
        self.script.pop().unwrap_or_else(|| vec![Input::Quit])
    }
}

/// Frame loop.
///
/// Runs until `ctx` is cancelled or the screen asks to quit; takes the newest
/// air update (if any) each frame; stops the camera on the way out.
pub fn run(
    ctx: &Context,
    settings: &Settings,
    screen: &mut impl Screen,
    camera: &mut impl FrameSource,
    view: &mut impl View,
    updates: Option<&Latest<AirUpdate>>,
) {
    let start = Instant::now();
    let period = settings.frame_period();
    let mut visibility = Visibility::new(start);
    let mut camera_ok = true;
    tracing::info!(
        "frame loop: {}x{} at {:?} per frame",
        screen.size().width,
        screen.size().height,
        period
    );

    while !ctx.is_cancelled() {
        let now = Instant::now();
        if let Some(update) = updates.and_then(Latest::take) {
            view.update_air(update);
        }

        let frame = match camera.frame() {
            Ok(f) => {
                camera_ok = true;
                Some(f)
            }
            Err(e) => {
                if camera_ok {
                    view.show_error(e.to_string());
                }
                camera_ok = false;
                None
            }
        };

        for input in screen.poll() {
            match input {
                Input::Quit => ctx.cancel(),
                Input::Press(_) => visibility.press(now),
                Input::Release(p) => {
                    if !visibility.release(now) {
                        view.handle(Input::Tap(p));
                    }
                }
                Input::Motion => visibility.activity(now),
                Input::ToggleControls => {
                    visibility.activity(now);
                    visibility.toggle();
                }
                Input::Snapshot => {
                    visibility.activity(now);
                    save_snapshot(settings, &*view, frame.as_ref());
                }
                other => {
                    visibility.activity(now);
                    view.handle(other);
                }
            }
        }
        if ctx.is_cancelled() {
            break;
        }

        let t = start.elapsed().as_secs_f32();
        let out = view.draw(frame.as_ref(), t, visibility.opacity(now));
        if let Err(e) = screen.present(&out) {
            tracing::error!("could not present frame: {}", e);
            ctx.cancel();
            break;
        }
        ctx.wait_until(now + period);
    }
    camera.stop();
    tracing::info!("frame loop done after {:.1}s", start.elapsed().as_secs_f32());
}

fn save_snapshot(
    settings: &Settings,
    view: &impl View,
    frame: Option<&image::RgbImage>,
) {
    match view
        .snapshot(frame)
        .and_then(|snap| snap.save(&settings.export_dir))
    {
        Ok(path) => tracing::info!("snapshot: {}", path.display()),
        Err(e) => tracing::warn!("snapshot failed: {}", e),
    }
}
