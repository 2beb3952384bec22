//! Camera and geolocation providers.
//!
//! Each capability is a trait with a "real" implementation and a fake for
//! tests and demos, the same way air samples come from an
//! [AirSampler](crate::atmosphere::AirSampler).

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use image::{Rgb, RgbImage};

use crate::Error;

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Compass heading, degrees, when the device knows it.
    pub heading: Option<f64>,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Result<Self, Error> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::location(format!("position out of range: {lat}, {lon}")));
        }
        Ok(Position {
            lat,
            lon,
            heading: None,
        })
    }
}

pub trait Locator {
    fn locate(&mut self) -> Result<Position, Error>;
}

/// Always reports the position it was configured with, or an error if it
/// was given none.
pub struct FixedLocator {
    position: Option<Position>,
}

impl FixedLocator {
    pub fn new(position: Option<Position>) -> Self {
        FixedLocator { position }
    }
}

impl Locator for FixedLocator {
    fn locate(&mut self) -> Result<Position, Error> {
        self.position
            .ok_or_else(|| Error::location("no position configured"))
    }
}

/// Plays back a script of fixes; once exhausted, repeats the last.
pub struct FakeLocator {
    script: VecDeque<Result<Position, String>>,
}

impl FakeLocator {
    pub fn scripted(script: Vec<Result<Position, String>>) -> Self {
        FakeLocator {
            script: script.into(),
        }
    }
}

impl Locator for FakeLocator {
    fn locate(&mut self) -> Result<Position, Error> {
        let next = if self.script.len() > 1 {
            self.script.pop_front()
        } else {
            self.script.front().cloned()
        };
        match next {
            Some(Ok(p)) => Ok(p),
            Some(Err(e)) => Err(Error::location(e)),
            None => Err(Error::location("permission denied")),
        }
    }
}

/// Which way a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    /// Away from the user; what the views ask for.
    #[default]
    Rear,
    Front,
}

/// A source of camera frames.
pub trait FrameSource {
    /// The most recent frame.
    fn frame(&mut self) -> Result<RgbImage, Error>;

    /// Release the camera. Further frames fail.
    fn stop(&mut self);
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn frame(&mut self) -> Result<RgbImage, Error> {
        (**self).frame()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Stands in for a camera with a still image on disk.
pub struct ImageFileSource {
    path: PathBuf,
    facing: Facing,
    image: Option<RgbImage>,
    stopped: bool,
}

impl ImageFileSource {
    /// Open `path`, decoding it once.
    pub fn open(path: impl AsRef<Path>, facing: Facing) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let image = image::open(&path)
            .map_err(|e| Error::camera(format!("{}: {}", path.display(), e)))?
            .into_rgb8();
        tracing::info!(
            "camera: {} ({}x{}, {:?})",
            path.display(),
            image.width(),
            image.height(),
            facing
        );
        Ok(ImageFileSource {
            path,
            facing,
            image: Some(image),
            stopped: false,
        })
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }
}

impl FrameSource for ImageFileSource {
    fn frame(&mut self) -> Result<RgbImage, Error> {
        if self.stopped {
            return Err(Error::camera("camera stopped"));
        }
        self.image
            .clone()
            .ok_or_else(|| Error::camera(format!("{}: no frame", self.path.display())))
    }

    fn stop(&mut self) {
        if !self.stopped {
            tracing::info!("camera: stopping {}", self.path.display());
        }
        self.stopped = true;
        self.image = None;
    }
}

/// A deterministic sky-to-grass gradient.
pub struct FakeFrameSource {
    width: u32,
    height: u32,
    frames: usize,
    stopped: bool,
}

impl FakeFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        FakeFrameSource {
            width,
            height,
            frames: 0,
            stopped: false,
        }
    }

    /// Frames handed out so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl FrameSource for FakeFrameSource {
    fn frame(&mut self) -> Result<RgbImage, Error> {
        if self.stopped {
            return Err(Error::camera("camera stopped"));
        }
        self.frames += 1;
        let h = self.height.max(1) as f32;
        Ok(RgbImage::from_fn(self.width, self.height, |_, y| {
            let t = y as f32 / h;
            let lerp = |a: f32, b: f32| (a + (b - a) * t) as u8;
            Rgb([lerp(120.0, 60.0), lerp(170.0, 130.0), lerp(220.0, 70.0)])
        }))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
