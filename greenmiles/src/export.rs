//! Still-image export: camera frame, overlay and a report panel, as JPEG.

use std::path::{Path, PathBuf};

use embedded_graphics::{
    geometry::{Point, Size},
    mono_font::{
        iso_8859_1::{FONT_7X14, FONT_9X18_BOLD},
        MonoTextStyle,
    },
    pixelcolor::{Rgb888, RgbColor},
    prelude::Primitive,
    primitives::{PrimitiveStyle, Rectangle, RoundedRectangle},
    text::Text,
    Drawable,
};
use image::{codecs::jpeg::JpegEncoder, imageops, DynamicImage, RgbImage, RgbaImage};

use crate::{
    atmosphere::AirSample,
    drawing::{fill_panel, latin1, Blend, Gradient},
    quality::PLACEHOLDER,
    trunk::EstimateResult,
    Error,
};

/// Frame size used when there is no camera frame to export.
pub const DEFAULT_FRAME: (u32, u32) = (1280, 720);
pub const JPEG_QUALITY: u8 = 92;

const PANEL_ORIGIN: Point = Point::new(16, 16);
const PANEL_WIDTH: u32 = 380;
const PANEL_RADIUS: u32 = 12;
const TEXT_X: i32 = 32;

const GREEN: Rgb888 = Rgb888::new(0x00, 0xFF, 0x88);
const BLUE: Rgb888 = Rgb888::new(0x88, 0xDD, 0xFF);
const GOLD: Rgb888 = Rgb888::new(0xFF, 0xD7, 0x00);
const GRAY: Rgb888 = Rgb888::new(0xAA, 0xAA, 0xAA);

/// One line of panel text, positioned by its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelLine {
    pub baseline: i32,
    pub text: String,
    pub color: Rgb888,
}

impl PanelLine {
    fn new(baseline: i32, text: impl Into<String>, color: Rgb888) -> Self {
        PanelLine {
            baseline,
            text: text.into(),
            color,
        }
    }
}

/// The translucent report box in the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub height: u32,
    pub title: &'static str,
    pub lines: Vec<PanelLine>,
}

impl Panel {
    /// The air report. The wind line is only present when both wind values
    /// are.
    pub fn air(sample: Option<&AirSample>, coords: Option<(f64, f64)>) -> Self {
        let sample = sample.copied().unwrap_or_default();
        let pm = match sample.pm25 {
            Some(v) => format!("PM2.5: {v:.1} µg/m³"),
            None => format!("PM2.5: {PLACEHOLDER} µg/m³"),
        };
        let co2 = match sample.co2_ppm {
            Some(v) => format!("CO2: {} ppm", v.round()),
            None => format!("CO2: {PLACEHOLDER} ppm"),
        };
        let mut lines = vec![PanelLine::new(78, pm, GREEN), PanelLine::new(103, co2, BLUE)];
        if let (Some(speed), Some(deg)) = (sample.wind_speed, sample.wind_deg) {
            lines.push(PanelLine::new(
                128,
                format!("Wind: {speed:.1} m/s @ {}°", deg.round()),
                GOLD,
            ));
        }
        let location = match coords {
            Some((lat, lon)) => format!("Location: {lat:.4}, {lon:.4}"),
            None => format!("Location: {PLACEHOLDER}"),
        };
        lines.push(PanelLine::new(153, location, GRAY));
        Panel {
            height: 160,
            title: "Air Quality Report",
            lines,
        }
    }

    /// The tree report.
    pub fn tree(result: &EstimateResult) -> Self {
        let colors = [GREEN, BLUE, BLUE, GOLD, GOLD];
        let lines = result
            .lines()
            .into_iter()
            .zip(colors)
            .enumerate()
            .map(|(i, (text, color))| PanelLine::new(78 + 25 * i as i32, text, color))
            .collect();
        Panel {
            height: 180,
            title: "Tree Environmental Impact",
            lines,
        }
    }

    fn draw(&self, image: &mut RgbaImage) {
        let area = Rectangle::new(PANEL_ORIGIN, Size::new(PANEL_WIDTH, self.height));
        let gradient = Gradient {
            top: PANEL_ORIGIN.y,
            bottom: PANEL_ORIGIN.y + self.height as i32 + 4,
            top_alpha: 0.85,
            bottom_alpha: 0.65,
        };
        fill_panel(image, area, PANEL_RADIUS, Rgb888::BLACK, gradient);
        RoundedRectangle::with_equal_corners(area, Size::new(PANEL_RADIUS, PANEL_RADIUS))
            .into_styled(PrimitiveStyle::with_stroke(GREEN, 1))
            .draw(&mut Blend::new(image, 0.5))
            .expect("infallible");

        let mut target = Blend::opaque(image);
        Text::new(
            &latin1(self.title),
            Point::new(TEXT_X, 48),
            MonoTextStyle::new(&FONT_9X18_BOLD, Rgb888::WHITE),
        )
        .draw(&mut target)
        .expect("infallible");
        for line in &self.lines {
            Text::new(
                &latin1(&line.text),
                Point::new(TEXT_X, line.baseline),
                MonoTextStyle::new(&FONT_7X14, line.color),
            )
            .draw(&mut target)
            .expect("infallible");
        }
    }
}

/// Camera frame, then `overlay` stretched over it, then `panel`.
pub fn compose(frame: Option<&RgbImage>, overlay: &RgbaImage, panel: &Panel) -> RgbImage {
    let mut base = match frame {
        Some(f) => DynamicImage::ImageRgb8(f.clone()).into_rgba8(),
        None => RgbaImage::from_pixel(
            DEFAULT_FRAME.0,
            DEFAULT_FRAME.1,
            image::Rgba([0, 0, 0, 255]),
        ),
    };
    let (w, h) = base.dimensions();
    if overlay.dimensions() == (w, h) {
        imageops::overlay(&mut base, overlay, 0, 0);
    } else if overlay.width() > 0 && overlay.height() > 0 {
        let scaled = imageops::resize(overlay, w, h, imageops::FilterType::Triangle);
        imageops::overlay(&mut base, &scaled, 0, 0);
    }
    panel.draw(&mut base);
    DynamicImage::ImageRgba8(base).into_rgb8()
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
    Ok(buf)
}

/// An encoded export and the name to save it under.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub file_name: String,
    pub jpeg: Vec<u8>,
}

impl Snapshot {
    /// Encode `image`, naming it `<prefix>_<unix ms>.jpg`.
    pub fn new(prefix: &str, image: &RgbImage, quality: u8) -> Result<Self, Error> {
        let jpeg = encode_jpeg(image, quality)?;
        Ok(Snapshot {
            file_name: format!("{}_{}.jpg", prefix, chrono::Utc::now().timestamp_millis()),
            jpeg,
        })
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf, Error> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.jpeg)?;
        tracing::info!("saved {} ({} bytes)", path.display(), self.jpeg.len());
        Ok(path)
    }
}
