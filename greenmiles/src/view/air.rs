//! The air-quality camera view.

use embedded_graphics::geometry::Size;
use image::{imageops, RgbImage, RgbaImage};
use rand::rngs::StdRng;

use super::{backdrop, error_bar, status_bar, Input, View};
use crate::{
    atmosphere::{AirQuery, AirSample},
    device::Position,
    export::{self, Panel, Snapshot},
    field::ParticleField,
    quality::{AirQuality, PLACEHOLDER},
    refresh::AirUpdate,
    Error,
};

/// Air readings drifting over the camera.
pub struct AirView {
    size: Size,
    sample: Option<AirSample>,
    position: Option<Position>,
    error: Option<String>,
    busy_road: bool,
    jpeg_quality: u8,
    field: ParticleField,
    overlay: RgbaImage,
    rng: StdRng,
}

impl AirView {
    pub fn new(size: Size, rng: StdRng) -> Self {
        AirView {
            size,
            sample: None,
            position: None,
            error: None,
            busy_road: false,
            jpeg_quality: export::JPEG_QUALITY,
            field: ParticleField::new(size.width, size.height),
            overlay: RgbaImage::new(size.width, size.height),
            rng,
        }
    }

    pub fn with_busy_road(self, busy_road: bool) -> Self {
        AirView { busy_road, ..self }
    }

    pub fn with_jpeg_quality(self, jpeg_quality: u8) -> Self {
        AirView {
            jpeg_quality,
            ..self
        }
    }

    /// Record where we are, or why we don't know.
    pub fn locate(&mut self, fix: Result<Position, Error>) {
        match fix {
            Ok(p) => self.position = Some(p),
            Err(e) => self.show_error(e.to_string()),
        }
    }

    /// What to ask the sampler for; nothing until there is a position.
    pub fn query(&self) -> Option<AirQuery> {
        self.position.map(|p| AirQuery {
            lat: p.lat,
            lon: p.lon,
            busy_road: self.busy_road,
        })
    }

    pub fn sample(&self) -> Option<&AirSample> {
        self.sample.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    /// Combined quality; neutral until the first sample arrives.
    pub fn quality(&self) -> AirQuality {
        self.sample
            .map(|s| s.quality())
            .unwrap_or_else(|| AirQuality::new(None, None))
    }

    /// `😊 Air Quality  PM2.5: 12.5 | CO2: 455`
    pub fn status_line(&self) -> String {
        let s = self.sample.unwrap_or_default();
        let pm = s
            .pm25
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| PLACEHOLDER.to_owned());
        let co2 = s
            .co2_ppm
            .map(|v| format!("{}", v.round()))
            .unwrap_or_else(|| PLACEHOLDER.to_owned());
        format!(
            "{} Air Quality  PM2.5: {} | CO2: {}",
            self.quality().glyph(),
            pm,
            co2
        )
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.field.resize(size.width, size.height);
        self.overlay = RgbaImage::new(size.width, size.height);
    }

    /// Sync the field to the current readings and advance it one frame.
    pub fn tick(&mut self, t: f32) {
        let air = self.quality();
        let wind = self.sample.map(|s| s.wind()).unwrap_or_default();
        if self.field.sync(&air, &wind, &mut self.rng) {
            tracing::info!(
                "air field rebuilt: {:?} at severity {:.2}",
                self.field.mode(),
                air.severity()
            );
        }
        self.field.step(t);
        self.field.render(&mut self.overlay, t);
    }

    pub fn overlay(&self) -> &RgbaImage {
        &self.overlay
    }
}

impl View for AirView {
    fn size(&self) -> Size {
        self.size
    }

    fn update_air(&mut self, update: AirUpdate) {
        match update {
            Ok(s) => {
                self.sample = Some(s);
                self.error = None;
            }
            Err(e) => self.show_error(e.to_string()),
        }
    }

    fn show_error(&mut self, message: String) {
        tracing::warn!("air view: {}", message);
        self.error = Some(message);
    }

    fn handle(&mut self, input: Input) {
        tracing::trace!("air view ignores {:?}", input);
    }

    fn draw(&mut self, camera: Option<&RgbImage>, t: f32, controls: f32) -> RgbaImage {
        self.tick(t);
        let mut frame = backdrop(camera, self.size);
        imageops::overlay(&mut frame, &self.overlay, 0, 0);
        status_bar(&mut frame, &self.status_line(), controls);
        if let Some(e) = &self.error {
            error_bar(&mut frame, e);
        }
        frame
    }

    /// The photo button: refused while there is no data to report.
    fn snapshot(&self, camera: Option<&RgbImage>) -> Result<Snapshot, Error> {
        if let Some(e) = &self.error {
            return Err(Error::invalid(format!("no photo while showing: {e}")));
        }
        if self.sample.is_none() {
            return Err(Error::invalid("no photo before the first reading"));
        }
        let coords = self.position.map(|p| (p.lat, p.lon));
        let panel = Panel::air(self.sample.as_ref(), coords);
        let image = export::compose(camera, &self.overlay, &panel);
        Snapshot::new("air", &image, self.jpeg_quality)
    }
}
