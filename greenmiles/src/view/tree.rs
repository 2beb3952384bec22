//! The trunk-measuring camera view.

use embedded_graphics::geometry::Size;
use image::{imageops, RgbImage, RgbaImage};

use super::{backdrop, error_bar, status_bar, Input, View};
use crate::{
    drawing::clear,
    export::{self, Panel, Snapshot},
    measure::{Measurement, Phase},
    trunk::{self, PixelPoint, TrunkParams},
    Error,
};

pub struct TreeView {
    size: Size,
    params: TrunkParams,
    measurement: Measurement,
    error: Option<String>,
    jpeg_quality: u8,
    overlay: RgbaImage,
}

impl TreeView {
    /// A view with default inputs (63° field of view).
    pub fn new(size: Size) -> Self {
        TreeView {
            size,
            params: TrunkParams::default(),
            measurement: Measurement::new(),
            error: None,
            jpeg_quality: export::JPEG_QUALITY,
            overlay: RgbaImage::new(size.width, size.height),
        }
    }

    pub fn with_params(self, params: TrunkParams) -> Self {
        TreeView { params, ..self }
    }

    /// The same view, with the field of view guessed from its shape.
    pub fn with_auto_fov(mut self) -> Self {
        self.auto_fov();
        self
    }

    fn auto_fov(&mut self) {
        let aspect = self.size.width as f64 / self.size.height.max(1) as f64;
        match self.params.with_hfov(trunk::suggest_hfov(aspect)) {
            Ok(p) => self.params = p,
            Err(e) => self.show_error(e.to_string()),
        }
        tracing::debug!("field of view set to {}°", self.params.hfov_deg());
    }

    pub fn with_jpeg_quality(self, jpeg_quality: u8) -> Self {
        TreeView {
            jpeg_quality,
            ..self
        }
    }

    pub fn params(&self) -> &TrunkParams {
        &self.params
    }

    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn status_line(&self) -> String {
        match (self.measurement.prompt(), self.measurement.estimate()) {
            (Some(prompt), _) => prompt.to_owned(),
            (None, Some(r)) => r.lines()[0].clone(),
            (None, None) => format!(
                "Tree  {:.0} cm | {:.0}° | {}",
                self.params.distance_cm(),
                self.params.hfov_deg(),
                self.params.species()
            ),
        }
    }

    fn redraw_overlay(&mut self) {
        clear(&mut self.overlay);
        self.measurement.draw(&mut self.overlay);
    }
}

impl View for TreeView {
    fn size(&self) -> Size {
        self.size
    }

    fn show_error(&mut self, message: String) {
        tracing::warn!("tree view: {}", message);
        self.error = Some(message);
    }

    fn handle(&mut self, input: Input) {
        match input {
            Input::Tap(p) => self
                .measurement
                .tap(PixelPoint::new(p.x as f64, p.y as f64)),
            Input::Measure => {
                self.measurement.toggle();
                self.error = None;
            }
            Input::Clear => self.measurement.clear(),
            Input::AutoFov => self.auto_fov(),
            Input::Calculate => {
                let width = self.size.width as f64;
                match self.measurement.calculate(&self.params, width) {
                    Ok(_) => self.error = None,
                    Err(e) => self.show_error(e.to_string()),
                }
            }
            _ => (),
        }
    }

    fn draw(&mut self, camera: Option<&RgbImage>, _t: f32, controls: f32) -> RgbaImage {
        self.redraw_overlay();
        let mut frame = backdrop(camera, self.size);
        imageops::overlay(&mut frame, &self.overlay, 0, 0);
        // The prompt has its own band while measuring.
        if !matches!(self.measurement.phase(), Phase::Measuring(_)) {
            status_bar(&mut frame, &self.status_line(), controls);
        }
        if let Some(e) = &self.error {
            error_bar(&mut frame, e);
        }
        frame
    }

    fn snapshot(&self, camera: Option<&RgbImage>) -> Result<Snapshot, Error> {
        let result = self
            .measurement
            .estimate()
            .ok_or_else(|| Error::invalid("measure and calculate before saving"))?;
        let panel = Panel::tree(result);
        let image = export::compose(camera, &self.overlay, &panel);
        Snapshot::new("tree", &image, self.jpeg_quality)
    }
}
