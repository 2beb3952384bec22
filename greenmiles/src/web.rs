//! Browser bindings: the particle field on a 2D canvas, and the tree
//! estimator.
use embedded_graphics::pixelcolor::RgbColor;
use log::MakeConsoleWriter;
use rand::{rngs::StdRng, SeedableRng};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::{
    atmosphere::AirSample,
    field::{Mode, ParticleField},
    trunk::{self, PixelPoint, TrunkParams},
    Error,
};

#[wasm_bindgen(start)]
fn start() {
    tracing_subscriber::fmt::fmt()
        .with_writer(MakeConsoleWriter)
        .without_time()
        .init();

    tracing::info!("greenmiles loaded");
}

/// The air field, drawn over whatever the page puts under the canvas.
#[wasm_bindgen]
pub struct FieldCanvas {
    ctx: CanvasRenderingContext2d,
    field: ParticleField,
    sample: AirSample,
    // Seeded by the page.
    rng: StdRng,
}

#[wasm_bindgen]
impl FieldCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, seed: u32) -> Result<FieldCanvas, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(FieldCanvas {
            field: ParticleField::new(canvas.width(), canvas.height()),
            ctx,
            sample: AirSample::default(),
            rng: StdRng::seed_from_u64(seed as u64),
        })
    }

    /// Latest reading from `/env`; any value may be missing.
    pub fn set_reading(
        &mut self,
        pm25: Option<f32>,
        co2_ppm: Option<f32>,
        wind_speed: Option<f32>,
        wind_deg: Option<f32>,
    ) {
        self.sample = AirSample {
            timestamp: chrono::Utc::now(),
            pm25,
            co2_ppm,
            wind_speed,
            wind_deg,
        };
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.field.resize(width, height);
    }

    pub fn status_line(&self) -> String {
        let q = self.sample.quality();
        format!("{} Air Quality  {} / {}", q.glyph(), q.pm.label(), q.co2.label())
    }

    /// Advance and draw one frame; `t` is in seconds.
    #[allow(deprecated)]
    pub fn frame(&mut self, t: f32) -> Result<(), JsValue> {
        let air = self.sample.quality();
        let wind = self.sample.wind();
        if self.field.sync(&air, &wind, &mut self.rng) {
            tracing::info!("field rebuilt: {:?}", self.field.mode());
        }
        self.field.step(t);

        let (w, h) = self.field.size();
        self.ctx.clear_rect(0.0, 0.0, w as f64, h as f64);
        let tint = air.tint;
        self.ctx.set_fill_style(&JsValue::from_str(&format!(
            "rgb({}, {}, {})",
            tint.r(),
            tint.g(),
            tint.b()
        )));
        let tilt = wind.heading() as f64;
        for p in self.field.particles() {
            self.ctx.set_global_alpha(self.field.particle_alpha(p) as f64);
            self.ctx.begin_path();
            match self.field.mode() {
                Mode::Mist => {
                    self.ctx
                        .arc(p.x as f64, p.y as f64, p.r as f64, 0.0, std::f64::consts::TAU)?
                }
                Mode::Leaf => {
                    let breath = 0.85 + 0.15 * (t + p.seed).sin();
                    self.ctx.ellipse(
                        p.x as f64,
                        p.y as f64,
                        (p.r * 1.3 * breath) as f64,
                        (p.r * 0.4) as f64,
                        tilt,
                        0.0,
                        std::f64::consts::TAU,
                    )?
                }
            }
            self.ctx.fill();
        }
        self.ctx.set_global_alpha(1.0);
        Ok(())
    }
}

fn estimate_json(
    points: [f64; 4],
    display_width: f64,
    distance_cm: f64,
    hfov_deg: f64,
    species: &str,
    light_factor: f64,
) -> Result<String, Error> {
    let [x0, y0, x1, y1] = points;
    let params = TrunkParams::new(distance_cm, hfov_deg, species.parse()?, light_factor)?;
    let result = trunk::estimate(
        PixelPoint::new(x0, y0),
        PixelPoint::new(x1, y1),
        display_width,
        &params,
    )?;
    serde_json::to_string(&result).map_err(|e| Error::invalid(e.to_string()))
}

/// Estimate from two trunk edges; returns the result as JSON.
#[allow(clippy::too_many_arguments)]
#[wasm_bindgen]
pub fn estimate_tree(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    display_width: f64,
    distance_cm: f64,
    hfov_deg: f64,
    species: &str,
    light_factor: f64,
) -> Result<String, JsValue> {
    estimate_json(
        [x0, y0, x1, y1],
        display_width,
        distance_cm,
        hfov_deg,
        species,
        light_factor,
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// FOV preset for a display of the given shape.
#[wasm_bindgen]
pub fn suggest_fov(width: f64, height: f64) -> f64 {
    if height > 0.0 {
        trunk::suggest_hfov(width / height)
    } else {
        trunk::DEFAULT_HFOV_DEG
    }
}

mod log {
    use tracing_subscriber::fmt::MakeWriter;
    use wasm_bindgen::JsValue;

    /// Writes log lines to the browser console.
    pub struct MakeConsoleWriter;

    impl MakeWriter<'_> for MakeConsoleWriter {
        type Writer = MakeConsoleWriter;

        fn make_writer(&'_ self) -> Self::Writer {
            MakeConsoleWriter
        }
    }

    impl std::io::Write for MakeConsoleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let line = match core::str::from_utf8(buf) {
                Ok(s) => JsValue::from_str(s.trim_end()),
                Err(_) => JsValue::from_str(&format!("non-utf8 log line: {:?}", buf)),
            };
            web_sys::console::log(&js_sys::Array::of1(&line));
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
