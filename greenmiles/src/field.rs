//! The animated particle overlay.
//!
//! Particles drift with the wind, wobble a little so the motion does not
//! look uniform, and wrap around the edges. Clean air draws a light mist of
//! discs; once the worse pollutant reaches "moderate" the field switches to
//! wind-aligned leaf motes.
//!
//! The particle set is only rebuilt when the inputs that shaped it change
//! (see [FieldKey]); otherwise it keeps evolving frame to frame.

use embedded_graphics::pixelcolor::Rgb888;
use image::RgbaImage;
use rand::Rng;

use crate::{
    drawing::{clear, fill_circle, fill_ellipse},
    quality::AirQuality,
    wind::WindVector,
};

/// Severity at which mist turns into leaves.
pub const LEAF_THRESHOLD: f32 = 0.35;

/// How the particles look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Mist,
    Leaf,
}

impl Mode {
    pub fn for_severity(severity: f32) -> Self {
        if severity >= LEAF_THRESHOLD {
            Mode::Leaf
        } else {
            Mode::Mist
        }
    }

    pub fn particle_count(self) -> usize {
        match self {
            Mode::Mist => 160,
            Mode::Leaf => 120,
        }
    }

    /// Cap on a single particle's opacity, so dense fields never go solid.
    pub fn alpha_ceiling(self) -> f32 {
        match self {
            Mode::Mist => 0.55,
            Mode::Leaf => 0.65,
        }
    }

    fn alpha_gain(self) -> f32 {
        match self {
            Mode::Mist => 0.7,
            Mode::Leaf => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    /// Phase offset for the wobble and the leaf "breathing".
    pub seed: f32,
    pub alpha: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Everything the particle set depends on. A change means a rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldKey {
    pub tint: Rgb888,
    pub alpha: f32,
    pub pm_score: f32,
    pub co2_score: f32,
    pub wind: WindVector,
}

impl FieldKey {
    pub fn new(air: &AirQuality, wind: &WindVector) -> Self {
        FieldKey {
            tint: air.tint,
            alpha: air.alpha,
            pm_score: air.pm.score,
            co2_score: air.co2.score,
            wind: *wind,
        }
    }

    fn severity(&self) -> f32 {
        self.pm_score.max(self.co2_score)
    }
}

/// A field of particles over a `width` x `height` surface.
#[derive(Debug, Clone)]
pub struct ParticleField {
    key: Option<FieldKey>,
    mode: Mode,
    width: u32,
    height: u32,
    particles: Vec<Particle>,
}

impl ParticleField {
    /// An empty field; nothing is drawn until the first [sync](Self::sync).
    pub fn new(width: u32, height: u32) -> Self {
        ParticleField {
            key: None,
            mode: Mode::Mist,
            width,
            height,
            particles: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn key(&self) -> Option<&FieldKey> {
        self.key.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Change the surface size. Particles carry on and wrap into the new
    /// bounds on their own.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Bring the field in line with the latest inputs.
    ///
    /// Returns true if the particle set was rebuilt.
    pub fn sync<R: Rng + ?Sized>(
        &mut self,
        air: &AirQuality,
        wind: &WindVector,
        rng: &mut R,
    ) -> bool {
        let key = FieldKey::new(air, wind);
        if self.key.as_ref() == Some(&key) {
            return false;
        }
        self.rebuild(key, rng);
        true
    }

    fn rebuild<R: Rng + ?Sized>(&mut self, key: FieldKey, rng: &mut R) {
        let severity = key.severity();
        let mode = Mode::for_severity(severity);
        let (w, h) = (self.width as f32, self.height as f32);
        let size_max = 8.0 + key.pm_score * 6.0 + key.co2_score * 6.0;

        self.particles = (0..mode.particle_count())
            .map(|_| {
                let (r, alpha) = match mode {
                    Mode::Mist => (
                        3.0 + rng.random::<f32>() * (4.0 + severity * 3.0),
                        0.15 + rng.random::<f32>() * 0.2 * (1.0 + severity),
                    ),
                    Mode::Leaf => (
                        4.0 + rng.random::<f32>() * size_max,
                        0.2 + rng.random::<f32>() * 0.25 * (1.0 + severity),
                    ),
                };
                Particle {
                    x: rng.random::<f32>() * w,
                    y: rng.random::<f32>() * h,
                    r,
                    seed: rng.random::<f32>() * 1000.0,
                    alpha,
                    vx: 0.0,
                    vy: 0.0,
                }
            })
            .collect();
        tracing::debug!(
            "rebuilt field: {:?}, {} particles, severity {:.2}",
            mode,
            self.particles.len(),
            severity
        );
        self.mode = mode;
        self.key = Some(key);
    }

    /// Advance one frame; `t` is the animation clock in seconds.
    pub fn step(&mut self, t: f32) {
        let Some(key) = self.key else {
            return;
        };
        let (w, h) = (self.width as f32, self.height as f32);
        let drift = key.wind.px_per_frame();
        let wobble = 0.2 * (1.0 + key.severity() * 0.5);

        for p in self.particles.iter_mut() {
            let wobble_x = wobble * (t * 0.5 + p.seed).sin();
            let wobble_y = wobble * 0.5 * (t * 0.7 + p.seed * 0.8).cos();
            p.vx = key.wind.dir_x * drift + wobble_x;
            p.vy = key.wind.dir_y * drift + wobble_y;
            p.x += p.vx;
            p.y += p.vy;

            // Toroidal wrap, once fully off-screen.
            if p.x < -p.r * 2.0 {
                p.x = w + p.r;
            }
            if p.x > w + p.r * 2.0 {
                p.x = -p.r;
            }
            if p.y < -p.r * 2.0 {
                p.y = h + p.r;
            }
            if p.y > h + p.r * 2.0 {
                p.y = -p.r;
            }
        }
    }

    /// Opacity for one particle, after the mode's ceiling.
    pub fn particle_alpha(&self, p: &Particle) -> f32 {
        let combined = self.key.map(|k| k.alpha).unwrap_or(0.0);
        (p.alpha * combined * self.mode.alpha_gain()).min(self.mode.alpha_ceiling())
    }

    /// Clear `overlay` and draw the field at time `t`.
    pub fn render(&self, overlay: &mut RgbaImage, t: f32) {
        clear(overlay);
        let Some(key) = self.key else {
            return;
        };
        let tilt = key.wind.heading();
        for p in &self.particles {
            let alpha = self.particle_alpha(p);
            match self.mode {
                Mode::Mist => fill_circle(overlay, p.x, p.y, p.r, key.tint, alpha),
                Mode::Leaf => {
                    let breath = 0.85 + 0.15 * (t + p.seed).sin();
                    let rx = p.r * 1.3 * breath;
                    let ry = p.r * 0.4;
                    fill_ellipse(overlay, p.x, p.y, rx, ry, tilt, key.tint, alpha);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn clean() -> AirQuality {
        AirQuality::new(Some(5.0), Some(450.0))
    }

    fn dirty() -> AirQuality {
        AirQuality::new(Some(40.0), Some(600.0))
    }

    #[test]
    fn mode_and_count_follow_severity() {
        let mut f = ParticleField::new(360, 640);
        assert!(f.sync(&clean(), &WindVector::default(), &mut rng()));
        assert_eq!(f.mode(), Mode::Mist);
        assert_eq!(f.particles().len(), 160);

        assert!(f.sync(&dirty(), &WindVector::default(), &mut rng()));
        assert_eq!(f.mode(), Mode::Leaf);
        assert_eq!(f.particles().len(), 120);

        // Exactly at the threshold is already leaves.
        assert_eq!(Mode::for_severity(0.35), Mode::Leaf);
        assert_eq!(Mode::for_severity(0.349), Mode::Mist);
    }

    #[test]
    fn particles_start_on_surface_with_bounded_sizes() {
        let mut f = ParticleField::new(200, 100);
        f.sync(&dirty(), &WindVector::default(), &mut rng());
        let size_max = 8.0 + 0.60 * 6.0 + 0.35 * 6.0;
        for p in f.particles() {
            assert!((0.0..200.0).contains(&p.x));
            assert!((0.0..100.0).contains(&p.y));
            assert!(p.r >= 4.0 && p.r <= 4.0 + size_max);
            assert!(p.alpha >= 0.2 && p.alpha <= 0.2 + 0.25 * 1.6);
            assert!((0.0..1000.0).contains(&p.seed));
        }
    }

    #[test]
    fn unchanged_inputs_do_not_rebuild() {
        let mut f = ParticleField::new(100, 100);
        let wind = WindVector::from_reading(Some(90.0), Some(2.0));
        assert!(f.sync(&clean(), &wind, &mut rng()));
        f.step(0.1);
        let moved = f.particles().to_vec();
        assert!(!f.sync(&clean(), &wind, &mut rng()));
        assert_eq!(f.particles(), &moved[..]);

        // A new wind direction is a restart trigger.
        let turned = WindVector::from_reading(Some(180.0), Some(2.0));
        assert!(f.sync(&clean(), &turned, &mut rng()));
        // So is a different tint/score with the same wind.
        assert!(f.sync(&AirQuality::new(Some(20.0), Some(450.0)), &turned, &mut rng()));
    }

    #[test]
    fn resize_keeps_particles() {
        let mut f = ParticleField::new(100, 100);
        f.sync(&clean(), &WindVector::default(), &mut rng());
        let before = f.particles().to_vec();
        f.resize(300, 50);
        assert_eq!(f.size(), (300, 50));
        assert_eq!(f.particles(), &before[..]);
    }

    #[test]
    fn drift_follows_wind() {
        let mut f = ParticleField::new(1000, 1000);
        // From the east: heading -x at 15 + 4*15 = 75 px/s, 1.25 px/frame.
        let wind = WindVector::from_reading(Some(90.0), Some(4.0));
        f.sync(&clean(), &wind, &mut rng());
        let before = f.particles().to_vec();
        f.step(0.0);
        for (a, b) in before.iter().zip(f.particles()) {
            let wobble = 0.2 * (1.0 + 0.12 * 0.5);
            assert!((b.vx - (-1.25)).abs() <= wobble + 1e-4);
            assert!(b.vy.abs() <= wobble * 0.5 + 1e-4);
            if a.x > 50.0 {
                assert!(b.x < a.x);
            }
        }
    }

    #[test]
    fn wraps_past_edges() {
        let mut f = ParticleField::new(50, 50);
        let wind = WindVector::from_reading(Some(90.0), Some(8.0));
        f.sync(&clean(), &wind, &mut rng());
        for _ in 0..2000 {
            f.step(0.0);
        }
        for p in f.particles() {
            assert!(p.x >= -p.r * 2.0 - 3.0 && p.x <= 50.0 + p.r * 2.0 + 3.0);
            assert!(p.y >= -p.r * 2.0 - 3.0 && p.y <= 50.0 + p.r * 2.0 + 3.0);
        }
    }

    /// A field holding just `p`, drifting one pixel a frame along (dx, dy).
    fn lone(air: &AirQuality, p: Particle, dir_x: f32, dir_y: f32) -> ParticleField {
        let wind = WindVector {
            dir_x,
            dir_y,
            px_per_sec: 60.0,
        };
        let mut f = ParticleField::new(50, 50);
        f.sync(air, &wind, &mut rng());
        f.particles = vec![p];
        f
    }

    fn at(x: f32, y: f32, r: f32) -> Particle {
        Particle {
            x,
            y,
            r,
            seed: 0.0,
            alpha: 0.5,
            vx: 0.0,
            vy: 0.0,
        }
    }

    #[test]
    fn wraps_to_the_far_edge() {
        // Leaving left: one step takes x from -9.5 to -10.5, past -2r.
        let mut f = lone(&clean(), at(-9.5, 25.0, 5.0), -1.0, 0.0);
        f.step(0.0);
        assert_eq!(f.particles()[0].x, 55.0);

        let mut f = lone(&clean(), at(59.5, 25.0, 5.0), 1.0, 0.0);
        f.step(0.0);
        assert_eq!(f.particles()[0].x, -5.0);

        let mut f = lone(&clean(), at(25.0, -9.5, 5.0), 0.0, -1.0);
        f.step(0.0);
        assert_eq!(f.particles()[0].y, 55.0);

        let mut f = lone(&clean(), at(25.0, 59.5, 5.0), 0.0, 1.0);
        f.step(0.0);
        assert_eq!(f.particles()[0].y, -5.0);
    }

    #[test]
    fn no_wrap_until_fully_off() {
        // Lands exactly on -2r: still off-screen, not yet wrapped, not clamped.
        let mut f = lone(&clean(), at(-9.0, 25.0, 5.0), -1.0, 0.0);
        f.step(0.0);
        assert_eq!(f.particles()[0].x, -10.0);
    }

    fn painted(overlay: &RgbaImage, x: u32, y: u32) -> bool {
        overlay.get_pixel(x, y).0[3] > 0
    }

    #[test]
    fn leaves_point_along_the_wind() {
        let mut overlay = RgbaImage::new(50, 50);
        // At t = 0 with seed 0: rx = 10 * 1.3 * 0.85 = 11.05, ry = 4.
        let f = lone(&dirty(), at(25.0, 25.0, 10.0), 1.0, 0.0);
        assert_eq!(f.mode(), Mode::Leaf);
        f.render(&mut overlay, 0.0);
        assert!(painted(&overlay, 34, 25), "along the heading");
        assert!(painted(&overlay, 15, 25));
        assert!(!painted(&overlay, 25, 32), "across the heading");

        let f = lone(&dirty(), at(25.0, 25.0, 10.0), 0.0, 1.0);
        f.render(&mut overlay, 0.0);
        assert!(painted(&overlay, 25, 34));
        assert!(!painted(&overlay, 32, 25));
    }

    #[test]
    fn leaves_breathe_lengthwise_only() {
        let mut overlay = RgbaImage::new(50, 50);
        let f = lone(&dirty(), at(25.0, 25.0, 10.0), 1.0, 0.0);
        let half_pi = std::f32::consts::FRAC_PI_2;

        // Fully inhaled: rx = 13.
        f.render(&mut overlay, half_pi);
        assert!(painted(&overlay, 37, 25));
        assert!(painted(&overlay, 25, 28));
        assert!(!painted(&overlay, 25, 30));

        // Fully exhaled: rx = 9.1; the width stays at ry = 4.
        f.render(&mut overlay, -half_pi);
        assert!(!painted(&overlay, 37, 25));
        assert!(painted(&overlay, 33, 25));
        assert!(painted(&overlay, 25, 28));
        assert!(!painted(&overlay, 25, 30));
    }

    #[test]
    fn alpha_is_capped() {
        let mut f = ParticleField::new(100, 100);
        let awful = AirQuality::new(Some(500.0), Some(3000.0));
        f.sync(&awful, &WindVector::default(), &mut rng());
        assert_eq!(f.mode(), Mode::Leaf);
        for p in f.particles() {
            let a = f.particle_alpha(p);
            assert!(a <= 0.65);
            assert!(a > 0.0);
        }
        let mut mist = ParticleField::new(100, 100);
        mist.sync(&AirQuality::new(None, None), &WindVector::default(), &mut rng());
        assert!(mist.particles().iter().all(|p| mist.particle_alpha(p) <= 0.55));
    }

    #[test]
    fn missing_data_still_animates() {
        let mut f = ParticleField::new(64, 64);
        f.sync(&AirQuality::new(None, None), &WindVector::from_reading(None, None), &mut rng());
        assert_eq!(f.mode(), Mode::Mist);
        let before = f.particles().to_vec();
        f.step(1.0);
        assert_ne!(f.particles(), &before[..]);

        let mut overlay = RgbaImage::new(64, 64);
        f.render(&mut overlay, 1.0);
        assert!(overlay.pixels().any(|p| p.0[3] > 0));
    }

    #[test]
    fn render_without_sync_is_blank() {
        let f = ParticleField::new(16, 16);
        let mut overlay = RgbaImage::from_pixel(16, 16, image::Rgba([9, 9, 9, 9]));
        f.render(&mut overlay, 0.0);
        assert!(overlay.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn same_seed_same_field() {
        let mut a = ParticleField::new(80, 80);
        let mut b = ParticleField::new(80, 80);
        a.sync(&dirty(), &WindVector::default(), &mut rng());
        b.sync(&dirty(), &WindVector::default(), &mut rng());
        for t in 0..30 {
            a.step(t as f32 / 60.0);
            b.step(t as f32 / 60.0);
        }
        assert_eq!(a.particles(), b.particles());
    }
}
