//! Screen-space wind vectors.

use std::f32::consts::PI;

/// Drift used when the sample has no wind.
const CALM: WindVector = WindVector {
    dir_x: 0.3,
    dir_y: 0.1,
    px_per_sec: 15.0,
};

/// Direction the particles drift in, and how fast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindVector {
    pub dir_x: f32,
    pub dir_y: f32,
    pub px_per_sec: f32,
}

impl WindVector {
    /// Build from a meteorological reading.
    ///
    /// `deg` is where the wind comes *from*; the particles move the other way,
    /// hence the 180° turn. Speed saturates at 8 m/s.
    pub fn from_reading(deg: Option<f32>, speed: Option<f32>) -> Self {
        let (Some(deg), Some(speed)) = (deg, speed) else {
            return CALM;
        };
        if !deg.is_finite() || speed.is_nan() {
            return CALM;
        }
        let rad = (deg + 180.0) * PI / 180.0;
        WindVector {
            dir_x: rad.sin(),
            dir_y: rad.cos(),
            px_per_sec: 15.0 + speed.clamp(0.0, 8.0) * 15.0,
        }
    }

    /// Drift per frame at 60 frames per second.
    pub fn px_per_frame(&self) -> f32 {
        self.px_per_sec / 60.0
    }

    /// Angle of the drift direction, radians.
    pub fn heading(&self) -> f32 {
        self.dir_y.atan2(self.dir_x)
    }
}

impl Default for WindVector {
    fn default() -> Self {
        CALM
    }
}
