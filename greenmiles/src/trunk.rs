//! Trunk diameter (DBH) from two picked screen points, and what a trunk
//! that size exchanges in CO2 and O2.
//!
//! The size estimate is the pinhole-camera relation: real size equals
//! distance times pixel size over the focal length in pixels, where the
//! focal length comes from the display width and the horizontal field of
//! view. The exchange estimate is quadratic in DBH with a per-species
//! coefficient range.

use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};

use crate::Error;

/// Grams of O2 released per gram of CO2 fixed (32/44).
pub const O2_PER_CO2: f64 = 0.727;

pub const DISTANCE_CM_RANGE: (f64, f64) = (50.0, 500.0);
pub const HFOV_DEG_RANGE: (f64, f64) = (45.0, 90.0);
pub const LIGHT_FACTOR_RANGE: (f64, f64) = (0.8, 1.2);
/// Typical phone main-camera horizontal FOV.
pub const DEFAULT_HFOV_DEG: f64 = 63.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    #[default]
    Generic,
    Broadleaf,
    Conifer,
    /// Fast-growing species.
    Fast,
}

/// Yearly kg of CO2 per cm² of DBH.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Absorption {
    pub k_min: f64,
    pub k_max: f64,
}

impl Species {
    pub const ALL: [Species; 4] = [
        Species::Generic,
        Species::Broadleaf,
        Species::Conifer,
        Species::Fast,
    ];

    pub fn absorption(self) -> Absorption {
        let (k_min, k_max) = match self {
            Species::Generic | Species::Broadleaf => (0.02, 0.04),
            Species::Conifer => (0.018, 0.035),
            Species::Fast => (0.03, 0.06),
        };
        Absorption { k_min, k_max }
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Generic => "generic",
            Species::Broadleaf => "broadleaf",
            Species::Conifer => "conifer",
            Species::Fast => "fast",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .into_iter()
            .find(|sp| sp.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid(format!("unknown species {s:?}")))
    }
}

/// A point in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        PixelPoint { x, y }
    }

    pub fn distance(&self, other: &PixelPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Focal length in pixels for a display `display_width` pixels wide.
pub fn focal_length_px(display_width: f64, hfov_deg: f64) -> f64 {
    let hfov = hfov_deg.to_radians();
    (display_width / 2.0) / (hfov / 2.0).tan()
}

/// Real length of a `pixel_len` chord seen `distance_cm` away.
pub fn pixels_to_cm(pixel_len: f64, distance_cm: f64, hfov_deg: f64, display_width: f64) -> f64 {
    distance_cm * (pixel_len / focal_length_px(display_width, hfov_deg))
}

/// Field of view to suggest for a display aspect ratio (width / height).
pub fn suggest_hfov(aspect: f64) -> f64 {
    if aspect > 1.9 {
        65.0
    } else if aspect > 1.7 {
        63.0
    } else {
        60.0
    }
}

/// The user-set inputs of an estimate, clamped to their ranges. Only
/// [TrunkParams::new] and the `with_` setters build one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrunkParams {
    distance_cm: f64,
    #[serde(rename = "hFOV_deg")]
    hfov_deg: f64,
    species: Species,
    #[serde(rename = "lightFactor")]
    light_factor: f64,
}

impl Default for TrunkParams {
    fn default() -> Self {
        TrunkParams {
            distance_cm: 200.0,
            hfov_deg: DEFAULT_HFOV_DEG,
            species: Species::Generic,
            light_factor: 1.0,
        }
    }
}

fn clamp_finite(name: &str, v: f64, (lo, hi): (f64, f64)) -> Result<f64, Error> {
    if !v.is_finite() {
        return Err(Error::invalid(format!("{name} must be a number, got {v}")));
    }
    Ok(v.clamp(lo, hi))
}

impl TrunkParams {
    /// Build from raw user input; numbers are clamped into range, but must
    /// be finite.
    pub fn new(
        distance_cm: f64,
        hfov_deg: f64,
        species: Species,
        light_factor: f64,
    ) -> Result<Self, Error> {
        Ok(TrunkParams {
            distance_cm: clamp_finite("distance", distance_cm, DISTANCE_CM_RANGE)?,
            hfov_deg: clamp_finite("field of view", hfov_deg, HFOV_DEG_RANGE)?,
            species,
            light_factor: clamp_finite("light factor", light_factor, LIGHT_FACTOR_RANGE)?,
        })
    }

    /// The same inputs with another field of view, clamped.
    pub fn with_hfov(self, hfov_deg: f64) -> Result<Self, Error> {
        TrunkParams::new(self.distance_cm, hfov_deg, self.species, self.light_factor)
    }

    pub fn distance_cm(&self) -> f64 {
        self.distance_cm
    }

    pub fn hfov_deg(&self) -> f64 {
        self.hfov_deg
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn light_factor(&self) -> f64 {
        self.light_factor
    }
}

/// Gas exchange of one tree, min and max of the species range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exchange {
    pub co2_g_day_min: f64,
    pub co2_g_day_max: f64,
    pub o2_g_day_min: f64,
    pub o2_g_day_max: f64,
    pub co2_kg_year_min: f64,
    pub co2_kg_year_max: f64,
    pub o2_kg_year_min: f64,
    pub o2_kg_year_max: f64,
}

impl Exchange {
    pub fn from_dbh(dbh_cm: f64, species: Species, light_factor: f64) -> Self {
        let Absorption { k_min, k_max } = species.absorption();
        let co2_kg_year_min = k_min * dbh_cm * dbh_cm * light_factor;
        let co2_kg_year_max = k_max * dbh_cm * dbh_cm * light_factor;
        let co2_g_day_min = co2_kg_year_min * 1000.0 / 365.0;
        let co2_g_day_max = co2_kg_year_max * 1000.0 / 365.0;
        Exchange {
            co2_g_day_min,
            co2_g_day_max,
            o2_g_day_min: co2_g_day_min * O2_PER_CO2,
            o2_g_day_max: co2_g_day_max * O2_PER_CO2,
            co2_kg_year_min,
            co2_kg_year_max,
            o2_kg_year_min: co2_kg_year_min * O2_PER_CO2,
            o2_kg_year_max: co2_kg_year_max * O2_PER_CO2,
        }
    }
}

/// Round to one decimal place, the precision values are reported at.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn one_decimal<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round1(*v))
}

/// The outcome of one "Calculate".
///
/// Fields hold full precision so that the O2/CO2 ratio is exact; everything
/// reported (serialized, formatted) is rounded to one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimateResult {
    #[serde(serialize_with = "one_decimal")]
    pub dbh_cm: f64,
    #[serde(serialize_with = "one_decimal")]
    pub co2_g_day_min: f64,
    #[serde(serialize_with = "one_decimal")]
    pub co2_g_day_max: f64,
    #[serde(serialize_with = "one_decimal")]
    pub o2_g_day_min: f64,
    #[serde(serialize_with = "one_decimal")]
    pub o2_g_day_max: f64,
    #[serde(serialize_with = "one_decimal")]
    pub co2_kg_year_min: f64,
    #[serde(serialize_with = "one_decimal")]
    pub co2_kg_year_max: f64,
    #[serde(serialize_with = "one_decimal")]
    pub o2_kg_year_min: f64,
    #[serde(serialize_with = "one_decimal")]
    pub o2_kg_year_max: f64,
    pub inputs: TrunkParams,
}

impl EstimateResult {
    pub fn from_dbh(dbh_cm: f64, inputs: TrunkParams) -> Self {
        let x = Exchange::from_dbh(dbh_cm, inputs.species, inputs.light_factor);
        EstimateResult {
            dbh_cm,
            co2_g_day_min: x.co2_g_day_min,
            co2_g_day_max: x.co2_g_day_max,
            o2_g_day_min: x.o2_g_day_min,
            o2_g_day_max: x.o2_g_day_max,
            co2_kg_year_min: x.co2_kg_year_min,
            co2_kg_year_max: x.co2_kg_year_max,
            o2_kg_year_min: x.o2_kg_year_min,
            o2_kg_year_max: x.o2_kg_year_max,
            inputs,
        }
    }

    /// Report lines, in panel order.
    pub fn lines(&self) -> [String; 5] {
        [
            format!("DBH: {:.1} cm", self.dbh_cm),
            format!(
                "Daily CO2 absorption: {:.1}-{:.1} g",
                self.co2_g_day_min, self.co2_g_day_max
            ),
            format!(
                "Daily O2 production: {:.1}-{:.1} g",
                self.o2_g_day_min, self.o2_g_day_max
            ),
            format!(
                "Yearly: {:.1}-{:.1} kg CO2",
                self.co2_kg_year_min, self.co2_kg_year_max
            ),
            format!(
                "Species: {} | Light: {}x",
                self.inputs.species, self.inputs.light_factor
            ),
        ]
    }
}

/// Estimate from the two trunk edges picked on a display `display_width`
/// pixels wide.
pub fn estimate(
    p0: PixelPoint,
    p1: PixelPoint,
    display_width: f64,
    params: &TrunkParams,
) -> Result<EstimateResult, Error> {
    if !(display_width.is_finite() && display_width > 0.0) {
        return Err(Error::invalid(format!(
            "display width must be positive, got {display_width}"
        )));
    }
    let pixel_len = p0.distance(&p1);
    if !pixel_len.is_finite() {
        return Err(Error::invalid("measurement points must be finite"));
    }
    let dbh_cm = pixels_to_cm(pixel_len, params.distance_cm, params.hfov_deg, display_width);
    tracing::debug!(
        "measured {:.1} px over {:.0} px at {} cm, {}°: {:.2} cm",
        pixel_len,
        display_width,
        params.distance_cm,
        params.hfov_deg,
        dbh_cm
    );
    Ok(EstimateResult::from_dbh(dbh_cm, *params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn focal_length_for_phone_display() {
        let f = focal_length_px(720.0, 63.0);
        assert!((f - 587.5).abs() < 0.2, "focal length {f}");
    }

    #[test]
    fn dbh_from_two_taps() {
        let r = estimate(
            PixelPoint::new(100.0, 200.0),
            PixelPoint::new(180.0, 200.0),
            720.0,
            &TrunkParams::default(),
        )
        .expect("valid input");
        assert_eq!(round1(r.dbh_cm), 27.2);
    }

    #[test]
    fn generic_tree_exchange() {
        let params = TrunkParams::default();
        let r = EstimateResult::from_dbh(27.2, params);
        assert_eq!(round1(r.co2_kg_year_min), 14.8);
        assert_eq!(round1(r.co2_kg_year_max), 29.6);
        assert_eq!(round1(r.co2_g_day_min), 40.5);
        assert_eq!(round1(r.co2_g_day_max), 81.1);
        assert_eq!(round1(r.o2_g_day_min), 29.5);
        // From the unrounded daily CO2 (81.08 g), not from the reported 81.1.
        assert_eq!(round1(r.o2_g_day_max), 58.9);
    }

    #[test]
    fn reported_values_are_rounded() {
        let r = EstimateResult::from_dbh(27.2, TrunkParams::default());
        let v = serde_json::to_value(r).expect("serializable");
        assert_eq!(v["dbh_cm"], 27.2);
        assert_eq!(v["co2_g_day_min"], 40.5);
        assert_eq!(v["o2_g_day_max"], 58.9);
        assert_eq!(v["inputs"]["species"], "generic");
        assert_eq!(v["inputs"]["hFOV_deg"], 63.0);
        assert_eq!(r.lines()[1], "Daily CO2 absorption: 40.5-81.1 g");
        assert_eq!(r.lines()[4], "Species: generic | Light: 1x");
    }

    #[test]
    fn species_table() {
        assert_eq!(Species::Broadleaf.absorption(), Species::Generic.absorption());
        assert_eq!(Species::Conifer.absorption().k_min, 0.018);
        assert_eq!(Species::Fast.absorption().k_max, 0.06);
        for sp in Species::ALL {
            let a = sp.absorption();
            assert!(a.k_min <= a.k_max);
            assert_eq!(sp.to_string().parse::<Species>().expect("round trips"), sp);
        }
        assert!("oak".parse::<Species>().is_err());
        assert_eq!(" Conifer ".parse::<Species>().expect("case-insensitive"), Species::Conifer);
    }

    #[test]
    fn params_are_clamped() {
        let p = TrunkParams::new(10.0, 120.0, Species::Fast, 3.0).expect("finite");
        assert_eq!(p.distance_cm, 50.0);
        assert_eq!(p.hfov_deg, 90.0);
        assert_eq!(p.light_factor, 1.2);
        let p = TrunkParams::new(1000.0, 10.0, Species::Fast, 0.1).expect("finite");
        assert_eq!((p.distance_cm, p.hfov_deg, p.light_factor), (500.0, 45.0, 0.8));
        assert!(TrunkParams::new(f64::NAN, 63.0, Species::Generic, 1.0).is_err());
    }

    #[test]
    fn fov_setter_clamps() {
        let p = TrunkParams::default().with_hfov(180.0).expect("finite");
        assert_eq!(p.hfov_deg(), 90.0);
        assert_eq!(p.distance_cm(), 200.0);
        assert_eq!(p.with_hfov(60.0).expect("finite").hfov_deg(), 60.0);
        assert!(p.with_hfov(f64::INFINITY).is_err());
    }

    #[test]
    fn bad_display_width() {
        let p = PixelPoint::new(0.0, 0.0);
        for w in [0.0, -5.0, f64::INFINITY] {
            assert!(matches!(
                estimate(p, p, w, &TrunkParams::default()),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn fov_suggestion() {
        assert_eq!(suggest_hfov(2.0), 65.0);
        assert_eq!(suggest_hfov(1.8), 63.0);
        assert_eq!(suggest_hfov(1.7), 60.0);
        assert_eq!(suggest_hfov(0.56), 60.0);
    }

    fn species() -> impl Strategy<Value = Species> {
        prop::sample::select(Species::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn dbh_non_negative_and_linear(px in 0.0f64..2000.0, d in 50.0f64..500.0,
                                       fov in 45.0f64..=90.0, w in 100.0f64..4000.0) {
            let one = pixels_to_cm(px, d, fov, w);
            prop_assert!(one >= 0.0);
            let doubled_px = pixels_to_cm(px * 2.0, d, fov, w);
            let doubled_d = pixels_to_cm(px, d * 2.0, fov, w);
            prop_assert!((doubled_px - 2.0 * one).abs() <= 1e-9 * (1.0 + one));
            prop_assert!((doubled_d - 2.0 * one).abs() <= 1e-9 * (1.0 + one));
        }

        #[test]
        fn wider_fov_covers_more_per_pixel(px in 1.0f64..2000.0, d in 50.0f64..500.0,
                             a in 45.0f64..90.0, delta in 0.5f64..20.0, w in 100.0f64..4000.0) {
            // A wider view means a shorter focal length, so each pixel spans more.
            let b = (a + delta).min(90.0);
            prop_assume!(b > a);
            prop_assert!(focal_length_px(w, b) < focal_length_px(w, a));
            prop_assert!(pixels_to_cm(px, d, b, w) > pixels_to_cm(px, d, a, w));
        }

        #[test]
        fn exchange_invariants(dbh in 0.0f64..300.0, sp in species(), light in 0.8f64..=1.2) {
            let x = Exchange::from_dbh(dbh, sp, light);
            prop_assert!(x.co2_kg_year_min <= x.co2_kg_year_max);
            prop_assert!(x.co2_g_day_min <= x.co2_g_day_max);
            prop_assert_eq!(x.o2_g_day_min, x.co2_g_day_min * O2_PER_CO2);
            prop_assert_eq!(x.o2_g_day_max, x.co2_g_day_max * O2_PER_CO2);
            prop_assert_eq!(x.o2_kg_year_min, x.co2_kg_year_min * O2_PER_CO2);
            prop_assert_eq!(x.o2_kg_year_max, x.co2_kg_year_max * O2_PER_CO2);
        }

        #[test]
        fn reruns_are_bit_identical(x0 in 0.0f64..1000.0, x1 in 0.0f64..1000.0, y in 0.0f64..1000.0,
                                    sp in species(), light in 0.8f64..=1.2) {
            let params = TrunkParams::new(180.0, 70.0, sp, light).expect("finite");
            let a = estimate(PixelPoint::new(x0, y), PixelPoint::new(x1, y), 720.0, &params);
            let b = estimate(PixelPoint::new(x0, y), PixelPoint::new(x1, y), 720.0, &params);
            let (a, b) = (a.expect("valid"), b.expect("valid"));
            prop_assert_eq!(a.dbh_cm.to_bits(), b.dbh_cm.to_bits());
            prop_assert_eq!(a, b);
        }
    }
}
