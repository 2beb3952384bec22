//! Air-quality classification.
//!
//! PM2.5 and CO2 are classified independently; each band carries a tint for
//! the particle overlay and a severity score in [0, 1]. Band upper bounds
//! are inclusive: 12.0 µg/m³ is still Good.

use embedded_graphics::pixelcolor::Rgb888;

/// Neutral gray used when a value is missing.
pub const NEUTRAL: Rgb888 = Rgb888::new(0xBF, 0xC6, 0xCC);

const PALE_BLUE: Rgb888 = Rgb888::new(0xDD, 0xE7, 0xF0);
const SKY: Rgb888 = Rgb888::new(0xBB, 0xD4, 0xE8);
const AMBER: Rgb888 = Rgb888::new(0xF4, 0xD0, 0x6F);
const ORANGE: Rgb888 = Rgb888::new(0xE5, 0x9D, 0x5A);
const RED: Rgb888 = Rgb888::new(0xD1, 0x6B, 0x6B);

/// Label shown in place of a missing value.
pub const PLACEHOLDER: &str = "—";

/// Ordered quality bands, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Band {
    Good,
    Moderate,
    /// Unhealthy for sensitive groups.
    Sensitive,
    Unhealthy,
    VeryUnhealthy,
}

impl Band {
    pub fn label(self) -> &'static str {
        match self {
            Band::Good => "Good",
            Band::Moderate => "Moderate",
            Band::Sensitive => "Sensitive",
            Band::Unhealthy => "Unhealthy",
            Band::VeryUnhealthy => "Very Unhealthy",
        }
    }
}

/// One pollutant, classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// None when there was no value to classify.
    pub band: Option<Band>,
    pub tint: Rgb888,
    pub score: f32,
}

impl Reading {
    const MISSING: Reading = Reading {
        band: None,
        tint: NEUTRAL,
        score: 0.0,
    };

    const fn new(band: Band, tint: Rgb888, score: f32) -> Self {
        Reading {
            band: Some(band),
            tint,
            score,
        }
    }

    pub fn label(&self) -> &'static str {
        self.band.map(Band::label).unwrap_or(PLACEHOLDER)
    }
}

/// Classify a PM2.5 concentration (µg/m³).
pub fn classify_pm25(pm: Option<f32>) -> Reading {
    let Some(pm) = pm.filter(|v| !v.is_nan()) else {
        return Reading::MISSING;
    };
    if pm <= 12.0 {
        Reading::new(Band::Good, PALE_BLUE, 0.12)
    } else if pm <= 35.0 {
        Reading::new(Band::Moderate, SKY, 0.35)
    } else if pm <= 55.0 {
        Reading::new(Band::Sensitive, AMBER, 0.60)
    } else if pm <= 150.0 {
        Reading::new(Band::Unhealthy, ORANGE, 0.78)
    } else {
        Reading::new(Band::VeryUnhealthy, RED, 0.90)
    }
}

/// Classify a CO2 concentration (ppm). There is no "very unhealthy" band.
pub fn classify_co2(co2: Option<f32>) -> Reading {
    let Some(co2) = co2.filter(|v| !v.is_nan()) else {
        return Reading::MISSING;
    };
    if co2 <= 500.0 {
        Reading::new(Band::Good, PALE_BLUE, 0.12)
    } else if co2 <= 700.0 {
        Reading::new(Band::Moderate, SKY, 0.35)
    } else if co2 <= 1000.0 {
        Reading::new(Band::Sensitive, AMBER, 0.60)
    } else {
        Reading::new(Band::Unhealthy, RED, 0.85)
    }
}

/// Both pollutants, combined into what drives the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirQuality {
    pub pm: Reading,
    pub co2: Reading,
    /// Tint of whichever reading is worse; PM2.5 wins ties.
    pub tint: Rgb888,
    /// `0.25 + severity / 2`.
    pub alpha: f32,
}

impl AirQuality {
    pub fn new(pm25: Option<f32>, co2_ppm: Option<f32>) -> Self {
        let pm = classify_pm25(pm25);
        let co2 = classify_co2(co2_ppm);
        let worst = if pm.score >= co2.score { pm } else { co2 };
        AirQuality {
            pm,
            co2,
            tint: worst.tint,
            alpha: 0.25 + worst.score * 0.5,
        }
    }

    /// The worse of the two scores.
    pub fn severity(&self) -> f32 {
        self.pm.score.max(self.co2.score)
    }

    /// A face for the status line.
    pub fn glyph(&self) -> &'static str {
        match self.severity() {
            s if s < 0.2 => "😊",
            s if s < 0.4 => "🙂",
            s if s < 0.6 => "😐",
            s if s < 0.8 => "😷",
            _ => "☠️",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pm25_bands_inclusive_upper_bound() {
        assert_eq!(classify_pm25(Some(12.0)).band, Some(Band::Good));
        assert_eq!(classify_pm25(Some(12.01)).band, Some(Band::Moderate));
        assert_eq!(classify_pm25(Some(35.0)).band, Some(Band::Moderate));
        assert_eq!(classify_pm25(Some(55.0)).band, Some(Band::Sensitive));
        assert_eq!(classify_pm25(Some(150.0)).band, Some(Band::Unhealthy));
        assert_eq!(classify_pm25(Some(150.5)).band, Some(Band::VeryUnhealthy));
        assert_eq!(classify_pm25(Some(0.0)).score, 0.12);
    }

    #[test]
    fn co2_bands() {
        assert_eq!(classify_co2(Some(500.0)).band, Some(Band::Good));
        assert_eq!(classify_co2(Some(700.0)).band, Some(Band::Moderate));
        assert_eq!(classify_co2(Some(1000.0)).band, Some(Band::Sensitive));
        let worst = classify_co2(Some(2400.0));
        assert_eq!(worst.band, Some(Band::Unhealthy));
        assert_eq!(worst.score, 0.85);
        assert_eq!(worst.tint, RED);
    }

    #[test]
    fn missing_values_are_neutral() {
        for r in [classify_pm25(None), classify_co2(None), classify_pm25(Some(f32::NAN))] {
            assert_eq!(r.band, None);
            assert_eq!(r.tint, NEUTRAL);
            assert_eq!(r.score, 0.0);
            assert_eq!(r.label(), "—");
        }
        let q = AirQuality::new(None, None);
        assert_eq!(q.severity(), 0.0);
        assert_eq!(q.tint, NEUTRAL);
        assert_eq!(q.alpha, 0.25);
    }

    #[test]
    fn sensitive_pm_beats_moderate_co2() {
        let q = AirQuality::new(Some(40.0), Some(600.0));
        assert_eq!(q.pm.score, 0.60);
        assert_eq!(q.pm.label(), "Sensitive");
        assert_eq!(q.co2.score, 0.35);
        assert_eq!(q.co2.label(), "Moderate");
        assert_eq!(q.severity(), 0.60);
        assert_eq!(q.tint, q.pm.tint);
        assert!((q.alpha - 0.55).abs() < 1e-6);
    }

    #[test]
    fn co2_tint_when_co2_is_worse() {
        let q = AirQuality::new(Some(5.0), Some(1200.0));
        assert_eq!(q.tint, RED);
        assert_eq!(q.severity(), 0.85);
    }

    #[test]
    fn ties_go_to_pm25() {
        // Same band, but the tables could diverge; the PM2.5 tint must win.
        let q = AirQuality::new(Some(20.0), Some(650.0));
        assert_eq!(q.pm.score, q.co2.score);
        assert_eq!(q.tint, q.pm.tint);
    }

    #[test]
    fn glyph_steps() {
        assert_eq!(AirQuality::new(Some(1.0), None).glyph(), "😊");
        assert_eq!(AirQuality::new(Some(20.0), None).glyph(), "🙂");
        assert_eq!(AirQuality::new(Some(40.0), None).glyph(), "😷");
        assert_eq!(AirQuality::new(Some(400.0), None).glyph(), "☠️");
    }

    proptest! {
        #[test]
        fn severity_is_the_max_and_bounded(pm in proptest::option::of(0.0f32..1000.0),
                                           co2 in proptest::option::of(0.0f32..5000.0)) {
            let q = AirQuality::new(pm, co2);
            prop_assert!((0.0..=1.0).contains(&q.severity()));
            prop_assert_eq!(q.severity(), q.pm.score.max(q.co2.score));
            let expected = if q.pm.score >= q.co2.score { q.pm.tint } else { q.co2.tint };
            prop_assert_eq!(q.tint, expected);
        }

        #[test]
        fn classification_is_monotonic(a in 0.0f32..400.0, b in 0.0f32..400.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify_pm25(Some(lo)).band <= classify_pm25(Some(hi)).band);
            prop_assert_eq!(classify_pm25(Some(a)), classify_pm25(Some(a)));
        }
    }
}
