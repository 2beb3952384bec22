//! Types for surfacing air-quality and wind data.

use chrono::{DateTime, Utc};

use crate::{quality::AirQuality, wind::WindVector, Error};

#[cfg(feature = "proxy")]
pub mod proxy;

/// A sample of outdoor air conditions at one place.
///
/// Any field may be missing; the view then shows a placeholder and the
/// overlay falls back to neutral values.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct AirSample {
    /// Time at which the data in this sample was acquired.
    pub timestamp: DateTime<Utc>,

    /// Fine particulate matter, µg/m³.
    pub pm25: Option<f32>,

    /// Carbon dioxide concentration in parts per million.
    pub co2_ppm: Option<f32>,

    /// Wind speed, m/s.
    pub wind_speed: Option<f32>,

    /// Compass direction the wind blows from, degrees.
    pub wind_deg: Option<f32>,
}

impl AirSample {
    pub fn quality(&self) -> AirQuality {
        AirQuality::new(self.pm25, self.co2_ppm)
    }

    pub fn wind(&self) -> WindVector {
        WindVector::from_reading(self.wind_deg, self.wind_speed)
    }

    /// Both wind fields are present.
    pub fn has_wind(&self) -> bool {
        self.wind_speed.is_some() && self.wind_deg.is_some()
    }
}

/// Where to sample, and whether to account for traffic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AirQuery {
    pub lat: f64,
    pub lon: f64,
    pub busy_road: bool,
}

/// A type that can get outdoor air conditions.
pub trait AirSampler {
    /// Get a current sample for the given place.
    fn sample(&mut self, query: &AirQuery) -> Result<AirSample, Error>;
}

/// The nullary AirSampler: a sample with no data in it.
pub struct NullAirSampler {}

impl AirSampler for NullAirSampler {
    fn sample(&mut self, _query: &AirQuery) -> Result<AirSample, Error> {
        Ok(AirSample {
            timestamp: Utc::now(),
            ..Default::default()
        })
    }
}

/// Fake sampler: plays back a script of results, then repeats the last one.
pub struct FakeAirSampler {
    script: Vec<Result<AirSample, String>>,
    calls: usize,
    queries: Vec<AirQuery>,
}

impl FakeAirSampler {
    /// Always returns `sample`.
    pub fn steady(sample: AirSample) -> Self {
        Self::scripted(vec![Ok(sample)])
    }

    /// Returns each entry in turn; `Err` entries become upstream errors.
    pub fn scripted(script: Vec<Result<AirSample, String>>) -> Self {
        FakeAirSampler {
            script,
            calls: 0,
            queries: Vec::new(),
        }
    }

    /// Queries seen so far, oldest first.
    pub fn queries(&self) -> &[AirQuery] {
        &self.queries
    }
}

impl AirSampler for FakeAirSampler {
    fn sample(&mut self, query: &AirQuery) -> Result<AirSample, Error> {
        self.queries.push(*query);
        let idx = self.calls.min(self.script.len().saturating_sub(1));
        self.calls += 1;
        match self.script.get(idx) {
            Some(Ok(s)) => Ok(*s),
            Some(Err(e)) => Err(Error::Upstream(e.clone())),
            None => Err(Error::Upstream("no data scripted".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERE: AirQuery = AirQuery {
        lat: 39.7447,
        lon: -75.539787,
        busy_road: false,
    };

    #[test]
    fn null_sampler_has_no_data() {
        let s = NullAirSampler {}.sample(&HERE).expect("never fails");
        assert_eq!(s.pm25, None);
        assert_eq!(s.quality().severity(), 0.0);
        assert!(!s.has_wind());
        assert_eq!(s.wind(), WindVector::default());
    }

    #[test]
    fn fake_sampler_plays_script_then_repeats() {
        let good = AirSample {
            pm25: Some(8.0),
            ..Default::default()
        };
        let mut fake = FakeAirSampler::scripted(vec![Err("HTTP 502".to_owned()), Ok(good)]);
        assert!(matches!(fake.sample(&HERE), Err(Error::Upstream(_))));
        assert_eq!(fake.sample(&HERE).expect("scripted ok"), good);
        assert_eq!(fake.sample(&HERE).expect("repeats"), good);
        assert_eq!(fake.queries().len(), 3);

        let mut empty = FakeAirSampler::scripted(vec![]);
        assert!(empty.sample(&HERE).is_err());
    }
}
