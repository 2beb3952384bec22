//! Air samples from the `/env` proxy.

use chrono::Utc;
use envproxy::{EnvClient, EnvQuery, EnvReading};

use super::{AirQuery, AirSample, AirSampler};
use crate::Error;

impl From<&AirQuery> for EnvQuery {
    fn from(q: &AirQuery) -> Self {
        EnvQuery {
            lat: q.lat,
            lon: q.lon,
            busy: q.busy_road,
        }
    }
}

impl From<EnvReading> for AirSample {
    fn from(r: EnvReading) -> Self {
        AirSample {
            timestamp: Utc::now(),
            pm25: r.pm25,
            co2_ppm: r.co2_ppm,
            wind_speed: r.wind_speed,
            wind_deg: r.wind_deg,
        }
    }
}

impl AirSampler for EnvClient {
    fn sample(&mut self, query: &AirQuery) -> Result<AirSample, Error> {
        let reading = self.fetch(&query.into())?;
        tracing::info!(
            "env at {:.4},{:.4}: pm2.5 {:?} co2 {:?}",
            query.lat,
            query.lon,
            reading.pm25,
            reading.co2_ppm
        );
        Ok(reading.into())
    }
}
