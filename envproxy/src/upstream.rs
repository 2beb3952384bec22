//! The proxy side of `/env`: fetch from OpenWeather and shape the response.
//!
//! OpenWeather has no CO2 data, so the proxy makes a rough outdoor estimate
//! from a background level, the wind speed (calm air lets traffic exhaust
//! pile up) and an optional "busy road" addend. See [estimate_co2].
//!
//! - `/data/2.5/air_pollution` returns `.list[0].components.pm2_5` (µg/m³)
//! - `/data/2.5/weather` returns `.wind.speed` (m/s) and `.wind.deg`

use serde::Deserialize;
use std::time::Duration;

use crate::{EnvQuery, EnvReading, Error, ErrorBody};

/// Background outdoor CO2, ppm.
pub const BACKGROUND_CO2_PPM: f32 = 420.0;
/// Accumulation term at 0 m/s wind; it falls off as 1/(1 + speed).
pub const CALM_CO2_PPM: f32 = 80.0;
/// Flat addend when the caller reports a busy road.
pub const BUSY_ROAD_CO2_PPM: f32 = 100.0;

/// Outdoor CO2 estimate. A missing wind speed counts as calm air.
pub fn estimate_co2(wind_speed: Option<f32>, busy: bool) -> f32 {
    let speed = wind_speed.filter(|s| s.is_finite()).unwrap_or(0.0).max(0.0);
    let busy = if busy { BUSY_ROAD_CO2_PPM } else { 0.0 };
    BACKGROUND_CO2_PPM + CALM_CO2_PPM / (1.0 + speed) + busy
}

#[derive(Deserialize, Default)]
struct AirPollution {
    #[serde(default)]
    list: Vec<AirPollutionEntry>,
}

#[derive(Deserialize)]
struct AirPollutionEntry {
    components: Components,
}

#[derive(Deserialize)]
struct Components {
    pm2_5: Option<f32>,
}

#[derive(Deserialize, Default)]
struct Weather {
    wind: Option<Wind>,
}

#[derive(Deserialize)]
struct Wind {
    speed: Option<f32>,
    deg: Option<f32>,
}

/// Pull PM2.5 out of an `air_pollution` body.
pub fn parse_pm25(body: &str) -> Result<Option<f32>, Error> {
    let v: AirPollution = serde_json::from_str(body).map_err(Error::Malformed)?;
    Ok(v.list.first().and_then(|e| e.components.pm2_5))
}

/// Pull `(speed, deg)` out of a `weather` body.
pub fn parse_wind(body: &str) -> Result<(Option<f32>, Option<f32>), Error> {
    let v: Weather = serde_json::from_str(body).map_err(Error::Malformed)?;
    Ok(v.wind.map(|w| (w.speed, w.deg)).unwrap_or((None, None)))
}

/// Assemble the `/env` body from the two upstream answers.
pub fn compose(pm25: Option<f32>, wind: (Option<f32>, Option<f32>), busy: bool) -> EnvReading {
    let (wind_speed, wind_deg) = wind;
    EnvReading {
        pm25,
        co2_ppm: Some(estimate_co2(wind_speed, busy)),
        wind_speed,
        wind_deg,
    }
}

/// Render the proxy's HTTP answer: a status code and a JSON body.
pub fn respond(result: &Result<EnvReading, Error>) -> (u16, String) {
    let (status, error) = match result {
        Ok(reading) => {
            return (
                200,
                serde_json::to_string(reading).unwrap_or_else(|_| "{}".to_owned()),
            )
        }
        Err(Error::MissingCoordinates) => (400, "Missing lat/lon"),
        Err(Error::Status { status, .. }) => (*status, "Failed to fetch from OpenWeather"),
        Err(_) => (500, "Internal fetch error"),
    };
    let body = ErrorBody {
        error: error.to_owned(),
    };
    (
        status,
        serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_owned()),
    )
}

/// Fetches from OpenWeather on behalf of `/env` callers.
pub struct OpenWeather {
    agent: ureq::Agent,
    base: String,
    api_key: String,
}

impl OpenWeather {
    pub const DEFAULT_BASE: &'static str = "https://api.openweathermap.org/data/2.5";
    pub const KEY_VAR: &'static str = "OPENWEATHER_API_KEY";
    pub const BASE_VAR: &'static str = "OPENWEATHER_BASE_URL";

    /// Key (and optionally base URL) from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Key (and optionally base URL) from an arbitrary key lookup. A missing
    /// or empty key is a [Error::Transport], which [respond] turns into a 500.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let key = get(Self::KEY_VAR)
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Transport(format!("{} is not set", Self::KEY_VAR)))?;
        let base = get(Self::BASE_VAR).unwrap_or_else(|| Self::DEFAULT_BASE.to_owned());
        Ok(Self::with_base(base, key))
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base(Self::DEFAULT_BASE, api_key)
    }

    pub fn with_base(base: impl Into<String>, api_key: impl Into<String>) -> Self {
        OpenWeather {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(10))
                .build(),
            base: base.into(),
            api_key: api_key.into(),
        }
    }

    /// Handle one `/env` query string end to end.
    pub fn handle(&self, query: &str) -> (u16, String) {
        let result = EnvQuery::parse(query).and_then(|q| self.reading(&q));
        if let Err(e) = &result {
            tracing::warn!("env request {:?} failed: {}", query, e);
        }
        respond(&result)
    }

    /// Fetch both upstream documents and compose a reading.
    pub fn reading(&self, query: &EnvQuery) -> Result<EnvReading, Error> {
        let pm25 = parse_pm25(&self.get("air_pollution", query)?)?;
        let wind = parse_wind(&self.get("weather", query)?)?;
        Ok(compose(pm25, wind, query.busy))
    }

    fn get(&self, path: &str, query: &EnvQuery) -> Result<String, Error> {
        let url = format!("{}/{}", self.base.trim_end_matches('/'), path);
        let resp = self
            .agent
            .get(&url)
            .query("lat", &query.lat.to_string())
            .query("lon", &query.lon.to_string())
            .query("appid", &self.api_key)
            .call();
        match resp {
            Ok(r) => r.into_string().map_err(|e| Error::Transport(e.to_string())),
            Err(ureq::Error::Status(status, r)) => Err(Error::Status {
                status,
                message: r.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(e)) => Err(Error::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn co2_calm_and_windy() {
        assert_eq!(estimate_co2(Some(0.0), false), 500.0);
        assert_eq!(estimate_co2(None, false), 500.0);
        assert_eq!(estimate_co2(Some(3.0), false), 440.0);
        assert_eq!(estimate_co2(Some(3.0), true), 540.0);
        // Negative speeds are clamped to calm.
        assert_eq!(estimate_co2(Some(-2.0), false), 500.0);
    }

    #[test]
    fn parse_air_pollution_body() {
        let body = r#"{"coord":{"lon":-75.5,"lat":39.7},"list":[{"main":{"aqi":2},
            "components":{"co":201.94,"pm2_5":12.5,"pm10":14.1},"dt":1700000000}]}"#;
        assert_eq!(parse_pm25(body).expect("should parse"), Some(12.5));
        assert_eq!(parse_pm25(r#"{"list":[]}"#).expect("should parse"), None);
        assert_eq!(parse_pm25("{}").expect("should parse"), None);
        assert!(parse_pm25("nope").is_err());
    }

    #[test]
    fn parse_weather_body() {
        let body = r#"{"weather":[],"wind":{"speed":4.1,"deg":250,"gust":6.2}}"#;
        assert_eq!(parse_wind(body).expect("should parse"), (Some(4.1), Some(250.0)));
        assert_eq!(parse_wind("{}").expect("should parse"), (None, None));
    }

    #[test]
    fn compose_keeps_nulls() {
        let r = compose(None, (None, Some(90.0)), false);
        assert_eq!(r.pm25, None);
        assert_eq!(r.co2_ppm, Some(500.0));
        assert_eq!(r.wind_speed, None);
        assert_eq!(r.wind_deg, Some(90.0));
    }

    #[test]
    fn respond_bodies() {
        let (status, body) = respond(&Err(Error::MissingCoordinates));
        assert_eq!(status, 400);
        assert_eq!(body, r#"{"error":"Missing lat/lon"}"#);

        let (status, body) = respond(&Err(Error::Status {
            status: 401,
            message: "bad key".to_owned(),
        }));
        assert_eq!(status, 401);
        assert_eq!(body, r#"{"error":"Failed to fetch from OpenWeather"}"#);

        let (status, _) = respond(&Err(Error::Transport("dns".to_owned())));
        assert_eq!(status, 500);

        let (status, body) = respond(&Ok(compose(Some(8.0), (Some(1.0), Some(10.0)), false)));
        assert_eq!(status, 200);
        let back = crate::decode_response(status, &body).expect("should decode");
        assert_eq!(back.pm25, Some(8.0));
        assert_eq!(back.co2_ppm, Some(460.0));
    }

    #[test]
    fn key_from_lookup() {
        let err = OpenWeather::from_lookup(|_| None).err();
        assert!(matches!(err, Some(Error::Transport(_))));
        let (status, body) = respond(&Err(err.expect("checked above")));
        assert_eq!(status, 500);
        assert_eq!(body, r#"{"error":"Internal fetch error"}"#);

        let blank = OpenWeather::from_lookup(|k| (k == OpenWeather::KEY_VAR).then(|| " ".to_owned()));
        assert!(blank.is_err());

        let ow = OpenWeather::from_lookup(|k| match k {
            "OPENWEATHER_API_KEY" => Some("abc123".to_owned()),
            "OPENWEATHER_BASE_URL" => Some("http://127.0.0.1:9".to_owned()),
            _ => None,
        })
        .expect("key is set");
        assert_eq!(ow.api_key, "abc123");
        assert_eq!(ow.base, "http://127.0.0.1:9");

        let ow = OpenWeather::from_lookup(|k| (k == OpenWeather::KEY_VAR).then(|| "k".to_owned()))
            .expect("key is set");
        assert_eq!(ow.base, OpenWeather::DEFAULT_BASE);
    }

    #[test]
    fn handle_rejects_missing_coordinates_without_network() {
        let ow = OpenWeather::with_base("http://127.0.0.1:9", "key");
        let (status, _) = ow.handle("lon=3");
        assert_eq!(status, 400);
    }
}
