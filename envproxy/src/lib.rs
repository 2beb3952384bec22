//! Client for the `/env` air and weather proxy.
//!
//! The proxy answers `GET /env?lat=<f>&lon=<f>[&busy=1]` with
//! `{pm25, co2_ppm, wind_speed, wind_deg}`, any of which may be null,
//! or with `{error}` and a non-2xx status.
//!
//! The [upstream] module holds the proxy's side of the exchange:
//! decoding OpenWeather payloads and shaping the response.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod upstream;

/// An error in talking to the proxy (or, for the proxy, to its upstream).
#[derive(Debug)]
pub enum Error {
    /// The request never produced an HTTP response.
    Transport(String),
    /// The server answered with a non-2xx status.
    Status { status: u16, message: String },
    /// The body was not the JSON we expected.
    Malformed(serde_json::Error),
    /// The query had no usable lat/lon.
    MissingCoordinates,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Transport(s) => write!(f, "request failed: {}", s),
            Error::Status { status, message } => write!(f, "HTTP {}: {}", status, message),
            Error::Malformed(e) => write!(f, "malformed response body: {}", e),
            Error::MissingCoordinates => write!(f, "Missing lat/lon"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

/// Body of a successful `/env` response.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvReading {
    /// Fine particulate matter, µg/m³.
    #[serde(default)]
    pub pm25: Option<f32>,
    /// Estimated outdoor CO2 concentration, ppm.
    #[serde(default)]
    pub co2_ppm: Option<f32>,
    /// Wind speed, m/s.
    #[serde(default)]
    pub wind_speed: Option<f32>,
    /// Direction the wind blows *from*, compass degrees.
    #[serde(default)]
    pub wind_deg: Option<f32>,
}

/// Body of a failed `/env` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// What to ask the proxy for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvQuery {
    pub lat: f64,
    pub lon: f64,
    /// Near a busy road: the proxy adds a flat CO2 term.
    pub busy: bool,
}

impl EnvQuery {
    /// Query-string pairs, in the order the proxy documents them.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut v = vec![("lat", self.lat.to_string()), ("lon", self.lon.to_string())];
        if self.busy {
            v.push(("busy", "1".to_owned()));
        }
        v
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn parse(query: &str) -> Result<Self, Error> {
        let mut lat = None;
        let mut lon = None;
        let mut busy = false;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            match k {
                "lat" => lat = v.parse::<f64>().ok().filter(|v| v.is_finite()),
                "lon" => lon = v.parse::<f64>().ok().filter(|v| v.is_finite()),
                "busy" => busy = v == "1" || v == "true",
                _ => {}
            }
        }
        match (lat, lon) {
            (Some(lat), Some(lon)) => Ok(EnvQuery { lat, lon, busy }),
            _ => Err(Error::MissingCoordinates),
        }
    }
}

/// Settings for an [EnvClient].
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Full URL of the `/env` endpoint.
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3000/env".to_owned(),
            timeout: Duration::from_secs(8),
        }
    }
}

impl ClientSettings {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }
}

/// Blocking client for the `/env` proxy.
pub struct EnvClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl EnvClient {
    pub fn new(settings: ClientSettings) -> Result<Self, Error> {
        if !settings.endpoint.starts_with("http://") && !settings.endpoint.starts_with("https://")
        {
            return Err(Error::Transport(format!(
                "endpoint must be an http(s) URL, got {:?}",
                settings.endpoint
            )));
        }
        let agent = ureq::AgentBuilder::new().timeout(settings.timeout).build();
        Ok(EnvClient {
            agent,
            endpoint: settings.endpoint,
        })
    }

    /// Fetch the current reading for a location.
    pub fn fetch(&self, query: &EnvQuery) -> Result<EnvReading, Error> {
        let mut request = self.agent.get(&self.endpoint);
        for (k, v) in query.pairs() {
            request = request.query(k, &v);
        }
        tracing::debug!("GET {} {:?}", self.endpoint, query);
        match request.call() {
            Ok(resp) => {
                let status = resp.status();
                let body = resp
                    .into_string()
                    .map_err(|e| Error::Transport(e.to_string()))?;
                decode_response(status, &body)
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                decode_response(status, &body)
            }
            Err(ureq::Error::Transport(e)) => Err(Error::Transport(e.to_string())),
        }
    }
}

/// Interpret a proxy response.
///
/// Non-2xx statuses become [Error::Status], carrying the `{error}` message
/// when the body has one.
pub fn decode_response(status: u16, body: &str) -> Result<EnvReading, Error> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_owned());
        return Err(Error::Status { status, message });
    }
    serde_json::from_str(body).map_err(Error::Malformed)
}
