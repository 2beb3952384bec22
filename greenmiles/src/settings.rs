//! Runtime settings.
//!
//! Defaults match the mobile prototype; `GREENMILES_*` environment variables
//! override them for the binaries.

use std::{path::PathBuf, time::Duration};

use embedded_graphics::geometry::Size;

use crate::{trunk::TrunkParams, Error};

/// Settings for the air-quality camera view.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Settings {
    /// Full URL of the `/env` proxy endpoint.
    pub proxy_url: String,
    /// How often to re-fetch the air sample.
    pub refresh: Duration,
    /// Fixed position to report in place of a GPS fix.
    pub location: Option<(f64, f64)>,
    /// Ask the proxy to add the busy-road CO2 term.
    pub busy_road: bool,
    /// Size of the on-screen view.
    pub view: Size,
    /// Target frame rate of the animation.
    pub fps: u32,
    /// Quality for JPEG snapshots, 1 to 100.
    pub jpeg_quality: u8,
    /// Where snapshots go.
    pub export_dir: PathBuf,
    /// Starting inputs of the tree view.
    pub tree: TrunkParams,
    /// Pick the tree view's field of view from the screen shape.
    pub auto_fov: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_url: "http://127.0.0.1:3000/env".to_owned(),
            refresh: Duration::from_secs(30),
            location: None,
            busy_road: false,
            view: Size::new(360, 640),
            fps: 60,
            jpeg_quality: 92,
            export_dir: PathBuf::from("."),
            tree: TrunkParams::default(),
            auto_fov: false,
        }
    }
}

impl Settings {
    /// Defaults, overridden from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Defaults, overridden from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut s = Self::default();
        if let Some(url) = get("GREENMILES_PROXY_URL") {
            s.proxy_url = url;
        }
        if let Some(secs) = get("GREENMILES_REFRESH_SECS") {
            let secs: u64 = parse("GREENMILES_REFRESH_SECS", &secs)?;
            if secs == 0 {
                return Err(Error::invalid("GREENMILES_REFRESH_SECS must be positive"));
            }
            s.refresh = Duration::from_secs(secs);
        }
        match (get("GREENMILES_LAT"), get("GREENMILES_LON")) {
            (Some(lat), Some(lon)) => {
                let lat: f64 = parse("GREENMILES_LAT", &lat)?;
                let lon: f64 = parse("GREENMILES_LON", &lon)?;
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err(Error::invalid(format!("position {lat},{lon} out of range")));
                }
                s.location = Some((lat, lon));
            }
            (None, None) => {}
            _ => return Err(Error::invalid("GREENMILES_LAT and GREENMILES_LON go together")),
        }
        if let Some(busy) = get("GREENMILES_BUSY_ROAD") {
            s.busy_road = matches!(busy.as_str(), "1" | "true" | "yes");
        }
        if let Some(fps) = get("GREENMILES_FPS") {
            s.fps = parse::<u32>("GREENMILES_FPS", &fps)?.clamp(1, 120);
        }
        if let Some(q) = get("GREENMILES_JPEG_QUALITY") {
            s.jpeg_quality = parse::<u8>("GREENMILES_JPEG_QUALITY", &q)?.clamp(1, 100);
        }
        if let Some(dir) = get("GREENMILES_EXPORT_DIR") {
            s.export_dir = PathBuf::from(dir);
        }

        let tree = s.tree;
        let mut distance = tree.distance_cm();
        let mut species = tree.species();
        let mut light = tree.light_factor();
        let mut hfov = tree.hfov_deg();
        if let Some(d) = get("GREENMILES_DISTANCE_CM") {
            distance = parse("GREENMILES_DISTANCE_CM", &d)?;
        }
        if let Some(sp) = get("GREENMILES_SPECIES") {
            species = sp.parse()?;
        }
        if let Some(l) = get("GREENMILES_LIGHT_FACTOR") {
            light = parse("GREENMILES_LIGHT_FACTOR", &l)?;
        }
        match get("GREENMILES_HFOV_DEG").as_deref().map(str::trim) {
            Some("auto") => s.auto_fov = true,
            Some(v) => hfov = parse("GREENMILES_HFOV_DEG", v)?,
            None => {}
        }
        s.tree = TrunkParams::new(distance, hfov, species, light)?;
        Ok(s)
    }

    /// Time budget of one animation frame.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid(format!("{key}: cannot parse {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let s = Settings::from_lookup(lookup(&[])).expect("defaults are valid");
        assert_eq!(s.refresh, Duration::from_secs(30));
        assert_eq!(s.jpeg_quality, 92);
        assert_eq!(s.location, None);
        assert_eq!(s.frame_period(), Duration::from_secs(1) / 60);
    }

    #[test]
    fn overrides() {
        let s = Settings::from_lookup(lookup(&[
            ("GREENMILES_LAT", "39.7447"),
            ("GREENMILES_LON", "-75.539787"),
            ("GREENMILES_BUSY_ROAD", "1"),
            ("GREENMILES_REFRESH_SECS", "5"),
            ("GREENMILES_JPEG_QUALITY", "250"),
        ]))
        .expect("should parse");
        assert_eq!(s.location, Some((39.7447, -75.539787)));
        assert!(s.busy_road);
        assert_eq!(s.refresh, Duration::from_secs(5));
        assert_eq!(s.jpeg_quality, 100);
    }

    #[test]
    fn tree_inputs_are_clamped() {
        let s = Settings::from_lookup(lookup(&[
            ("GREENMILES_DISTANCE_CM", "20"),
            ("GREENMILES_HFOV_DEG", "180"),
            ("GREENMILES_SPECIES", "Conifer"),
            ("GREENMILES_LIGHT_FACTOR", "1.1"),
        ]))
        .expect("should parse");
        assert_eq!(s.tree.distance_cm(), 50.0);
        assert_eq!(s.tree.hfov_deg(), 90.0);
        assert_eq!(s.tree.species(), crate::trunk::Species::Conifer);
        assert_eq!(s.tree.light_factor(), 1.1);
        assert!(!s.auto_fov);

        let s = Settings::from_lookup(lookup(&[("GREENMILES_HFOV_DEG", "auto")]))
            .expect("should parse");
        assert!(s.auto_fov);
        assert_eq!(s.tree, TrunkParams::default());

        assert!(Settings::from_lookup(lookup(&[("GREENMILES_SPECIES", "oak")])).is_err());
    }

    #[test]
    fn rejects_half_a_position() {
        let e = Settings::from_lookup(lookup(&[("GREENMILES_LAT", "1")])).unwrap_err();
        assert!(matches!(e, Error::InvalidInput(_)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Settings::from_lookup(lookup(&[("GREENMILES_FPS", "fast")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("GREENMILES_REFRESH_SECS", "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[
            ("GREENMILES_LAT", "91"),
            ("GREENMILES_LON", "0")
        ]))
        .is_err());
    }
}
