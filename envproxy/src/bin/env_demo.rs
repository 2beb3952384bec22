//! Demo of polling the `/env` proxy.
//!
//! Usage: env_demo <endpoint> <lat> <lon> [busy]
//!
//! With `direct` as the endpoint, skips the proxy and asks OpenWeather,
//! using the key in `OPENWEATHER_API_KEY`.

use envproxy::{upstream::OpenWeather, ClientSettings, EnvClient, EnvQuery, EnvReading, Error};
use std::thread;
use std::time::Duration;

const PERIOD: Duration = Duration::from_secs(30);

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <endpoint> <lat> <lon> [busy]", args[0]);
        std::process::exit(1);
    }
    let query = EnvQuery {
        lat: args[2].parse().expect("lat should be a number"),
        lon: args[3].parse().expect("lon should be a number"),
        busy: args.get(4).is_some_and(|v| v == "busy"),
    };
    let fetch: Box<dyn Fn(&EnvQuery) -> Result<EnvReading, Error>> = if args[1] == "direct" {
        let upstream = OpenWeather::from_env().expect("could not set up OpenWeather");
        Box::new(move |q| upstream.reading(q))
    } else {
        let client = EnvClient::new(ClientSettings::with_endpoint(&args[1]))
            .expect("could not create client");
        Box::new(move |q| client.fetch(q))
    };

    for _ in 0..5 {
        match fetch(&query) {
            Ok(r) => println!(
                "pm2.5: {:?} co2: {:?} wind: {:?} m/s @ {:?}",
                r.pm25, r.co2_ppm, r.wind_speed, r.wind_deg
            ),
            Err(e) => println!("error: {}", e),
        }
        thread::sleep(PERIOD);
    }
}
