//! The camera app.
//!
//! Usage: greenmiles [air|tree] [camera-image]
//!
//! Without a camera image, frames come from a synthetic gradient. With the
//! `simulator` feature the view opens in a window (keys: S snapshot,
//! M measure, C calculate, X clear, A auto FOV, H hide controls, Q quit);
//! otherwise it runs headless for a few seconds and saves one snapshot.
//!
//! Tree inputs come from `GREENMILES_DISTANCE_CM`, `GREENMILES_HFOV_DEG`
//! (a number, or `auto`), `GREENMILES_SPECIES` and `GREENMILES_LIGHT_FACTOR`.

use embedded_graphics::geometry::Size;
use envproxy::{ClientSettings, EnvClient};
use greenmiles::{
    context::Context,
    device::{Facing, FakeFrameSource, FixedLocator, FrameSource, ImageFileSource, Locator, Position},
    refresh::{self, Latest},
    settings::Settings,
    view::{AirView, TreeView},
};
use rand::{rngs::StdRng, SeedableRng};

#[cfg(not(feature = "simulator"))]
use greenmiles::view::Input;

fn camera(path: Option<String>, size: Size) -> Box<dyn FrameSource> {
    match path.map(|p| ImageFileSource::open(p, Facing::Rear)) {
        Some(Ok(source)) => Box::new(source),
        Some(Err(e)) => {
            tracing::warn!("{}; using a synthetic camera", e);
            Box::new(FakeFrameSource::new(size.width, size.height))
        }
        None => Box::new(FakeFrameSource::new(size.width, size.height)),
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("bad settings: {}", e);
            std::process::exit(2);
        }
    };
    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "air".to_owned());
    let mut camera = camera(args.next(), settings.view);

    let ctx = Context::new();
    {
        let ctx = ctx.clone();
        ctrlc::set_handler(move || {
            tracing::info!("got SIGINT, closing context");
            ctx.cancel();
        })
        .expect("could not set SIGINT handler");
    }

    #[cfg(feature = "simulator")]
    let mut screen = greenmiles::simulator::SimScreen::new(settings.view, "Green Miles");

    // Let the first sample land, then take a picture.
    #[cfg(not(feature = "simulator"))]
    let mut screen = {
        let warmup = (settings.fps * 3) as usize;
        let mut script = vec![Vec::new(); warmup];
        script.push(vec![Input::Snapshot]);
        greenmiles::HeadlessScreen::scripted(settings.view, script)
    };

    match mode.as_str() {
        "tree" => {
            let mut view = TreeView::new(settings.view)
                .with_params(settings.tree)
                .with_jpeg_quality(settings.jpeg_quality);
            if settings.auto_fov {
                view = view.with_auto_fov();
            }
            greenmiles::run(&ctx, &settings, &mut screen, &mut camera, &mut view, None);
        }
        "air" => {
            let position = settings
                .location
                .and_then(|(lat, lon)| Position::new(lat, lon).ok());
            let mut view = AirView::new(settings.view, StdRng::from_os_rng())
                .with_busy_road(settings.busy_road)
                .with_jpeg_quality(settings.jpeg_quality);
            view.locate(FixedLocator::new(position).locate());

            let mut client =
                match EnvClient::new(ClientSettings::with_endpoint(&settings.proxy_url)) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::error!("bad proxy URL {}: {}", settings.proxy_url, e);
                        std::process::exit(2);
                    }
                };
            let latest = Latest::new();
            std::thread::scope(|s| {
                if let Some(query) = view.query() {
                    let (ctx, latest, period) = (&ctx, &latest, settings.refresh);
                    s.spawn(move || refresh::poll_air(ctx, &mut client, query, period, latest));
                }
                greenmiles::run(&ctx, &settings, &mut screen, &mut camera, &mut view, Some(&latest));
                ctx.cancel();
            });
        }
        other => {
            tracing::error!("unknown view {:?}; expected air or tree", other);
            std::process::exit(1);
        }
    }

    tracing::info!("shut down");
}
