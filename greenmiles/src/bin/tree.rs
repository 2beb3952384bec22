//! Estimate a tree's gas exchange from two trunk edges.
//!
//! Usage:
//!   tree <x0> <y0> <x1> <y1> [--width px] [--distance cm] [--fov deg]
//!        [--species generic|broadleaf|conifer|fast] [--light factor]
//!        [--image photo] [--out dir]
//!
//! Prints the estimate as JSON. With `--image`, the points are in the photo's
//! pixels, and an annotated report is saved to `--out` (default: here).

use std::path::PathBuf;

use embedded_graphics::geometry::Size;
use greenmiles::{
    device::{Facing, FrameSource, ImageFileSource},
    trunk::{PixelPoint, Species, TrunkParams, DEFAULT_HFOV_DEG},
    view::{Input, TreeView, View},
    Error,
};

struct Args {
    p0: PixelPoint,
    p1: PixelPoint,
    width: Option<f64>,
    distance_cm: f64,
    hfov_deg: Option<f64>,
    species: Species,
    light_factor: f64,
    image: Option<PathBuf>,
    out: PathBuf,
}

fn number(name: &str, v: Option<String>) -> Result<f64, Error> {
    let v = v.ok_or_else(|| Error::invalid(format!("missing {name}")))?;
    v.parse()
        .map_err(|_| Error::invalid(format!("{name}: not a number: {v:?}")))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, Error> {
    let mut coords = Vec::new();
    let mut a = Args {
        p0: PixelPoint::new(0.0, 0.0),
        p1: PixelPoint::new(0.0, 0.0),
        width: None,
        distance_cm: 200.0,
        hfov_deg: None,
        species: Species::default(),
        light_factor: 1.0,
        image: None,
        out: PathBuf::from("."),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--width" => a.width = Some(number("width", args.next())?),
            "--distance" => a.distance_cm = number("distance", args.next())?,
            "--fov" => a.hfov_deg = Some(number("fov", args.next())?),
            "--light" => a.light_factor = number("light", args.next())?,
            "--species" => {
                a.species = args
                    .next()
                    .ok_or_else(|| Error::invalid("missing species"))?
                    .parse()?
            }
            "--image" => a.image = args.next().map(PathBuf::from),
            "--out" => a.out = args.next().map(PathBuf::from).unwrap_or(a.out),
            _ => coords.push(number("coordinate", Some(arg))?),
        }
    }
    let [x0, y0, x1, y1] = coords[..] else {
        return Err(Error::invalid(format!(
            "need four coordinates, got {}",
            coords.len()
        )));
    };
    a.p0 = PixelPoint::new(x0, y0);
    a.p1 = PixelPoint::new(x1, y1);
    Ok(a)
}

fn run(args: Args) -> Result<(), Error> {
    let mut camera = args
        .image
        .as_ref()
        .map(|p| ImageFileSource::open(p, Facing::Rear))
        .transpose()?;
    let frame = camera.as_mut().map(|c| c.frame()).transpose()?;

    let width = match (args.width, &frame) {
        (Some(w), _) => w,
        (None, Some(f)) => f.width() as f64,
        (None, None) => return Err(Error::invalid("--width or --image is needed")),
    };
    let height = frame.as_ref().map(|f| f.height()).unwrap_or(width as u32);
    let hfov = args.hfov_deg.unwrap_or(DEFAULT_HFOV_DEG);
    let params = TrunkParams::new(args.distance_cm, hfov, args.species, args.light_factor)?;

    let mut view = TreeView::new(Size::new(width as u32, height)).with_params(params);
    view.handle(Input::Measure);
    for p in [args.p0, args.p1] {
        view.handle(Input::Tap(embedded_graphics::geometry::Point::new(
            p.x.round() as i32,
            p.y.round() as i32,
        )));
    }
    // Taps land on whole pixels; estimate from the exact points.
    let result = greenmiles::trunk::estimate(args.p0, args.p1, width, &params)?;
    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| Error::invalid(format!("could not encode result: {e}")))?;
    println!("{json}");

    if let Some(frame) = frame {
        view.handle(Input::Calculate);
        if let Some(e) = view.error() {
            return Err(Error::invalid(e.to_owned()));
        }
        view.draw(Some(&frame), 0.0, 1.0);
        let path = view.snapshot(Some(&frame))?.save(&args.out)?;
        tracing::info!("report in {}", path.display());
    }
    if let Some(mut c) = camera {
        c.stop();
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    let result = parse_args(std::env::args().skip(1)).and_then(run);
    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
