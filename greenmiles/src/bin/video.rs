//! Renders a clip of the particle field for a fixed reading.
//!
//! Usage: video <pm25> <co2> <wind-deg> <wind-speed> [output.webp]
//!
//! Any reading may be `-` for "no data".

use std::path::{Path, PathBuf};

use greenmiles::{
    atmosphere::AirSample, context::Context, field::ParticleField, settings::Settings,
};
use image::RgbaImage;
use rand::{rngs::StdRng, SeedableRng};
use tempfile::NamedTempFile;

const SEED: u64 = 0x6d17e5;
const SECONDS: u32 = 10;

/// Simulate the whole clip, saving only the (offset)th frames of
/// (parallel_count). Every worker runs the same seeded field, so the frames
/// agree no matter which worker saves them.
fn make_frames(
    ctx: &Context,
    sample: &AirSample,
    settings: &Settings,
    offset: u32,
    parallel_count: u32,
    outdir: &Path,
) -> Result<(), greenmiles::Error> {
    let size = settings.view;
    let mut field = ParticleField::new(size.width, size.height);
    field.sync(&sample.quality(), &sample.wind(), &mut StdRng::seed_from_u64(SEED));
    let mut overlay = RgbaImage::new(size.width, size.height);
    let backdrop = RgbaImage::from_pixel(size.width, size.height, image::Rgba([0x11, 0x11, 0x11, 0xFF]));

    let total = settings.fps * SECONDS;
    for i in 0..total {
        if ctx.is_cancelled() {
            break;
        }
        let t = i as f32 / settings.fps as f32;
        field.step(t);
        if i % parallel_count != offset {
            continue;
        }
        field.render(&mut overlay, t);
        let mut frame = backdrop.clone();
        image::imageops::overlay(&mut frame, &overlay, 0, 0);
        frame.save(outdir.join(format!("{i:04}.png")))?;
    }
    Ok(())
}

fn reading(arg: Option<String>) -> Option<f32> {
    arg.filter(|a| a != "-").and_then(|a| match a.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring unreadable value {:?}", a);
            None
        }
    })
}

pub fn main() {
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env().expect("invalid settings");
    let mut args = std::env::args().skip(1);
    let sample = AirSample {
        pm25: reading(args.next()),
        co2_ppm: reading(args.next()),
        wind_deg: reading(args.next()),
        wind_speed: reading(args.next()),
        ..Default::default()
    };
    let destination = args.next().map(PathBuf::from);

    let outfile = {
        let outfile = NamedTempFile::with_suffix(".webp").unwrap();
        outfile.path().to_owned()
    };
    let ctx = Context::new();
    {
        let ctx = ctx.clone();
        ctrlc::set_handler(move || {
            tracing::info!("got SIGINT, closing context");
            ctx.cancel();
        })
        .expect("could not set SIGINT handler");
    }

    let output = tempfile::Builder::new().keep(false).tempdir().unwrap();

    let n: u32 = num_cpus::get().try_into().unwrap();
    tracing::info!(
        "rendering {}s at {} fps, severity {:.2}, on {} threads",
        SECONDS,
        settings.fps,
        sample.quality().severity(),
        n
    );
    std::thread::scope(|scope| {
        for i in 0u32..n {
            let (ctx, sample, settings) = (&ctx, &sample, &settings);
            let outdir = output.path();
            scope.spawn(move || {
                if let Err(e) = make_frames(ctx, sample, settings, i, n, outdir) {
                    tracing::error!("worker {} failed: {}", i, e);
                    ctx.cancel();
                }
            });
        }
    });
    if ctx.is_cancelled() {
        tracing::error!("cancelled before all frames were written");
        std::process::exit(1);
    }

    tracing::info!("output frames in {}", output.path().display());
    let c = std::process::Command::new("ffmpeg")
        .arg("-r")
        .arg(settings.fps.to_string())
        .arg("-i")
        .arg(format!("{}/%04d.png", output.path().display()))
        .arg("-loop")
        .arg("0")
        .arg("-lossless")
        .arg("1")
        .arg("-y")
        .arg(&outfile)
        .output()
        .expect("could not run ffmpeg");
    if !c.status.success() {
        tracing::error!("ffmpeg failed: {}", c.status);
        if let Ok(s) = std::str::from_utf8(&c.stderr) {
            tracing::error!("ffmpeg output: {}", s);
        }
        std::process::exit(2);
    }
    if let Some(p) = destination {
        std::fs::copy(&outfile, &p).expect("could not copy to destination");
        tracing::info!("video in {}", p.display());
    } else {
        tracing::info!("video in {}", outfile.display());
    }
}
