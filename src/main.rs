use std::{
    fs,
    path::PathBuf,
    thread,
    time::Instant,
};

use anyhow::{bail, Context};
use clap::Parser;
use drape::{
    config::Config,
    image::Image,
    landmark::Landmarks,
    overlay::{Category, OverlayAsset},
    session::{Session, Status},
};

/// Composes a product overlay onto a face photo.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Photo to try the product on (png or jpeg)
    photo: PathBuf,

    /// Product image (png or jpeg, ideally with transparency)
    #[arg(long)]
    overlay: PathBuf,

    /// Product category (glasses, hat, shirt)
    #[arg(long)]
    category: String,

    /// JSON file with the face landmarks of the photo, as a list of normalized [x, y] pairs
    #[arg(long)]
    landmarks: PathBuf,

    /// Size multiplier (0.5 to 2.0)
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Vertical offset as a fraction of the photo height (-0.5 to 0.5)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset: f32,

    /// Do not adapt the product to the scene lighting
    #[arg(long, default_value_t = false)]
    no_lighting: bool,

    /// Number of redraw cycles (lets the lighting estimate settle)
    #[arg(long, default_value_t = 30)]
    frames: u32,

    /// Config file (overrides DRAPE_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the composed image (png or jpeg)
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    drape::init_logger!();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => Config::from_env(),
    };
    let redraw_interval = config.still_redraw_interval();

    let category: Category = args.category.parse()?;
    let photo = Image::load(&args.photo)
        .with_context(|| format!("failed to load photo '{}'", args.photo.display()))?;
    let mut overlay = OverlayAsset::load(&args.overlay, category)
        .with_context(|| format!("failed to load overlay '{}'", args.overlay.display()))?;
    overlay.set_user_scale(args.scale);
    overlay.set_user_vertical_offset(args.offset);

    let json = fs::read_to_string(&args.landmarks)
        .with_context(|| format!("failed to read '{}'", args.landmarks.display()))?;
    let landmarks: Option<Landmarks> =
        serde_json::from_str(&json).context("failed to parse landmarks")?;
    let landmarks = landmarks.filter(|lm| !lm.is_empty());
    if let Some(lm) = &landmarks {
        if !lm.is_complete() {
            log::warn!(
                "{} landmarks given, expected at least {}",
                lm.len(),
                Landmarks::NUM_LANDMARKS
            );
        }
    }

    let mut session = Session::new(photo.resolution(), config);
    if args.no_lighting {
        session.set_lighting_enabled(false);
    }
    session.set_overlay(Some(overlay));
    let token = session.upload_still(photo);
    session.on_results(landmarks);

    let start = Instant::now();
    for _ in 0..args.frames {
        if !session.run_cycle(&token, Instant::now()) {
            break;
        }
        thread::sleep(redraw_interval);
    }
    log::debug!("{} redraws took {:.1?}", args.frames, start.elapsed());

    match session.status() {
        Status::NoFace => log::warn!("no face in the photo, the product was not drawn"),
        status => log::info!("status: {status:?}"),
    }
    if let Some(placement) = session.last_placement() {
        log::info!("placement: {placement:?}");
    }
    log::info!("lighting: {:?}", session.lighting_state());

    if session.last_placement().is_none() && session.landmarks().is_some() {
        bail!("the product could not be fitted onto the face");
    }
    session
        .export(&args.output)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    Ok(())
}
