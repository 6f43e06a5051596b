use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use framefx::{
    Affine, Camera, CpuRenderer, FrameContext, HoldBlendParams, HoldStage, Rect, RenderSurface,
    SamplerOpts, Scene, Stage as _, StageInput, StageSlot, SurfaceSize, TargetMode, TrackerOpts,
    TrackingOpts, TrackingStage,
};

#[derive(Parser, Debug)]
#[command(name = "framefx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Track salient points in an image and print them as JSON.
    Track(TrackArgs),
    /// Run the hold effect over a scrolling image and write the last frame as a PNG.
    Hold(HoldArgs),
}

#[derive(Parser, Debug)]
struct TrackArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Number of point slots.
    #[arg(long, default_value_t = 4)]
    count: usize,

    /// Brightness cutoff in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    threshold: f32,

    /// Track dark regions instead of bright ones.
    #[arg(long, default_value_t = false)]
    invert: bool,

    /// Minimum distance between points, in analysis pixels.
    #[arg(long, default_value_t = 8.0)]
    min_separation: f32,

    /// Side of the square analysis surface.
    #[arg(long)]
    analysis_size: Option<u32>,

    /// Optional PNG path for the image with markers drawn.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct HoldArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Frames to run.
    #[arg(long, default_value_t = 30)]
    frames: u64,

    /// Horizontal scroll per frame, in pixels.
    #[arg(long, default_value_t = 2.0)]
    shift: f64,

    /// Capture the scene instead of feeding the image directly.
    #[arg(long, default_value_t = false)]
    global: bool,

    /// Preference for the previous frame where change is small.
    #[arg(long, default_value_t = 0.9)]
    hold_strength: f32,

    /// Change magnitude below which holding kicks in.
    #[arg(long, default_value_t = 0.1)]
    threshold: f32,

    /// Fraction of the source leaking back every frame.
    #[arg(long, default_value_t = 0.02)]
    decay: f32,
}

#[derive(serde::Serialize)]
struct PointOut {
    slot: usize,
    active: bool,
    x: f64,
    y: f64,
    u: f64,
    v: f64,
    score: f32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Track(args) => cmd_track(args),
        Command::Hold(args) => cmd_hold(args),
    }
}

fn cmd_track(args: TrackArgs) -> anyhow::Result<()> {
    let src = load_surface(&args.in_path)?;
    let size = src.size();
    let aspect = size.aspect();

    let tracker = TrackerOpts::default()
        .with_count(args.count)
        .with_threshold(args.threshold)
        .with_min_separation(args.min_separation)
        .with_mode(TargetMode::Brightness {
            invert: args.invert,
        });
    let mut sampler = SamplerOpts::default();
    if let Some(side) = args.analysis_size {
        sampler = sampler.with_size(side);
    }
    let mut stage = TrackingStage::new(
        TrackingOpts::default()
            .with_tracker(tracker)
            .with_sampler(sampler),
    );

    let mut renderer = CpuRenderer::default();
    let mut ctx = FrameContext::with_renderer(&mut renderer);
    stage
        .render_frame(&mut ctx, &StageInput::external(&src, size))
        .with_context(|| format!("track points in '{}'", args.in_path.display()))?;

    if let Some(out) = &args.out {
        let image = stage.output().context("tracking produced no image")?;
        save_surface(image, out)?;
        eprintln!("wrote {}", out.display());
    }

    let points: Vec<PointOut> = stage
        .points()
        .iter()
        .enumerate()
        .map(|(slot, p)| {
            let uv = p.uv(aspect);
            PointOut {
                slot,
                active: p.is_active(),
                x: p.position().x,
                y: p.position().y,
                u: uv.x,
                v: uv.y,
                score: p.score(),
            }
        })
        .collect();
    stage.dispose();
    println!("{}", serde_json::to_string_pretty(&points)?);
    Ok(())
}

fn cmd_hold(args: HoldArgs) -> anyhow::Result<()> {
    let src = load_surface(&args.in_path)?;
    let size = src.size();
    let params = HoldBlendParams {
        hold_strength: args.hold_strength,
        threshold: args.threshold,
        decay: args.decay,
    };
    let mut slot = StageSlot::new(Box::new(HoldStage::new(params)));
    let mut renderer = CpuRenderer::default();

    if args.global {
        let rect = Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height));
        let mut scene = Scene::new();
        let backdrop = scene.push_surface(rect, &src)?;
        let blank = RenderSurface::with_size(size);
        let own = scene.push_surface(rect, &blank)?;
        tracing::debug!(backdrop = backdrop.0, own = own.0, "built scene");

        for frame in 0..args.frames {
            let dx = scroll(args.shift, frame, size);
            let camera = Camera::new(Affine::translate((dx, 0.0)));
            let mut ctx = FrameContext::new(&mut renderer, &mut scene, &camera).at_frame(frame);
            let out = slot.render_frame(&mut ctx, &StageInput::global(size, Some(own)));
            if out.degraded {
                tracing::warn!(frame, "hold frame degraded");
            }
        }
    } else {
        for frame in 0..args.frames {
            let dx = scroll(args.shift, frame, size);
            let shifted = scrolled(&src, dx.round() as i64);
            let mut ctx = FrameContext::with_renderer(&mut renderer).at_frame(frame);
            let out = slot.render_frame(&mut ctx, &StageInput::external(&shifted, size));
            if out.degraded {
                tracing::warn!(frame, "hold frame degraded");
            }
        }
    }

    let image = slot.output().context("hold produced no image")?;
    save_surface(image, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn scroll(shift: f64, frame: u64, size: SurfaceSize) -> f64 {
    (shift * frame as f64).rem_euclid(f64::from(size.width))
}

/// Copy of `src` rotated right by `dx` pixels, wrapping around.
fn scrolled(src: &RenderSurface, dx: i64) -> RenderSurface {
    let mut out = RenderSurface::with_size(src.size());
    let w = i64::from(src.width());
    for y in 0..src.height() {
        for x in 0..src.width() {
            let sx = (i64::from(x) - dx).rem_euclid(w) as u32;
            out.set_pixel(x, y, src.pixel(sx, y));
        }
    }
    out
}

fn load_surface(path: &Path) -> anyhow::Result<RenderSurface> {
    let img = image::open(path)
        .with_context(|| format!("open image '{}'", path.display()))?
        .to_rgba8();
    Ok(RenderSurface::from_rgba_image(&img)?)
}

fn save_surface(surface: &RenderSurface, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    surface
        .to_rgba_image()?
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}
