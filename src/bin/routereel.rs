use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use routereel::{
    Canvas, ExportConfig, ExportHost, ExportProgress, ExportRenderer, Exporter, GeoPoint,
    GlobeRenderer, GlobeRendererOpts, Progress, RouteSettings, Tier, great_circle_arc,
    route::geo::DEFAULT_ARC_STEPS,
};

#[derive(Parser, Debug)]
#[command(name = "routereel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame of a route as a PNG.
    Frame(FrameArgs),
    /// Export the route animation (video when `ffmpeg` is available, else a PNG archive).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct RouteArgs {
    /// Origin as `lat,lng` in degrees.
    #[arg(long, value_parser = parse_geo, allow_hyphen_values = true)]
    from: GeoPoint,

    /// Destination as `lat,lng` in degrees.
    #[arg(long, value_parser = parse_geo, allow_hyphen_values = true)]
    to: GeoPoint,

    /// Peak height of the route arc in km (clamped to 50..=3000).
    #[arg(long, default_value_t = 800.0)]
    arc_height: f64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    route: RouteArgs,

    /// Position along the route in `[0, 1]`.
    #[arg(long, default_value_t = 1.0)]
    progress: f64,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TierArg {
    /// Best tier the host supports.
    Auto,
    /// Frame-exact encode.
    Encode,
    /// Realtime recording.
    Record,
    /// PNG still archive.
    Archive,
}

impl TierArg {
    fn start_tier(self) -> Option<Tier> {
        match self {
            Self::Auto => None,
            Self::Encode => Some(Tier::FrameExact),
            Self::Record => Some(Tier::Realtime),
            Self::Archive => Some(Tier::StillArchive),
        }
    }
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    route: RouteArgs,

    /// Animation length in seconds (clamped to 2..=90).
    #[arg(long, default_value_t = 8.0)]
    duration: f64,

    /// Directory the artifact is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// First tier to try.
    #[arg(long, value_enum, default_value_t = TierArg::Auto)]
    tier: TierArg,

    /// Export config JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,
}

fn parse_geo(s: &str) -> Result<GeoPoint, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lng', got '{s}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lng}': {e}"))?;
    GeoPoint::new(lat, lng).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args).await,
    }
}

fn globe_renderer(route: &RouteArgs, display: Canvas) -> anyhow::Result<GlobeRenderer> {
    let opts = GlobeRendererOpts {
        display,
        ..GlobeRendererOpts::default()
    };
    let mut renderer = GlobeRenderer::new(opts)?;
    let arc_height = RouteSettings::clamp_arc_height_km(route.arc_height);
    renderer.set_route(&great_circle_arc(
        route.from,
        route.to,
        arc_height,
        DEFAULT_ARC_STEPS,
    ));
    Ok(renderer)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let display = Canvas::new(args.width, args.height)?;
    let mut renderer = globe_renderer(&args.route, display)?;
    renderer.set_progress(Progress::new(args.progress));
    renderer.render_frame();
    let frame = renderer.canvas()?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            ExportConfig::from_json(&text)?
        }
        None => ExportConfig::default(),
    };
    if let Some(width) = args.width {
        cfg.width = width;
    }
    if let Some(height) = args.height {
        cfg.height = height;
    }
    if let Some(fps) = args.fps {
        cfg.fps = fps;
    }
    if let Some(tier) = args.tier.start_tier() {
        cfg.start_tier = Some(tier);
    }

    // The archive tier needs nothing from the host, so skip probing for it.
    let host = if cfg.start_tier == Some(Tier::StillArchive) {
        ExportHost::archive_only()
    } else {
        ExportHost::detect().await
    };
    let exporter = Exporter::new(host, cfg)?;

    let settings = RouteSettings::new(args.duration, args.route.arc_height);
    let mut renderer = globe_renderer(&args.route, Canvas::new(1280, 720)?)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling export");
            on_signal.cancel();
        }
    });

    let mut last_decile = 0;
    let on_progress = move |p: ExportProgress| {
        let decile = p.frame * 10 / p.total_frames.max(1);
        if decile > last_decile {
            last_decile = decile;
            tracing::info!(frame = p.frame, total = p.total_frames, "{}%", decile * 10);
        }
    };
    let result = exporter
        .export_with_cancel(&mut renderer, settings.duration_secs, on_progress, cancel)
        .await?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;
    let out = args.out_dir.join(&result.file_name);
    std::fs::write(&out, &result.bytes)
        .with_context(|| format!("write artifact '{}'", out.display()))?;

    if let Some(warning) = &result.warning {
        eprintln!("warning: {warning}");
    }
    println!("{}", out.display());
    Ok(())
}
