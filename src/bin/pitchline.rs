use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use pitchline::{
    Anchor, ConvertConfig, Converter, FrameState, PitchBound, PitchExtractor as _, PlotRenderer,
    Progress, Theme, Tone, YinExtractor,
    convert::DEFAULT_PROCESS_TIMEOUT,
    exec, reference_points,
    plot::OverlayRenderer as _,
};

#[derive(Parser, Debug)]
#[command(name = "pitchline", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the pitch overlay and composite it onto the source video
    /// (requires `ffmpeg` on PATH or via --ffmpeg).
    Render(RenderArgs),
    /// Render a single overlay frame as a PNG, for inspection.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Path to the song audio.
    audio: PathBuf,

    /// Path to the song video.
    video: PathBuf,

    /// Output video path (defaults to VIDEO with a `_with_pitch.mp4` suffix).
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// The key of the song (C, C#, D, ... B).
    #[arg(long, short = 'k')]
    key: String,

    /// Output frame rate of the overlay.
    #[arg(long, default_value_t = pitchline::DEFAULT_FPS)]
    fps: u32,

    /// Lowest tracked pitch (note name or Hz).
    #[arg(long, default_value = "D2")]
    min_pitch: String,

    /// Highest tracked pitch (note name or Hz).
    #[arg(long, default_value = "G5")]
    max_pitch: String,

    /// Fixed overlay width in pixels (skips the source resolution probe).
    #[arg(long)]
    overlay_width: Option<u32>,

    /// Overlay anchor: top_right, top_left, bottom_right, bottom_left or an
    /// explicit `x:y` pixel offset.
    #[arg(long, default_value = "top_right")]
    anchor: String,

    /// Color theme.
    #[arg(long, default_value = "dark")]
    theme: String,

    /// Use CUDA decode/scale/overlay and the NVENC encoder.
    #[arg(long)]
    accel: bool,

    /// Path to the ffmpeg executable.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Path to the song audio.
    audio: PathBuf,

    /// The key of the song (C, C#, D, ... B).
    #[arg(long, short = 'k')]
    key: String,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = pitchline::DEFAULT_FPS)]
    fps: u32,

    #[arg(long, default_value = "D2")]
    min_pitch: String,

    #[arg(long, default_value = "G5")]
    max_pitch: String,

    #[arg(long, default_value = "dark")]
    theme: String,

    /// Path to the ffmpeg executable.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Print the computed frame state as JSON on stdout.
    #[arg(long)]
    dump_state: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

struct StderrProgress {
    done: u64,
    total: u64,
    last_pct: u64,
}

impl Progress for StderrProgress {
    fn begin(&mut self, total: u64) {
        self.total = total;
        self.last_pct = u64::MAX;
    }

    fn advance(&mut self, n: u64) {
        self.done += n;
        let pct = if self.total == 0 {
            100
        } else {
            self.done * 100 / self.total
        };
        if pct != self.last_pct {
            self.last_pct = pct;
            eprint!("\r  {pct:3}% ({}/{} frames)", self.done, self.total);
        }
        if self.done >= self.total {
            eprintln!();
        }
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = ConvertConfig::new(args.audio, args.video, Tone::from_str(&args.key)?);
    cfg.output = args.output;
    cfg.fps = args.fps;
    cfg.min_pitch = PitchBound::from_str(&args.min_pitch)?;
    cfg.max_pitch = PitchBound::from_str(&args.max_pitch)?;
    cfg.overlay_width = args.overlay_width;
    cfg.anchor = Anchor::from_str(&args.anchor)?;
    cfg.theme = Theme::from_str(&args.theme)?;
    cfg.accel = args.accel;
    cfg.ffmpeg = args.ffmpeg;

    let converter = Converter::new(cfg)?;
    eprintln!("Generating pitch overlay");
    let mut progress = StderrProgress {
        done: 0,
        total: 0,
        last_pct: u64::MAX,
    };
    let output = converter.run(&mut progress)?;

    eprintln!("wrote {}", output.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let key = Tone::from_str(&args.key)?;
    let theme = Theme::from_str(&args.theme)?;
    let min_freq = PitchBound::from_str(&args.min_pitch)?.resolve();
    let max_freq = PitchBound::from_str(&args.max_pitch)?.resolve();

    let ffmpeg = exec::locate_ffmpeg(args.ffmpeg.as_deref())?;
    let extractor = YinExtractor::new(ffmpeg, DEFAULT_PROCESS_TIMEOUT);
    let track = extractor.extract(&args.audio, min_freq, max_freq)?;

    let frame_count = track.frame_count(args.fps);
    if args.frame >= frame_count {
        anyhow::bail!("frame {} out of range (track has {frame_count} frames)", args.frame);
    }

    let references = reference_points(key, min_freq, max_freq);
    let limits = pitchline::resolve_y_limit_chain(&track, args.fps, args.frame + 1);
    let state = FrameState::with_y_limits(
        args.frame,
        args.fps,
        &track,
        &references,
        limits[args.frame as usize],
    );

    if args.dump_state {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    let mut renderer = PlotRenderer::new(theme);
    let raster = renderer.render(&state)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    image::save_buffer_with_format(
        &args.out,
        &raster.data,
        raster.width,
        raster.height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
