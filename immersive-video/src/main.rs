//! Immersive Video - headless player
//!
//! Plays a video through the paced playback controller at a fixed host tick
//! rate, optionally dumping every presented frame as a PNG.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::Parser;

use immersive_video::telemetry::{init_logging, LogConfig};
use immersive_video::{
    FrameSink, FrameView, HwAccelKind, PlaybackController, PlayerSettings, PresentationLayout, TickOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "immersive-video", version, about = "Headless paced video playback")]
struct Cli {
    /// Video file (overrides the source in the settings file)
    input: Option<PathBuf>,

    /// Settings XML to start from (default: user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Rewind and continue at end of stream
    #[arg(long = "loop", default_value_t = false)]
    looping: bool,

    /// Hardware decoder: software, cuda, vaapi, vdpau, videotoolbox, d3d11va, dxva2, qsv
    #[arg(long)]
    hwaccel: Option<HwAccelKind>,

    /// Output pixel layout: rgba or bgra
    #[arg(long)]
    layout: Option<PresentationLayout>,

    /// Host tick rate in Hz
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Stop after presenting this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Write every presented frame as a PNG into this directory
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Tick as fast as possible instead of sleeping between ticks
    #[arg(long, default_value_t = false)]
    fast: bool,

    /// Log as JSON
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

/// Counts presented frames and optionally writes them out as PNGs
struct DumpSink {
    dir: Option<PathBuf>,
    presented: u64,
    scratch: Vec<u8>,
    error: Option<anyhow::Error>,
}

impl DumpSink {
    fn write_png(&mut self, frame: FrameView<'_>, frame_index: u64) -> anyhow::Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let rgba: &[u8] = match frame.layout {
            PresentationLayout::Rgba => frame.data,
            PresentationLayout::Bgra => {
                self.scratch.clear();
                self.scratch.extend_from_slice(frame.data);
                for px in self.scratch.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
                &self.scratch
            }
        };

        let path = dir.join(format!("frame_{:06}_{:04}.png", self.presented, frame_index));
        image::save_buffer_with_format(
            &path,
            rgba,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))
    }
}

impl FrameSink for DumpSink {
    fn present(&mut self, frame: FrameView<'_>, frame_index: u64) {
        if self.error.is_none() {
            if let Err(e) = self.write_png(frame, frame_index) {
                self.error = Some(e);
            }
        }
        self.presented += 1;
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::default().with_json(cli.log_json);
    let _log_guard = init_logging(&log_config).map_err(|e| anyhow::anyhow!("init logging: {e}"))?;

    let mut settings = match &cli.settings {
        Some(path) => PlayerSettings::load_from_file(path)
            .with_context(|| format!("load settings '{}'", path.display()))?,
        None => PlayerSettings::load_or_default(),
    };
    if let Some(input) = &cli.input {
        settings.source = Some(input.to_string_lossy().into_owned());
    }
    settings.looping |= cli.looping;
    if let Some(kind) = cli.hwaccel {
        settings.hw_accel = kind;
    }
    if let Some(layout) = cli.layout {
        settings.output_layout = layout;
    }

    if settings.source_path().is_none() {
        anyhow::bail!("no input video given and none configured in settings");
    }
    if !(cli.tick_rate.is_finite() && cli.tick_rate > 0.0) {
        anyhow::bail!("tick rate must be positive, got {}", cli.tick_rate);
    }

    if let Some(dir) = &cli.dump_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("create dump dir '{}'", dir.display()))?;
    }

    let mut controller = PlaybackController::from_settings(&settings);
    let mut sink = DumpSink {
        dir: cli.dump_dir.clone(),
        presented: 0,
        scratch: Vec::new(),
        error: None,
    };

    let tick = Duration::from_secs_f64(1.0 / cli.tick_rate);
    let started = Instant::now();
    let mut last_tick = Instant::now();
    let mut reported = false;

    controller.play();
    loop {
        let elapsed = if cli.fast {
            tick
        } else {
            std::thread::sleep(tick.saturating_sub(last_tick.elapsed()));
            let now = Instant::now();
            let elapsed = now - last_tick;
            last_tick = now;
            elapsed
        };

        let outcome = controller.tick(elapsed, &mut sink)?;

        if !reported && controller.has_session() {
            reported = true;
            print_info(&controller, &settings);
        }
        if let Some(e) = sink.error.take() {
            return Err(e);
        }

        if outcome == TickOutcome::EndOfStream && !controller.is_looping() {
            break;
        }
        if cli.max_frames.is_some_and(|max| sink.presented >= max) {
            break;
        }
    }

    controller.stop()?;

    let stats = controller.decode_stats();
    println!("\n=== Playback ===");
    println!("Presented: {} frames in {:.2}s", sink.presented, started.elapsed().as_secs_f64());
    println!(
        "Decode+convert: avg {:.2}ms, p50 {:.2}ms, p95 {:.2}ms, p99 {:.2}ms, max {:.2}ms ({} samples)",
        stats.avg_ms, stats.p50_ms, stats.p95_ms, stats.p99_ms, stats.max_ms, stats.sample_count
    );
    if !cli.fast {
        println!("Emission rate: {:.2} fps", controller.emitted_fps());
    }
    Ok(())
}

fn print_info(controller: &PlaybackController, settings: &PlayerSettings) {
    println!("=== Video Information ===");
    if let Some(source) = controller.source() {
        println!("Source: {}", source.display());
    }
    println!("Resolution: {}x{}", controller.video_width(), controller.video_height());
    if let Some(fps) = controller.frame_rate() {
        println!("Frame rate: {:.3} fps", fps);
    }
    if let Some(interval) = controller.target_interval() {
        println!("Frame interval: {:.3}ms", interval.as_secs_f64() * 1000.0);
    }
    if let Some(pipeline) = controller.pipeline() {
        let session = pipeline.session();
        println!("Codec: {} ({:?})", session.codec_name(), session.pixel_format());
        println!("Duration: {:.2}s", session.duration());
    }
    println!("Decoder: {}", settings.hw_accel);
    println!("Layout: {}", settings.output_layout);
    println!("Looping: {}", controller.is_looping());
    let mut tags: Vec<(String, String)> = controller.metadata().unwrap_or_default().into_iter().collect();
    tags.sort();
    for (key, value) in tags {
        println!("  {}: {}", key, value);
    }
}
