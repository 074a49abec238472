use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use glyphreel::audio::{AudioBackend, FfmpegAudio};
use glyphreel::config::resolve_video_path;
use glyphreel::decoding::FfmpegBackend;
use glyphreel::error_codes::exit_code;
use glyphreel::geometry::TerminalSize;
use glyphreel::session::{run_session, SessionConfig};
use glyphreel::shutdown::ShutdownSignal;

#[derive(Debug, Parser)]
#[command(name = "glyphreel")]
#[command(about = "Play a video as text art in the terminal, with its audio track")]
#[command(version = env!("GLYPHREEL_VERSION"))]
struct Cli {
    /// Video file to play. Defaults to the first video file in the current directory.
    video: Option<PathBuf>,
    /// Tint each glyph with its source pixel color (24-bit ANSI).
    #[arg(long)]
    color: bool,
    /// Pace playback at the video's own frame rate instead of 30 FPS.
    #[arg(long = "true-fps")]
    true_fps: bool,
    /// Skip audio extraction and playback.
    #[arg(long = "no-audio")]
    no_audio: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(exit_code(&error))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config = SessionConfig {
        video: resolve_video_path(cli.video, &cwd)?,
        color: cli.color,
        true_fps: cli.true_fps,
        terminal: TerminalSize::query(),
    };
    let audio: Option<Arc<dyn AudioBackend>> = if cli.no_audio {
        None
    } else {
        Some(Arc::new(FfmpegAudio))
    };

    let shutdown = ShutdownSignal::new();
    shutdown.install_interrupt_handler()?;

    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());
    let report = run_session(&config, &FfmpegBackend, audio, &shutdown, out)?;

    tracing::info!(
        frames = report.playback.frames_displayed,
        interrupted = report.playback.interrupted,
        "playback finished"
    );
    Ok(())
}
