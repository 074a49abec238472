use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::audio::{AudioArtifact, AudioBackend, AudioPlayer};
use crate::buffer::frame_buffer;
use crate::config::resolve_frame_rate;
use crate::decoding::{DecoderHandle, VideoBackend};
use crate::error_codes::{find_coded_error, CodedError};
use crate::geometry::{fit_glyph_grid, GlyphGrid, TerminalSize};
use crate::producer::{FrameProducer, ProducerConfig};
use crate::scheduler::{frame_interval, PlaybackReport, PlaybackScheduler, Workers};
use crate::shutdown::{ShutdownCause, ShutdownSignal};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub video: PathBuf,
    pub color: bool,
    pub true_fps: bool,
    pub terminal: TerminalSize,
}

#[derive(Debug)]
pub struct SessionReport {
    pub playback: PlaybackReport,
    pub fps: f64,
    pub grid: GlyphGrid,
    pub audio_removed: bool,
}

/// Runs one playback session end to end.
///
/// Nothing is spawned until the video has opened and the audio track (when an audio
/// backend is given) has been extracted. Every exit path releases the decoder and
/// deletes the extracted track.
pub fn run_session<W: Write>(
    config: &SessionConfig,
    video: &dyn VideoBackend,
    audio: Option<Arc<dyn AudioBackend>>,
    shutdown: &ShutdownSignal,
    out: W,
) -> Result<SessionReport> {
    let source = video
        .open(&config.video)
        .map_err(|error| as_source_unavailable(error, &config.video))?;
    let (width, height) = source.dimensions();
    let rate = resolve_frame_rate(source.frame_rate(), config.true_fps);
    let decoder = DecoderHandle::new(source);

    if let Some(warning) = &rate.fallback {
        tracing::warn!("{warning}");
    }
    let grid = fit_glyph_grid(width, height, config.terminal)?;
    tracing::info!(
        path = %config.video.display(),
        source_width = width,
        source_height = height,
        grid_width = grid.width,
        grid_height = grid.height,
        fps = rate.fps,
        "starting playback"
    );

    let mut artifact = match &audio {
        Some(backend) => Some(backend.extract(&config.video)?),
        None => None,
    };

    let (sender, receiver) = frame_buffer();
    let producer = FrameProducer::spawn(
        decoder,
        sender,
        ProducerConfig {
            grid,
            color: config.color,
        },
        shutdown.clone(),
    )?;

    let track_path = artifact.as_ref().map(|track| track.path().to_path_buf());
    let audio_player = match (audio, track_path) {
        (Some(backend), Some(track_path)) => {
            match AudioPlayer::spawn(backend, track_path, shutdown.clone()) {
                Ok(player) => Some(player),
                Err(error) => {
                    shutdown.trigger(ShutdownCause::Interrupt);
                    drop(receiver);
                    if let Err(join_error) = producer.join() {
                        tracing::error!(error = %join_error, "frame producer did not stop cleanly");
                    }
                    remove_artifact(&mut artifact);
                    return Err(error);
                }
            }
        }
        _ => None,
    };

    let mut scheduler =
        PlaybackScheduler::new(out, frame_interval(rate.fps), shutdown.clone());
    let playback = scheduler.run(
        receiver,
        Workers {
            producer,
            audio: audio_player,
        },
    );

    let audio_removed = remove_artifact(&mut artifact);
    let playback = playback?;
    if playback.interrupted {
        tracing::info!("playback interrupted");
    }

    Ok(SessionReport {
        playback,
        fps: rate.fps,
        grid,
        audio_removed,
    })
}

fn remove_artifact(artifact: &mut Option<AudioArtifact>) -> bool {
    let Some(track) = artifact.as_mut() else {
        return false;
    };
    match track.remove() {
        Ok(removed) => {
            tracing::debug!(path = %track.path().display(), "temporary audio file removed");
            removed
        }
        Err(error) => {
            tracing::warn!(error = %error, "could not remove temporary audio file");
            false
        }
    }
}

fn as_source_unavailable(error: anyhow::Error, video: &std::path::Path) -> anyhow::Error {
    if find_coded_error(&error).is_some() {
        return error;
    }
    anyhow!(CodedError::source_unavailable(format!(
        "could not open video file {}: {error:#}",
        video.display()
    )))
}
