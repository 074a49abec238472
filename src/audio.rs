use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tempfile::TempPath;

use crate::decoding::isolate_from_terminal_signals;
use crate::error_codes::CodedError;
use crate::shutdown::ShutdownSignal;

/// Every binary the audio path shells out to.
pub const AUDIO_TOOLCHAIN: &[&str] = &["ffmpeg", "ffprobe", "ffplay"];

const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extracted audio track on disk. Deleted exactly once, by `remove` or on drop.
#[derive(Debug)]
pub struct AudioArtifact {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl AudioArtifact {
    pub fn new(temp: TempPath) -> Self {
        Self {
            path: temp.to_path_buf(),
            temp: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if this call deleted the file.
    pub fn remove(&mut self) -> Result<bool> {
        match self.temp.take() {
            Some(temp) => {
                temp.close().with_context(|| {
                    format!("failed to remove temporary audio file {}", self.path.display())
                })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub trait AudioBackend: Send + Sync {
    fn extract(&self, video_path: &Path) -> Result<AudioArtifact>;

    /// Blocks until the track finishes, or until the signal reports an interrupt.
    fn play(&self, artifact: &Path, shutdown: &ShutdownSignal) -> Result<()>;
}

pub fn tool_available(name: &str) -> bool {
    Command::new(name)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub fn ensure_audio_toolchain() -> Result<()> {
    let missing = AUDIO_TOOLCHAIN
        .iter()
        .copied()
        .filter(|tool| !tool_available(tool))
        .collect::<Vec<_>>();
    if missing.is_empty() {
        return Ok(());
    }
    Err(anyhow!(CodedError::toolchain_missing(format!(
        "{} not found on PATH. Please install FFmpeg.",
        missing.join(", ")
    ))))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegAudio;

impl AudioBackend for FfmpegAudio {
    fn extract(&self, video_path: &Path) -> Result<AudioArtifact> {
        ensure_audio_toolchain()?;

        let temp = tempfile::Builder::new()
            .prefix("glyphreel-audio-")
            .suffix(".mp3")
            .tempfile()
            .map_err(|error| {
                anyhow!(CodedError::extraction_failure(format!(
                    "failed to create temporary audio file: {error}"
                )))
            })?
            .into_temp_path();
        let artifact = AudioArtifact::new(temp);

        let output = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-nostdin")
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg("-vn")
            .arg("-acodec")
            .arg("libmp3lame")
            .arg(artifact.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .output()
            .map_err(|error| {
                anyhow!(CodedError::extraction_failure(format!(
                    "failed to spawn ffmpeg for audio extraction: {error}"
                )))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(CodedError::extraction_failure(format!(
                "ffmpeg failed with status {} extracting audio from {}: {}",
                output.status,
                video_path.display(),
                stderr.trim()
            ))));
        }

        Ok(artifact)
    }

    fn play(&self, artifact: &Path, shutdown: &ShutdownSignal) -> Result<()> {
        let mut command = Command::new("ffplay");
        isolate_from_terminal_signals(&mut command);
        let mut child = command
            .arg("-nodisp")
            .arg("-autoexit")
            .arg("-loglevel")
            .arg("error")
            .arg(artifact)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| {
                if error.kind() == ErrorKind::NotFound {
                    anyhow!(CodedError::playback_failure(
                        "ffplay was not found on PATH. Please install FFmpeg."
                    ))
                } else {
                    anyhow!(CodedError::playback_failure(format!(
                        "failed to spawn ffplay: {error}"
                    )))
                }
            })?;

        loop {
            if shutdown.is_interrupted() {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(());
            }
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                // A signal sent to ffplay directly alongside the interrupt is not a playback failure.
                Ok(Some(_)) if shutdown.is_interrupted() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(anyhow!(CodedError::playback_failure(format!(
                        "ffplay exited with status {status}"
                    ))))
                }
                Ok(None) => thread::sleep(PLAYBACK_POLL_INTERVAL),
                Err(error) => {
                    let _ = child.kill();
                    return Err(anyhow!(CodedError::playback_failure(format!(
                        "failed waiting for ffplay: {error}"
                    ))));
                }
            }
        }
    }
}

/// Background worker that plays the extracted track once. It never touches the
/// video path; it only watches the shutdown signal for interrupts.
pub struct AudioPlayer {
    worker: Option<JoinHandle<Result<()>>>,
}

impl AudioPlayer {
    pub fn spawn(
        backend: Arc<dyn AudioBackend>,
        artifact: PathBuf,
        shutdown: ShutdownSignal,
    ) -> Result<Self> {
        let worker = thread::Builder::new()
            .name("glyphreel-audio".to_owned())
            .spawn(move || {
                tracing::info!(path = %artifact.display(), "playing audio");
                let result = backend.play(&artifact, &shutdown);
                if let Err(error) = &result {
                    tracing::error!(error = %error, "audio playback failed");
                }
                result
            })
            .context("failed to spawn audio thread")?;
        Ok(Self {
            worker: Some(worker),
        })
    }

    pub fn join(mut self) -> Result<()> {
        match self.worker.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow!(CodedError::playback_failure(
                    "audio thread panicked"
                ))),
            },
            None => Ok(()),
        }
    }
}
