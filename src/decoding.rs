use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::error_codes::CodedError;
use crate::frame::RgbFrame;

/// An opened video stream that yields decoded frames in order.
pub trait FrameSource: Send {
    fn dimensions(&self) -> (u32, u32);

    /// Rate reported by the container; may be zero or garbage.
    fn frame_rate(&self) -> f64;

    /// `Ok(None)` at end of stream.
    fn read_frame(&mut self) -> Result<Option<RgbFrame>>;

    fn release(&mut self);
}

pub trait VideoBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>>;
}

/// Owns an opened source and releases it exactly once, on `release` or on drop.
pub struct DecoderHandle {
    source: Option<Box<dyn FrameSource>>,
}

impl DecoderHandle {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn source_mut(&mut self) -> Option<&mut (dyn FrameSource + 'static)> {
        self.source.as_deref_mut()
    }

    /// Returns true if this call performed the release.
    pub fn release(&mut self) -> bool {
        match self.source.take() {
            Some(mut source) => {
                source.release();
                tracing::debug!("video decoder released");
                true
            }
            None => false,
        }
    }
}

impl Drop for DecoderHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl VideoBackend for FfmpegBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(FfmpegSource::open(path)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

pub fn probe_stream(input_path: &Path) -> Result<StreamInfo> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height,avg_frame_rate,r_frame_rate")
        .arg("-of")
        .arg("json")
        .arg(input_path)
        .stdin(Stdio::null())
        .output()
        .map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                anyhow!(CodedError::source_unavailable(
                    "ffprobe was not found on PATH. Install FFmpeg to decode video."
                ))
            } else {
                anyhow!(CodedError::source_unavailable(format!(
                    "failed to spawn ffprobe for {}: {error}",
                    input_path.display()
                )))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(CodedError::source_unavailable(format!(
            "could not open video file {}: {}",
            input_path.display(),
            stderr.trim()
        ))));
    }

    parse_probe_output(&output.stdout).with_context(|| {
        format!("failed to read stream info for {}", input_path.display())
    })
}

fn parse_probe_output(bytes: &[u8]) -> Result<StreamInfo> {
    let parsed: ProbeOutput =
        serde_json::from_slice(bytes).context("ffprobe returned malformed JSON")?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!(CodedError::source_unavailable("no video stream found")))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => (width, height),
        (width, height) => {
            return Err(anyhow!(CodedError::source_unavailable(format!(
                "video stream has invalid dimensions {:?}x{:?}",
                width, height
            ))))
        }
    };

    let frame_rate = [stream.avg_frame_rate, stream.r_frame_rate]
        .iter()
        .flatten()
        .map(|raw| parse_rational(raw))
        .find(|rate| rate.is_finite() && *rate > 0.0)
        .unwrap_or(0.0);

    Ok(StreamInfo {
        width,
        height,
        frame_rate,
    })
}

/// Parses `30000/1001` or `25`; anything unparsable or with a zero denominator is 0.
pub fn parse_rational(raw: &str) -> f64 {
    let value = raw.trim();
    match value.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().unwrap_or(0.0);
            let den = den.trim().parse::<f64>().unwrap_or(0.0);
            if den == 0.0 {
                0.0
            } else {
                num / den
            }
        }
        None => value.parse::<f64>().unwrap_or(0.0),
    }
}

/// Moves a long-running child into its own process group so a terminal Ctrl-C reaches
/// only this process; the child is then stopped through the shutdown path.
pub(crate) fn isolate_from_terminal_signals(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command
}

/// Decodes frames through an `ffmpeg` child writing native-size `rgb24` to a pipe.
pub struct FfmpegSource {
    info: StreamInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    frame_size: usize,
}

impl FfmpegSource {
    pub fn open(input_path: &Path) -> Result<Self> {
        if !input_path.is_file() {
            return Err(anyhow!(CodedError::source_unavailable(format!(
                "could not open video file {}: no such file",
                input_path.display()
            ))));
        }

        let info = probe_stream(input_path)?;
        let frame_size = (info.width as usize)
            .checked_mul(info.height as usize)
            .and_then(|count| count.checked_mul(3))
            .ok_or_else(|| {
                anyhow!(CodedError::source_unavailable(format!(
                    "video frame size overflow for {}x{}",
                    info.width, info.height
                )))
            })?;

        let mut command = Command::new("ffmpeg");
        isolate_from_terminal_signals(&mut command);
        let mut child = command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-nostdin")
            .arg("-i")
            .arg(input_path)
            .arg("-map")
            .arg("0:v:0")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| {
                anyhow!(CodedError::source_unavailable(format!(
                    "failed to spawn ffmpeg decoder for {}: {error}",
                    input_path.display()
                )))
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(anyhow!("failed to capture ffmpeg stdout"));
            }
        };

        Ok(Self {
            info,
            child: Some(child),
            stdout: Some(stdout),
            frame_size,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn frame_rate(&self) -> f64 {
        self.info.frame_rate
    }

    fn read_frame(&mut self) -> Result<Option<RgbFrame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        let mut buffer = vec![0u8; self.frame_size];
        match stdout.read_exact(&mut buffer) {
            Ok(()) => RgbFrame::new(self.info.width, self.info.height, buffer).map(Some),
            Err(error) if error.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(error) => Err(anyhow!(CodedError::source_unavailable(format!(
                "failed to read from ffmpeg: {error}"
            )))),
        }
    }

    fn release(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}
