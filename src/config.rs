use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::error_codes::{CodedError, NO_VIDEO_FOUND};

pub const DEFAULT_FPS: f64 = 30.0;

/// Extensions considered by default discovery, matched case-insensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "avi"];

#[derive(Debug, Clone)]
pub struct FrameRate {
    pub fps: f64,
    /// Set when the reported rate was unusable and `DEFAULT_FPS` was substituted.
    pub fallback: Option<CodedError>,
}

/// Without `true_fps` playback runs at `DEFAULT_FPS`. With it, the reported rate is
/// used unless it is non-positive or not finite.
pub fn resolve_frame_rate(reported: f64, true_fps: bool) -> FrameRate {
    if !true_fps {
        return FrameRate {
            fps: DEFAULT_FPS,
            fallback: None,
        };
    }
    if reported.is_finite() && reported > 0.0 {
        return FrameRate {
            fps: reported,
            fallback: None,
        };
    }
    FrameRate {
        fps: DEFAULT_FPS,
        fallback: Some(CodedError::invalid_frame_rate(format!(
            "reported FPS {reported} is invalid, defaulting to {DEFAULT_FPS} FPS"
        ))),
    }
}

/// The explicit path if given, otherwise the first video file (by name) in `dir`.
pub fn resolve_video_path(explicit: Option<PathBuf>, dir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let path = discover_default_video(dir)?.ok_or_else(|| {
        anyhow!(CodedError::usage(
            NO_VIDEO_FOUND,
            format!(
                "no video file ({}) found in {}",
                VIDEO_EXTENSIONS.join(", "),
                dir.display()
            ),
        ))
    })?;
    tracing::info!(path = %path.display(), "no video file provided, using first one found");
    Ok(path)
}

fn discover_default_video(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list directory {}", dir.display()))?;
    let mut candidates = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_video_extension(path))
        .collect::<Vec<_>>();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::error_codes::find_coded_error;

    #[test]
    fn fixed_rate_ignores_reported_rate() {
        let rate = resolve_frame_rate(59.94, false);
        assert_eq!(rate.fps, DEFAULT_FPS);
        assert!(rate.fallback.is_none());
    }

    #[test]
    fn true_fps_uses_reported_rate() {
        let rate = resolve_frame_rate(24.0, true);
        assert_eq!(rate.fps, 24.0);
        assert!(rate.fallback.is_none());
    }

    #[test]
    fn invalid_reported_rate_falls_back_with_warning() {
        for reported in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let rate = resolve_frame_rate(reported, true);
            assert_eq!(rate.fps, DEFAULT_FPS, "reported={reported}");
            let warning = rate.fallback.expect("fallback should be recorded");
            assert_eq!(warning.code, crate::error_codes::INVALID_FRAME_RATE);
        }
    }

    #[test]
    fn explicit_path_wins_over_discovery() {
        let dir = tempdir().expect("tempdir should create");
        fs::write(dir.path().join("a.mp4"), b"").expect("file should write");
        let path = resolve_video_path(Some(PathBuf::from("chosen.mkv")), dir.path())
            .expect("explicit path should resolve");
        assert_eq!(path, PathBuf::from("chosen.mkv"));
    }

    #[test]
    fn discovery_picks_first_video_by_name() {
        let dir = tempdir().expect("tempdir should create");
        for name in ["notes.txt", "b.MP4", "c.webm", "a.mov"] {
            fs::write(dir.path().join(name), b"").expect("file should write");
        }
        let path = resolve_video_path(None, dir.path()).expect("a video should be found");
        assert_eq!(path, dir.path().join("a.mov"));
    }

    #[test]
    fn discovery_without_videos_is_no_video_found() {
        let dir = tempdir().expect("tempdir should create");
        fs::write(dir.path().join("readme.md"), b"").expect("file should write");
        let error = resolve_video_path(None, dir.path()).expect_err("discovery should fail");
        let coded = find_coded_error(&error).expect("coded error");
        assert_eq!(coded.code, NO_VIDEO_FOUND);
    }
}
