use std::fmt;

use anyhow::Error;

pub const SOURCE_UNAVAILABLE: &str = "SOURCE_UNAVAILABLE";
pub const TOOLCHAIN_MISSING: &str = "TOOLCHAIN_MISSING";
pub const EXTRACTION_FAILURE: &str = "EXTRACTION_FAILURE";
pub const PLAYBACK_FAILURE: &str = "PLAYBACK_FAILURE";
pub const INVALID_FRAME_RATE: &str = "INVALID_FRAME_RATE";
pub const NO_VIDEO_FOUND: &str = "NO_VIDEO_FOUND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedErrorKind {
    SourceUnavailable,
    ToolchainMissing,
    ExtractionFailure,
    PlaybackFailure,
    /// Recovered locally with a warning; never surfaces as a process failure.
    InvalidFrameRate,
    Usage,
}

impl CodedErrorKind {
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::InvalidFrameRate)
    }
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub kind: CodedErrorKind,
}

impl CodedError {
    fn new(code: &'static str, kind: CodedErrorKind, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            kind,
        }
    }

    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::new(SOURCE_UNAVAILABLE, CodedErrorKind::SourceUnavailable, message)
    }

    pub fn toolchain_missing(message: impl Into<String>) -> Self {
        Self::new(TOOLCHAIN_MISSING, CodedErrorKind::ToolchainMissing, message)
    }

    pub fn extraction_failure(message: impl Into<String>) -> Self {
        Self::new(EXTRACTION_FAILURE, CodedErrorKind::ExtractionFailure, message)
    }

    pub fn playback_failure(message: impl Into<String>) -> Self {
        Self::new(PLAYBACK_FAILURE, CodedErrorKind::PlaybackFailure, message)
    }

    pub fn invalid_frame_rate(message: impl Into<String>) -> Self {
        Self::new(INVALID_FRAME_RATE, CodedErrorKind::InvalidFrameRate, message)
    }

    pub fn usage(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, CodedErrorKind::Usage, message)
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Every failure that reaches the top level exits with status 1.
pub fn exit_code(error: &Error) -> u8 {
    match find_coded_error(error) {
        Some(coded) if !coded.kind.is_fatal() => 0,
        _ => 1,
    }
}
