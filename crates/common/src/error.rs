//! Error types shared across VideoBones crates.

use std::fmt;

/// Identifies the track an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRef {
    Video(usize),
    Audio(usize),
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackRef::Video(index) => write!(f, "video track {index}"),
            TrackRef::Audio(index) => write!(f, "audio track {index}"),
        }
    }
}

/// Validation failures raised while compiling a render request.
///
/// Every variant is detected before any external process is started, so a
/// compile either yields a complete command or one of these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Invalid layout kind: {name:?}")]
    InvalidLayoutKind { name: String },

    #[error("Layout mismatch on {track}: {layout} expects {expected} {field}, got {actual}")]
    LayoutMismatch {
        track: TrackRef,
        layout: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid parameter on {track}: {parameter} = {value}")]
    InvalidTrackParameter {
        track: TrackRef,
        parameter: &'static str,
        value: String,
    },

    #[error("Invalid canvas {size}: {reason}")]
    InvalidCanvas { size: String, reason: String },

    #[error("Output mode {mode} cannot be used for {operation}")]
    InvalidModeForOperation {
        mode: String,
        operation: &'static str,
    },
}

impl CompileError {
    pub fn invalid_parameter(
        track: TrackRef,
        parameter: &'static str,
        value: impl fmt::Display,
    ) -> Self {
        Self::InvalidTrackParameter {
            track,
            parameter,
            value: value.to_string(),
        }
    }
}

/// Top-level error type for VideoBones operations.
#[derive(Debug, thiserror::Error)]
pub enum BonesError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Process error: {message}")]
    Process { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using BonesError.
pub type BonesResult<T> = Result<T, BonesError>;

impl BonesError {
    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process {
            message: msg.into(),
        }
    }

    /// Whether this error came from request validation rather than the
    /// external process.
    pub fn is_compile_error(&self) -> bool {
        matches!(self, Self::Compile(_))
    }
}
