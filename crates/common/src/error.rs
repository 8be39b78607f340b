//! Error types shared across lecturecut crates.

use std::path::PathBuf;

/// Top-level error type for lecturecut operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// The event log asked for a state change the recording workflow forbids.
    #[error("Illegal transition at {at_secs:.3}s: {message}")]
    IllegalTransition { at_secs: f64, message: String },

    /// A segment waited for its predecessor's boundary frame and gave up.
    #[error("Segment {index} is missing the boundary frame of segment {dependency}: {message}")]
    MissingDependency {
        index: usize,
        dependency: usize,
        message: String,
    },

    #[error("Segment {index} is degenerate: {message}")]
    DegenerateSegment { index: usize, message: String },

    #[error("Source file not found: {path}")]
    MissingSourceFile { path: PathBuf },

    #[error("Missing input: {message}")]
    MissingInput { message: String },

    #[error("Event log error: {message}")]
    EventLog { message: String },

    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using EditorError.
pub type EditorResult<T> = Result<T, EditorError>;

impl EditorError {
    pub fn illegal_transition(at_secs: f64, msg: impl Into<String>) -> Self {
        Self::IllegalTransition {
            at_secs,
            message: msg.into(),
        }
    }

    pub fn missing_dependency(index: usize, dependency: usize, msg: impl Into<String>) -> Self {
        Self::MissingDependency {
            index,
            dependency,
            message: msg.into(),
        }
    }

    pub fn degenerate(index: usize, msg: impl Into<String>) -> Self {
        Self::DegenerateSegment {
            index,
            message: msg.into(),
        }
    }

    pub fn missing_source(path: impl Into<PathBuf>) -> Self {
        Self::MissingSourceFile { path: path.into() }
    }

    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput {
            message: msg.into(),
        }
    }

    pub fn event_log(msg: impl Into<String>) -> Self {
        Self::EventLog {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
