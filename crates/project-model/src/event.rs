//! Recording cue events and the event-log format.
//!
//! The recorder appends one line per cue while the lecture is captured:
//!
//! ```text
//! 00:00:00,Event Draw
//! 00:00:03,Event Talk
//! 00:00:08,Event Stop
//! ```
//!
//! The first column is a time of day read as elapsed time from `00:00:00`.
//! Unknown cue names are skipped with a warning so newer recorders can add
//! cues without breaking older editors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lecturecut_common::clock::parse_timecode;
use lecturecut_common::error::EditorError;

/// The four recording cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Drawing on screen starts; audio during this span is discarded.
    Draw,
    /// Narration for the preceding drawing starts.
    Talk,
    /// Keep original audio and video together.
    Both,
    /// Pause; nothing until the next cue is used.
    Stop,
}

impl EventKind {
    /// Parse the cue name used in the log file.
    pub fn from_log_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Event Draw" => Some(Self::Draw),
            "Event Talk" => Some(Self::Talk),
            "Event Both" => Some(Self::Both),
            "Event Stop" => Some(Self::Stop),
            _ => None,
        }
    }

    /// The cue name as written in the log file.
    pub fn log_name(self) -> &'static str {
        match self {
            Self::Draw => "Event Draw",
            Self::Talk => "Event Talk",
            Self::Both => "Event Both",
            Self::Stop => "Event Stop",
        }
    }
}

/// A single cue with its time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Seconds since the start of the recording.
    #[serde(rename = "t")]
    pub timestamp_secs: f64,

    pub kind: EventKind,
}

impl Event {
    pub fn new(timestamp_secs: f64, kind: EventKind) -> Self {
        Self {
            timestamp_secs,
            kind,
        }
    }

    pub fn draw(timestamp_secs: f64) -> Self {
        Self::new(timestamp_secs, EventKind::Draw)
    }

    pub fn talk(timestamp_secs: f64) -> Self {
        Self::new(timestamp_secs, EventKind::Talk)
    }

    pub fn both(timestamp_secs: f64) -> Self {
        Self::new(timestamp_secs, EventKind::Both)
    }

    pub fn stop(timestamp_secs: f64) -> Self {
        Self::new(timestamp_secs, EventKind::Stop)
    }
}

/// A log line whose cue name was not recognized.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrecognizedEvent {
    /// 1-based line number.
    pub line: usize,
    pub timestamp_secs: f64,
    pub name: String,
}

/// Parsed contents of an event log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    pub events: Vec<Event>,
    pub unrecognized: Vec<UnrecognizedEvent>,
}

/// Errors that can occur while reading an event log.
#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("line {line}: expected `HH:MM:SS,Event Name`, got {content:?}")]
    Malformed { line: usize, content: String },

    #[error("line {line}: invalid timecode {value:?}")]
    BadTimecode { line: usize, value: String },

    #[error("line {line}: timestamp {current}s goes back before {previous}s")]
    OutOfOrder {
        line: usize,
        previous: f64,
        current: f64,
    },
}

impl From<EventLogError> for EditorError {
    fn from(err: EventLogError) -> Self {
        match err {
            EventLogError::Io { path, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                EditorError::missing_source(path)
            }
            other => EditorError::event_log(other.to_string()),
        }
    }
}

/// Parse event-log text.
///
/// Blank lines are ignored. Unrecognized cue names are collected in
/// [`EventLog::unrecognized`] and logged, never rejected.
pub fn parse_event_log(content: &str) -> Result<EventLog, EventLogError> {
    let mut log = EventLog::default();
    let mut previous: Option<f64> = None;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let (time_raw, name) = line
            .split_once(',')
            .ok_or_else(|| EventLogError::Malformed {
                line: line_no,
                content: line.to_string(),
            })?;

        let timestamp_secs =
            parse_timecode(time_raw).ok_or_else(|| EventLogError::BadTimecode {
                line: line_no,
                value: time_raw.trim().to_string(),
            })?;

        if let Some(prev) = previous {
            if timestamp_secs < prev {
                return Err(EventLogError::OutOfOrder {
                    line: line_no,
                    previous: prev,
                    current: timestamp_secs,
                });
            }
        }
        previous = Some(timestamp_secs);

        match EventKind::from_log_name(name) {
            Some(kind) => log.events.push(Event::new(timestamp_secs, kind)),
            None => {
                tracing::warn!(line = line_no, event = name.trim(), "Unknown event, skipping");
                log.unrecognized.push(UnrecognizedEvent {
                    line: line_no,
                    timestamp_secs,
                    name: name.trim().to_string(),
                });
            }
        }
    }

    Ok(log)
}

/// Read and parse an event log file.
pub fn load_event_log(path: &Path) -> Result<EventLog, EventLogError> {
    let content = std::fs::read_to_string(path).map_err(|e| EventLogError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_event_log(&content)
}
