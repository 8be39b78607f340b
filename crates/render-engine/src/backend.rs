//! Media backend abstraction.
//!
//! Every operation that touches encoded media goes through [`MediaBackend`],
//! so the synthesizer and pipeline can be driven by a fake in tests.

use std::path::{Path, PathBuf};

use lecturecut_audio::{AudioBuffer, AudioFormat};
use lecturecut_common::clock::FrameClock;
use lecturecut_common::error::EditorResult;
use lecturecut_processing_core::palette::PaletteProbe;
use lecturecut_project_model::timeline::Interval;
use serde::{Deserialize, Serialize};

/// Stream properties of a video file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl MediaInfo {
    pub fn clock(&self) -> FrameClock {
        FrameClock::new(self.fps)
    }
}

/// One encode step producing a clip in the working directory.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderJob {
    /// Fit the drawing interval of an edit segment onto its narration.
    Retime {
        video: PathBuf,
        audio: PathBuf,
        /// Drawing interval, relative to the start of `video`.
        draw: Interval,
        /// Palette intervals removed from the drawing, relative to `draw.start`.
        cutouts: Vec<Interval>,
        /// Last-frame hold appended before the speed change.
        extension_secs: f64,
        speed_ratio: f64,
        output_secs: f64,
        fps: f64,
        dest: PathBuf,
    },

    /// Keep the original pictures and replace the audio track.
    Remux {
        video: PathBuf,
        audio: PathBuf,
        output_secs: f64,
        fps: f64,
        dest: PathBuf,
    },

    /// Fade the opening of `video` in over a still image.
    Crossfade {
        image: PathBuf,
        video: PathBuf,
        duration_secs: f64,
        fps: f64,
        dest: PathBuf,
    },

    /// Drop the first `offset_secs` of `video`.
    TrimHead {
        video: PathBuf,
        offset_secs: f64,
        dest: PathBuf,
    },
}

impl RenderJob {
    pub fn dest(&self) -> &Path {
        match self {
            Self::Retime { dest, .. }
            | Self::Remux { dest, .. }
            | Self::Crossfade { dest, .. }
            | Self::TrimHead { dest, .. } => dest,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Retime { .. } => "retime",
            Self::Remux { .. } => "remux",
            Self::Crossfade { .. } => "crossfade",
            Self::TrimHead { .. } => "trim_head",
        }
    }
}

/// Trait for media backends (ffmpeg, test doubles).
///
/// Implementations are shared across worker threads.
pub trait MediaBackend: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check if this backend is usable on the system.
    fn is_available(&self) -> bool;

    fn probe(&self, path: &Path) -> EditorResult<MediaInfo>;

    /// Cut `span` of `source` into `dest`, re-encoding so the clip starts
    /// exactly at `span.start`.
    fn extract_clip(&self, source: &Path, span: Interval, dest: &Path) -> EditorResult<()>;

    /// Write the audio track of `video` to a PCM WAV file.
    fn extract_audio(&self, video: &Path, format: AudioFormat, dest: &Path) -> EditorResult<()>;

    /// Decode an audio file into memory.
    fn read_audio(&self, path: &Path, format: AudioFormat) -> EditorResult<AudioBuffer>;

    /// Encode a buffer as a 16-bit PCM WAV file.
    fn write_audio(&self, buffer: &AudioBuffer, dest: &Path) -> EditorResult<()>;

    /// Save the frame shown at `at_secs` as an image.
    fn save_frame(&self, video: &Path, at_secs: f64, dest: &Path) -> EditorResult<()>;

    /// Check for the colour palette every `interval_secs` within `span`,
    /// one flag per sample starting at `span.start`.
    fn scan_palette(
        &self,
        video: &Path,
        span: Interval,
        interval_secs: f64,
        probe: &PaletteProbe,
    ) -> EditorResult<Vec<bool>>;

    fn render(&self, job: &RenderJob) -> EditorResult<()>;

    /// Join the clips named in an ffmpeg concat list.
    fn concat(&self, list: &Path, dest: &Path) -> EditorResult<()>;
}
