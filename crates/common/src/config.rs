//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EditorError, EditorResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Transient working directory for per-segment artifacts.
    pub work_dir: PathBuf,

    /// Editing parameters.
    pub editor: EditorConfig,

    /// Encoder settings shared by every synthesized clip.
    pub output: OutputSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Editing parameters, keyed the way the recording workflow names them.
///
/// Durations suffixed `_MARGIN`/`_SILENCE` are milliseconds; crossfade,
/// timeout, and palette interval are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    #[serde(rename = "NORMALISE_SOUND")]
    pub normalise_sound: bool,

    #[serde(rename = "SILENCE_BETWEEN_SECTIONS")]
    pub silence_between_sections_ms: u64,

    #[serde(rename = "START_VIDEO_SILENCE")]
    pub start_video_silence_ms: u64,

    #[serde(rename = "END_VIDEO_SILENCE")]
    pub end_video_silence_ms: u64,

    /// Audio silenced at the start of each cut to remove click sounds.
    #[serde(rename = "SILENCE_PRE_MARGIN")]
    pub silence_pre_margin_ms: u64,

    #[serde(rename = "SILENCE_POST_MARGIN")]
    pub silence_post_margin_ms: u64,

    /// Fade applied right after the pre margin.
    #[serde(rename = "FADE_PRE_MARGIN")]
    pub fade_pre_margin_ms: u64,

    /// Fade applied right before the post margin.
    #[serde(rename = "FADE_POST_MARGIN")]
    pub fade_post_margin_ms: u64,

    /// Upper bound for the draw-segment speed-up.
    #[serde(rename = "MAX_SPEEDX")]
    pub max_speedx: f64,

    #[serde(rename = "CROSSFADEIN_DURATION")]
    pub crossfadein_duration_secs: f64,

    /// How long a segment waits for its predecessor's boundary frame.
    #[serde(rename = "MISSING_IMAGE_TIMEOUT")]
    pub missing_image_timeout_secs: u64,

    #[serde(rename = "MIN_SILENCE_MS")]
    pub min_silence_ms: u64,

    #[serde(rename = "SILENCE_THRESHOLD_dB")]
    pub silence_threshold_db: f64,

    /// 1.0 leaves the clip alone, below 1.0 extends by that fraction of the
    /// clip, above 1.0 extends by that many seconds.
    #[serde(rename = "EXTEND_LAST_FRAME")]
    pub extend_last_frame: f64,

    #[serde(rename = "REMOVE_COLOUR_PALETTE")]
    pub remove_colour_palette: bool,

    #[serde(rename = "REMOVE_COLOUR_PALETTE_INTERVAL")]
    pub remove_colour_palette_interval_secs: f64,
}

/// Encoder parameters. Every clip is produced with the same settings so the
/// final concatenation can stream-copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Video encoder passed to `-c:v`.
    pub video_codec: String,

    /// Encoder preset.
    pub preset: String,

    /// Constant rate factor.
    pub crf: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Sample rate used for decoding and encoding audio.
    pub audio_sample_rate: u32,

    /// Channel count used for decoding and encoding audio.
    pub audio_channels: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "lecturecut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            editor: EditorConfig::default(),
            output: OutputSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            normalise_sound: true,
            silence_between_sections_ms: 0,
            start_video_silence_ms: 500,
            end_video_silence_ms: 1000,
            silence_pre_margin_ms: 300,
            silence_post_margin_ms: 300,
            fade_pre_margin_ms: 100,
            fade_post_margin_ms: 100,
            max_speedx: 5.0,
            crossfadein_duration_secs: 1.5,
            missing_image_timeout_secs: 5,
            min_silence_ms: 5000,
            silence_threshold_db: -40.0,
            extend_last_frame: 0.15,
            remove_colour_palette: false,
            remove_colour_palette_interval_secs: 1.0,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 20,
            audio_bitrate_kbps: 192,
            audio_sample_rate: 48000,
            audio_channels: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl EditorConfig {
    /// Reject parameter combinations the synthesizer cannot honour.
    pub fn validate(&self) -> EditorResult<()> {
        if !(self.max_speedx.is_finite() && self.max_speedx > 0.0) {
            return Err(EditorError::config(format!(
                "MAX_SPEEDX must be positive, got {}",
                self.max_speedx
            )));
        }
        if !(self.crossfadein_duration_secs.is_finite() && self.crossfadein_duration_secs > 0.0) {
            return Err(EditorError::config(format!(
                "CROSSFADEIN_DURATION must be positive, got {}",
                self.crossfadein_duration_secs
            )));
        }
        if self.remove_colour_palette
            && !(self.remove_colour_palette_interval_secs.is_finite()
                && self.remove_colour_palette_interval_secs > 0.0)
        {
            return Err(EditorError::config(format!(
                "REMOVE_COLOUR_PALETTE_INTERVAL must be positive, got {}",
                self.remove_colour_palette_interval_secs
            )));
        }
        if !(self.extend_last_frame.is_finite() && self.extend_last_frame >= 0.0) {
            return Err(EditorError::config(format!(
                "EXTEND_LAST_FRAME must be non-negative, got {}",
                self.extend_last_frame
            )));
        }
        Ok(())
    }

    /// Boundary-frame wait budget.
    pub fn missing_image_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.missing_image_timeout_secs)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    ///
    /// Logging is usually not set up yet, so the error that forced the
    /// fallback is handed back for the caller to report.
    pub fn load() -> (Self, Option<EditorError>) {
        Self::load_or_default(&config_file_path())
    }

    /// Load config from `path` if it exists; defaults otherwise.
    pub fn load_or_default(path: &Path) -> (Self, Option<EditorError>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(err) => (Self::default(), Some(err)),
        }
    }

    /// Load config from an explicit path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> EditorResult<Self> {
        if !path.exists() {
            return Err(EditorError::missing_source(path));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| EditorError::config(format!("{}: {e}", path.display())))?;
        config.editor.validate()?;
        Ok(config)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("lecturecut").join("config.json")
}

/// Default working directory, shared by every run on this machine.
fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("video_editing")
}
