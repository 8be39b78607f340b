//! In-memory media backend for synthesizer and pipeline tests.
//!
//! Files are touched on disk so existence checks behave, but nothing is
//! encoded. Durations are tracked per path so decoded audio has the length
//! the real clip would have.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lecturecut_audio::{AudioBuffer, AudioFormat};
use lecturecut_common::config::AppConfig;
use lecturecut_common::error::{EditorError, EditorResult};
use lecturecut_processing_core::palette::{sample_times, PaletteProbe, RgbFrame, DEFAULT_PALETTE_PROBES};
use lecturecut_project_model::timeline::Interval;
use lecturecut_render_engine::{MediaBackend, MediaInfo, RenderJob};

#[derive(Debug, Default)]
pub struct FakeState {
    /// Seconds of media behind each path written so far.
    pub durations: HashMap<PathBuf, f64>,
    pub extracted: Vec<(PathBuf, Interval)>,
    pub written_audio: HashMap<PathBuf, f64>,
    pub saved_frames: Vec<(PathBuf, f64)>,
    /// Format of every audio decode, by file name.
    pub audio_reads: Vec<(String, AudioFormat)>,
    /// Clip-relative times of every palette sample.
    pub palette_samples: Vec<f64>,
    pub jobs: Vec<RenderJob>,
    pub concat_lists: Vec<String>,
}

pub struct FakeBackend {
    pub info: MediaInfo,
    pub source: PathBuf,
    /// Audio returned for the whole recording.
    pub source_audio: Option<AudioBuffer>,
    /// Frame saves that fail, by destination file name.
    pub failing_frames: HashSet<String>,
    /// Frame saves that report success without writing the file.
    pub phantom_frames: HashSet<String>,
    /// Palette visibility per sampled frame.
    pub palette: Vec<bool>,
    pub state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new(source: &Path, duration_secs: f64) -> Self {
        Self {
            info: MediaInfo {
                duration_secs,
                fps: 30.0,
                width: 1920,
                height: 1080,
            },
            source: source.to_path_buf(),
            source_audio: None,
            failing_frames: HashSet::new(),
            phantom_frames: HashSet::new(),
            palette: Vec::new(),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn jobs(&self) -> Vec<RenderJob> {
        self.state.lock().unwrap().jobs.clone()
    }

    pub fn written_audio_secs(&self, path: &Path) -> Option<f64> {
        self.state.lock().unwrap().written_audio.get(path).copied()
    }

    pub fn concat_lists(&self) -> Vec<String> {
        self.state.lock().unwrap().concat_lists.clone()
    }

    fn duration_of(&self, path: &Path) -> EditorResult<f64> {
        if path == self.source {
            return Ok(self.info.duration_secs);
        }
        self.state
            .lock()
            .unwrap()
            .durations
            .get(path)
            .copied()
            .ok_or_else(|| EditorError::missing_source(path))
    }

    fn produce(&self, path: &Path, duration_secs: f64) -> EditorResult<()> {
        std::fs::write(path, b"fake media")?;
        self.state
            .lock()
            .unwrap()
            .durations
            .insert(path.to_path_buf(), duration_secs);
        Ok(())
    }
}

/// Alternating `±level` samples, a tone loud enough to never read as silence.
pub fn tone(duration_secs: f64, level: f32, format: AudioFormat) -> AudioBuffer {
    let frames = format.frames_for_ms(duration_secs * 1000.0);
    let samples = (0..frames * format.channels as usize)
        .map(|i| if (i / format.channels as usize) % 2 == 0 { level } else { -level })
        .collect();
    AudioBuffer::new(samples, format).unwrap()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl MediaBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn probe(&self, path: &Path) -> EditorResult<MediaInfo> {
        let duration_secs = self.duration_of(path)?;
        Ok(MediaInfo {
            duration_secs,
            ..self.info
        })
    }

    fn extract_clip(&self, source: &Path, span: Interval, dest: &Path) -> EditorResult<()> {
        if !source.exists() {
            return Err(EditorError::missing_source(source));
        }
        self.state
            .lock()
            .unwrap()
            .extracted
            .push((dest.to_path_buf(), span));
        self.produce(dest, span.duration())
    }

    fn extract_audio(&self, video: &Path, _format: AudioFormat, dest: &Path) -> EditorResult<()> {
        let duration = self.duration_of(video)?;
        self.produce(dest, duration)
    }

    fn read_audio(&self, path: &Path, format: AudioFormat) -> EditorResult<AudioBuffer> {
        self.state
            .lock()
            .unwrap()
            .audio_reads
            .push((file_name(path), format));
        if file_name(path) == "temp_audio.wav" {
            if let Some(audio) = &self.source_audio {
                return Ok(audio.clone());
            }
        }
        let duration = self.duration_of(path)?;
        Ok(tone(duration, 0.25, format))
    }

    fn write_audio(&self, buffer: &AudioBuffer, dest: &Path) -> EditorResult<()> {
        self.state
            .lock()
            .unwrap()
            .written_audio
            .insert(dest.to_path_buf(), buffer.duration_secs());
        self.produce(dest, buffer.duration_secs())
    }

    fn save_frame(&self, video: &Path, at_secs: f64, dest: &Path) -> EditorResult<()> {
        let name = file_name(dest);
        if self.failing_frames.contains(&name) {
            return Err(EditorError::media(format!("cannot decode frame for {name}")));
        }
        self.duration_of(video)?;
        self.state
            .lock()
            .unwrap()
            .saved_frames
            .push((dest.to_path_buf(), at_secs));
        if self.phantom_frames.contains(&name) {
            return Ok(());
        }
        std::fs::write(dest, b"fake jpeg")?;
        Ok(())
    }

    fn scan_palette(
        &self,
        _video: &Path,
        span: Interval,
        interval_secs: f64,
        probe: &PaletteProbe,
    ) -> EditorResult<Vec<bool>> {
        let blank = RgbFrame::filled(1920, 1080, [255, 255, 255]);
        let mut open = blank.clone();
        for (row, col) in DEFAULT_PALETTE_PROBES {
            open.set_pixel(row, col, [20, 120, 220]);
        }
        let times = sample_times(interval_secs, span.duration());
        self.state.lock().unwrap().palette_samples.extend_from_slice(&times);
        Ok((0..times.len())
            .map(|k| {
                let frame = if self.palette.get(k).copied().unwrap_or(false) {
                    &open
                } else {
                    &blank
                };
                probe.is_visible(frame)
            })
            .collect())
    }

    fn render(&self, job: &RenderJob) -> EditorResult<()> {
        let duration = match job {
            RenderJob::Retime { output_secs, .. } | RenderJob::Remux { output_secs, .. } => {
                *output_secs
            }
            RenderJob::Crossfade { duration_secs, .. } => *duration_secs,
            RenderJob::TrimHead {
                video, offset_secs, ..
            } => self.duration_of(video)? - offset_secs,
        };
        self.state.lock().unwrap().jobs.push(job.clone());
        self.produce(job.dest(), duration)
    }

    fn concat(&self, list: &Path, dest: &Path) -> EditorResult<()> {
        let content = std::fs::read_to_string(list)?;
        self.state.lock().unwrap().concat_lists.push(content);
        self.produce(dest, 0.0)
    }
}

/// Fresh scratch directory holding a fake source recording.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lecturecut_it_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("lecture.mp4"), b"fake source").unwrap();
    dir
}

/// Defaults with a small mono audio format and no last-frame hold.
pub fn test_config(scratch: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.work_dir = scratch.join("work");
    config.output.audio_sample_rate = 8000;
    config.output.audio_channels = 1;
    config.editor.extend_last_frame = 1.0;
    config
}

pub fn fixture_log(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("logs")
        .join(name)
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
