//! Interleaved PCM buffer.
//!
//! Samples are `f32` in `[-1.0, 1.0]`, interleaved by channel. All edit
//! positions are in milliseconds and rounded to the nearest frame.

use lecturecut_common::error::{EditorError, EditorResult};
use serde::{Deserialize, Serialize};

/// Sample rate and channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Frames (one sample per channel) in `ms` milliseconds.
    pub fn frames_for_ms(&self, ms: f64) -> usize {
        if ms <= 0.0 {
            return 0;
        }
        (ms * self.sample_rate as f64 / 1000.0).round() as usize
    }
}

/// A block of decoded audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    format: AudioFormat,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> EditorResult<Self> {
        if format.sample_rate == 0 || format.channels == 0 {
            return Err(EditorError::audio(format!(
                "Invalid audio format: {} Hz, {} channels",
                format.sample_rate, format.channels
            )));
        }
        if samples.len() % format.channels as usize != 0 {
            return Err(EditorError::audio(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                format.channels
            )));
        }
        Ok(Self { samples, format })
    }

    /// `duration_ms` of digital silence.
    pub fn silent(duration_ms: f64, format: AudioFormat) -> Self {
        let frames = format.frames_for_ms(duration_ms);
        Self {
            samples: vec![0.0; frames * format.channels as usize],
            format,
        }
    }

    pub fn empty(format: AudioFormat) -> Self {
        Self {
            samples: Vec::new(),
            format,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.format.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        self.frame_count() as f64 * 1000.0 / self.format.sample_rate as f64
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() / 1000.0
    }

    /// Copy of `[start_ms, end_ms)`, clamped to the buffer.
    pub fn slice_ms(&self, start_ms: f64, end_ms: f64) -> Self {
        let total = self.frame_count();
        let start = self.format.frames_for_ms(start_ms).min(total);
        let end = self.format.frames_for_ms(end_ms).clamp(start, total);
        let ch = self.format.channels as usize;
        Self {
            samples: self.samples[start * ch..end * ch].to_vec(),
            format: self.format,
        }
    }

    /// Append another buffer of the same format.
    pub fn append(&mut self, other: &AudioBuffer) -> EditorResult<()> {
        if other.format != self.format {
            return Err(EditorError::audio(format!(
                "Cannot join {:?} audio onto {:?} audio",
                other.format, self.format
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Insert `ms` of silence before the first sample.
    pub fn pad_start_ms(&mut self, ms: f64) {
        let n = self.format.frames_for_ms(ms) * self.format.channels as usize;
        if n > 0 {
            self.samples.splice(0..0, std::iter::repeat(0.0).take(n));
        }
    }

    /// Append `ms` of silence.
    pub fn pad_end_ms(&mut self, ms: f64) {
        let n = self.format.frames_for_ms(ms) * self.format.channels as usize;
        self.samples.resize(self.samples.len() + n, 0.0);
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Peak level in dBFS; `-inf` for silence.
    pub fn max_dbfs(&self) -> f64 {
        amplitude_to_dbfs(self.peak() as f64)
    }
}

/// Convert a linear amplitude (full scale 1.0) to dBFS.
pub fn amplitude_to_dbfs(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * amplitude.log10()
    }
}

/// Convert dBFS to a linear amplitude.
pub fn dbfs_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}
