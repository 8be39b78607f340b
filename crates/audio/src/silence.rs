//! Silence detection.
//!
//! A window of `min_silence_ms` slides over the audio one `seek_step_ms`
//! at a time. Windows whose RMS level is at or below the threshold are
//! silent; overlapping or touching silent windows merge into one range.

use lecturecut_common::clock::ms_to_secs;
use lecturecut_project_model::timeline::Interval;
use serde::{Deserialize, Serialize};

use crate::buffer::{dbfs_to_amplitude, AudioBuffer};

/// Detector parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceSettings {
    pub min_silence_ms: u64,
    pub threshold_db: f64,
    pub seek_step_ms: u64,
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            min_silence_ms: 5000,
            threshold_db: -40.0,
            seek_step_ms: 1,
        }
    }
}

/// Silent ranges in milliseconds, as `(start_ms, end_ms)`.
pub fn detect_silence_ms(buffer: &AudioBuffer, settings: &SilenceSettings) -> Vec<(u64, u64)> {
    let min_len = settings.min_silence_ms;
    let step = settings.seek_step_ms.max(1);
    let total_ms = buffer.duration_ms().floor() as u64;
    if min_len == 0 || total_ms < min_len {
        return Vec::new();
    }

    let format = buffer.format();
    let ch = format.channels as usize;

    // Per-frame energy prefix sums, so each window costs O(1).
    let mut prefix = Vec::with_capacity(buffer.frame_count() + 1);
    prefix.push(0.0f64);
    let mut running = 0.0f64;
    for frame in buffer.samples().chunks_exact(ch) {
        running += frame.iter().map(|s| (*s as f64) * (*s as f64)).sum::<f64>();
        prefix.push(running);
    }

    let threshold = dbfs_to_amplitude(settings.threshold_db);
    let window_frames = format.frames_for_ms(min_len as f64).max(1);
    let last_start = total_ms - min_len;

    let mut silent_starts = Vec::new();
    let mut start_ms = 0u64;
    loop {
        let first = format.frames_for_ms(start_ms as f64);
        let last = (first + window_frames).min(prefix.len() - 1);
        if last > first {
            let energy = prefix[last] - prefix[first];
            let rms = (energy / ((last - first) * ch) as f64).sqrt();
            if rms <= threshold {
                silent_starts.push(start_ms);
            }
        }
        if start_ms == last_start {
            break;
        }
        start_ms = (start_ms + step).min(last_start);
    }

    let mut ranges: Vec<(u64, u64)> = Vec::new();
    let mut current: Option<(u64, u64)> = None;
    for start in silent_starts {
        current = match current {
            Some((range_start, prev)) if start <= prev + min_len => Some((range_start, start)),
            Some((range_start, prev)) => {
                ranges.push((range_start, prev + min_len));
                Some((start, start))
            }
            None => Some((start, start)),
        };
    }
    if let Some((range_start, prev)) = current {
        ranges.push((range_start, prev + min_len));
    }
    ranges
}

/// Silent ranges as second-based intervals.
pub fn detect_silence(buffer: &AudioBuffer, settings: &SilenceSettings) -> Vec<Interval> {
    let ranges = detect_silence_ms(buffer, settings);
    tracing::info!(
        silences = ranges.len(),
        min_silence_ms = settings.min_silence_ms,
        threshold_db = settings.threshold_db,
        "Silence detection complete"
    );
    ranges
        .into_iter()
        .map(|(start, end)| Interval::new(ms_to_secs(start as f64), ms_to_secs(end as f64)))
        .collect()
}
