//! Timecode and frame-period utilities.
//!
//! Event logs stamp each line with a wall-clock time of day (`HH:MM:SS`)
//! that is interpreted as elapsed time from `00:00:00`. Audio edits are
//! expressed in milliseconds and video edits in seconds, so this module
//! owns the conversions between the two plus the frame-period arithmetic
//! used when retiming clips.

use chrono::{NaiveTime, Timelike};

/// Parse an `HH:MM:SS` timecode into elapsed seconds since `00:00:00`.
pub fn parse_timecode(raw: &str) -> Option<f64> {
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S").ok()?;
    Some(time.num_seconds_from_midnight() as f64)
}

/// Format elapsed seconds as `HH:MM:SS.mmm`.
pub fn format_timecode(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Convert seconds to milliseconds.
pub fn secs_to_ms(secs: f64) -> f64 {
    secs * 1000.0
}

/// Convert milliseconds to seconds.
pub fn ms_to_secs(ms: f64) -> f64 {
    ms / 1000.0
}

/// Frame timing for a constant-frame-rate clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fps: f64,
}

impl FrameClock {
    /// Create a clock for the given frame rate. Non-positive rates fall
    /// back to 30 fps.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            30.0
        };
        Self { fps }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Duration of one frame in seconds.
    pub fn period(&self) -> f64 {
        1.0 / self.fps
    }

    /// Drop the fractional trailing frame so the duration is a whole
    /// number of frame periods.
    ///
    /// Durations already within 1e-9 of a frame boundary are kept, which
    /// avoids losing a full frame to floating point noise.
    pub fn floor_to_frame(&self, duration_secs: f64) -> f64 {
        if duration_secs <= 0.0 {
            return 0.0;
        }
        let frames = duration_secs * self.fps;
        let whole = (frames + 1e-9).floor();
        whole / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timecode() {
        assert_eq!(parse_timecode("00:00:00"), Some(0.0));
        assert_eq!(parse_timecode("00:01:05"), Some(65.0));
        assert_eq!(parse_timecode(" 01:00:03 "), Some(3603.0));
        assert_eq!(parse_timecode("1:2"), None);
        assert_eq!(parse_timecode("noon"), None);
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "00:00:00.000");
        assert_eq!(format_timecode(3723.25), "01:02:03.250");
    }

    #[test]
    fn test_ms_conversion() {
        assert!((secs_to_ms(1.5) - 1500.0).abs() < 1e-9);
        assert!((ms_to_secs(300.0) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_floor_to_frame_trims_partial_frame() {
        let clock = FrameClock::new(25.0);
        // 25 fps => 0.04s frames; 1.03s holds 25 whole frames plus 0.03s.
        assert!((clock.floor_to_frame(1.03) - 1.0).abs() < 1e-9);
        assert!((clock.floor_to_frame(1.04) - 1.04).abs() < 1e-9);
    }

    #[test]
    fn test_floor_to_frame_keeps_exact_boundaries() {
        let clock = FrameClock::new(30.0);
        let exact = 90.0 / 30.0;
        assert!((clock.floor_to_frame(exact) - 3.0).abs() < 1e-9);
        assert_eq!(clock.floor_to_frame(-1.0), 0.0);
    }

    #[test]
    fn test_invalid_fps_falls_back() {
        assert_eq!(FrameClock::new(0.0).fps(), 30.0);
        assert_eq!(FrameClock::new(f64::NAN).fps(), 30.0);
    }
}
