//! Colour-palette detection.
//!
//! The drawing application shows a colour palette while the lecturer picks
//! a pen colour. Those moments are noise in the final video, so the palette
//! intervals can be cut from drawing segments.
//!
//! Detection samples one frame per interval and looks at a handful of fixed
//! probe pixels: the palette is hidden as soon as any probe is pure white.

use lecturecut_project_model::timeline::Interval;

/// Probe pixels as `(row, column)` from the top-left corner, located on a
/// 1080p capture with the palette open.
pub const DEFAULT_PALETTE_PROBES: [(u32, u32); 4] = [(440, 1530), (650, 1530), (440, 1890), (870, 1590)];

/// A decoded RGB24 frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    /// Packed `[r, g, b]` rows, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// A frame filled with one colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn pixel(&self, row: u32, col: u32) -> Option<[u8; 3]> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let offset = (row as usize * self.width as usize + col as usize) * 3;
        Some([self.data[offset], self.data[offset + 1], self.data[offset + 2]])
    }

    pub fn set_pixel(&mut self, row: u32, col: u32, rgb: [u8; 3]) {
        if row < self.height && col < self.width {
            let offset = (row as usize * self.width as usize + col as usize) * 3;
            self.data[offset..offset + 3].copy_from_slice(&rgb);
        }
    }
}

/// Fixed-pixel palette detector.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteProbe {
    pixels: Vec<(u32, u32)>,
}

impl Default for PaletteProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE_PROBES.to_vec())
    }
}

impl PaletteProbe {
    pub fn new(pixels: Vec<(u32, u32)>) -> Self {
        Self { pixels }
    }

    /// Whether the palette is open in `frame`.
    ///
    /// Probes outside the frame count as white, so captures smaller than
    /// the reference resolution never report a palette.
    pub fn is_visible(&self, frame: &RgbFrame) -> bool {
        !self.pixels.is_empty()
            && self
                .pixels
                .iter()
                .all(|&(row, col)| matches!(frame.pixel(row, col), Some(p) if p != [255, 255, 255]))
    }
}

/// Times at which frames are sampled: `0, interval, 2*interval, ...` below
/// `duration_secs`.
pub fn sample_times(interval_secs: f64, duration_secs: f64) -> Vec<f64> {
    if interval_secs <= 0.0 || duration_secs <= 0.0 {
        return Vec::new();
    }
    let count = (duration_secs / interval_secs).ceil() as usize;
    (0..count)
        .map(|k| k as f64 * interval_secs)
        .filter(|t| *t < duration_secs)
        .collect()
}

/// Turn per-sample visibility into cut-out intervals.
///
/// `visible[k]` is the detection at `k * interval_secs`. Each palette run is
/// widened by one interval on both sides (the palette may open or close
/// between samples), clamped to `[0, duration]`, and overlapping runs are
/// merged.
pub fn palette_intervals(visible: &[bool], interval_secs: f64, duration_secs: f64) -> Vec<Interval> {
    let mut raw: Vec<Interval> = Vec::new();
    let mut open: Option<f64> = None;

    for (k, &active) in visible.iter().enumerate() {
        let t = k as f64 * interval_secs;
        match (open, active) {
            (None, true) => open = Some((t - interval_secs).max(0.0)),
            (Some(start), false) => {
                raw.push(Interval::new(start, (t + interval_secs).min(duration_secs)));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        raw.push(Interval::new(start, duration_secs));
    }

    let mut merged: Vec<Interval> = Vec::with_capacity(raw.len());
    for interval in raw {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => last.end = last.end.max(interval.end),
            _ => merged.push(interval),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_palette(open: bool) -> RgbFrame {
        let mut frame = RgbFrame::filled(1920, 1080, [255, 255, 255]);
        if open {
            for (row, col) in DEFAULT_PALETTE_PROBES {
                frame.set_pixel(row, col, [200, 30, 30]);
            }
        }
        frame
    }

    #[test]
    fn test_probe_detects_open_palette() {
        let probe = PaletteProbe::default();
        assert!(probe.is_visible(&frame_with_palette(true)));
        assert!(!probe.is_visible(&frame_with_palette(false)));
    }

    #[test]
    fn test_one_white_probe_hides_palette() {
        let probe = PaletteProbe::default();
        let mut frame = frame_with_palette(true);
        frame.set_pixel(870, 1590, [255, 255, 255]);
        assert!(!probe.is_visible(&frame));
    }

    #[test]
    fn test_small_frames_never_report_palette() {
        let probe = PaletteProbe::default();
        let frame = RgbFrame::filled(1280, 720, [0, 0, 0]);
        assert!(!probe.is_visible(&frame));
    }

    #[test]
    fn test_sample_times() {
        assert_eq!(sample_times(1.0, 3.5), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(sample_times(1.0, 3.0), vec![0.0, 1.0, 2.0]);
        assert!(sample_times(0.0, 3.0).is_empty());
    }

    #[test]
    fn test_palette_run_is_widened_by_one_interval() {
        // Palette visible at t=3 and t=4.
        let visible = [false, false, false, true, true, false, false, false];
        let intervals = palette_intervals(&visible, 1.0, 8.0);
        assert_eq!(intervals, vec![Interval::new(2.0, 6.0)]);
    }

    #[test]
    fn test_palette_open_at_end_runs_to_duration() {
        let visible = [true, false, false, true];
        // [0, 2] and [2, 3.5] touch and are merged.
        let intervals = palette_intervals(&visible, 1.0, 3.5);
        assert_eq!(intervals, vec![Interval::new(0.0, 3.5)]);
    }

    #[test]
    fn test_no_palette_no_intervals() {
        assert!(palette_intervals(&[false; 5], 1.0, 5.0).is_empty());
    }
}
