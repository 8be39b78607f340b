//! Retime planning for edit segments.
//!
//! The drawing interval of an edit segment is sped up (or slowed down) so
//! that it lasts as long as its narration. The speed-up is capped; when
//! the cap binds, the pictures outlast the narration and the audio is
//! padded with trailing silence so both tracks still end together.
//!
//! ```text
//! visual  = draw - palette cut-outs + last-frame extension
//! ratio   = min(visual / audio, max_speedx)
//! retimed = visual / ratio             (>= audio)
//! output  = retimed floored to whole frames
//! ```

use lecturecut_common::clock::FrameClock;
use lecturecut_project_model::timeline::Interval;
use serde::Serialize;

/// Speed factor applied to the visual track. Never exceeds `max_speedx`.
///
/// A non-positive audio duration yields `max_speedx`.
pub fn speed_ratio(visual_secs: f64, audio_secs: f64, max_speedx: f64) -> f64 {
    if audio_secs <= 0.0 {
        return max_speedx;
    }
    (visual_secs / audio_secs).min(max_speedx)
}

/// Seconds to hold the last frame.
///
/// `extend_value == 1.0` disables the hold, values above 1.0 are absolute
/// seconds, values below 1.0 are a fraction of `duration_secs`.
pub fn last_frame_extension(extend_value: f64, duration_secs: f64) -> f64 {
    if extend_value == 1.0 {
        0.0
    } else if extend_value > 1.0 {
        extend_value
    } else {
        (duration_secs * extend_value).max(0.0)
    }
}

/// Seconds of `[0, span_secs]` that survive the cut-outs.
///
/// Cut-outs may overlap or extend past the span.
pub fn remaining_after_cutouts(span_secs: f64, cutouts: &[Interval]) -> f64 {
    let mut clipped: Vec<(f64, f64)> = cutouts
        .iter()
        .map(|c| (c.start.max(0.0), c.end.min(span_secs)))
        .filter(|(s, e)| e > s)
        .collect();
    clipped.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut removed = 0.0;
    let mut cursor = 0.0f64;
    for (start, end) in clipped {
        let start = start.max(cursor);
        if end > start {
            removed += end - start;
            cursor = end;
        }
    }
    (span_secs - removed).max(0.0)
}

/// Numbers needed to render one edit segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetimePlan {
    /// Draw interval length after palette cut-outs.
    pub visual_secs: f64,
    /// Last-frame hold added after the cut-outs.
    pub extension_secs: f64,
    pub speed_ratio: f64,
    /// Visual length after retiming.
    pub retimed_secs: f64,
    /// Trailing silence added to the audio so it matches the visual track.
    pub audio_pad_secs: f64,
    /// Final clip length, a whole number of frames.
    pub output_secs: f64,
}

/// Plan the retime of a drawing interval onto `audio_secs` of narration.
pub fn plan_retime(
    draw_secs: f64,
    cutouts: &[Interval],
    extend_value: f64,
    audio_secs: f64,
    max_speedx: f64,
    clock: FrameClock,
) -> RetimePlan {
    let visual_secs = remaining_after_cutouts(draw_secs, cutouts);
    let extension_secs = last_frame_extension(extend_value, visual_secs);
    let total_visual = visual_secs + extension_secs;

    let ratio = speed_ratio(total_visual, audio_secs, max_speedx);
    // Uncapped ratios land exactly on the narration length.
    let retimed_secs = if ratio < max_speedx {
        audio_secs
    } else {
        total_visual / max_speedx
    };
    let audio_pad_secs = (retimed_secs - audio_secs).max(0.0);
    let output_secs = clock.floor_to_frame(retimed_secs.max(audio_secs));

    RetimePlan {
        visual_secs,
        extension_secs,
        speed_ratio: ratio,
        retimed_secs,
        audio_pad_secs,
        output_secs,
    }
}
