//! Silence-based segmentation.
//!
//! When no event log was recorded, the lecture is split at detected
//! silences instead: each silence is treated as a drawing interval and the
//! speech that follows it (up to the next silence) as its narration.

use lecturecut_common::error::{EditorError, EditorResult};
use lecturecut_project_model::timeline::{Interval, Segment, Timeline, BOUNDARY_EPSILON};

/// Build one edit segment per silence.
///
/// `silences` must be sorted and disjoint. The talk interval of each segment
/// is the gap until the next silence starts; the last one runs to
/// `duration_secs`.
pub fn segments_from_silences(silences: &[Interval], duration_secs: f64) -> EditorResult<Timeline> {
    let first = silences
        .first()
        .ok_or_else(|| EditorError::missing_input("No silence detected; nothing to segment"))?;

    if first.start.abs() > BOUNDARY_EPSILON {
        tracing::warn!(
            first_silence_start = first.start,
            "First silence does NOT start at 0.0"
        );
    }

    let segments = silences
        .iter()
        .enumerate()
        .map(|(i, silence)| {
            let talk_end = silences
                .get(i + 1)
                .map(|next| next.start)
                .unwrap_or(duration_secs);
            Segment::edit(*silence, Interval::new(silence.end, talk_end))
        })
        .collect();

    let timeline = Timeline::from_segments(segments);
    tracing::info!(
        silences = silences.len(),
        duration_secs,
        "Timeline built from detected silences"
    );
    Ok(timeline)
}
