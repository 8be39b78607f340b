//! Timeline segments: the editing decisions derived from a recording.
//!
//! A timeline is an ordered list of segments. Each segment is either an
//! *edit* segment, where the screen capture of a drawing interval is retimed
//! to fit the narration recorded in a later talk interval, or a *raw*
//! segment, where original audio and video are kept together.

use lecturecut_common::error::EditorError;
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing segment boundaries.
pub const BOUNDARY_EPSILON: f64 = 1e-6;

/// A closed time range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.duration() <= BOUNDARY_EPSILON
    }

    /// Shift both ends so `origin` becomes zero.
    pub fn relative_to(&self, origin: f64) -> Self {
        Self::new(self.start - origin, self.end - origin)
    }
}

/// One editing unit of the output video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Segment {
    /// Screen capture from `draw`, narrated by the audio recorded in `talk`.
    Edit { draw: Interval, talk: Interval },

    /// Original audio and video kept together.
    Raw { both: Interval },
}

impl Segment {
    pub fn edit(draw: Interval, talk: Interval) -> Self {
        Self::Edit { draw, talk }
    }

    pub fn raw(both: Interval) -> Self {
        Self::Raw { both }
    }

    /// Earliest source time this segment reads.
    pub fn start(&self) -> f64 {
        match self {
            Self::Edit { draw, .. } => draw.start,
            Self::Raw { both } => both.start,
        }
    }

    /// Latest source time this segment reads.
    pub fn end(&self) -> f64 {
        match self {
            Self::Edit { draw, talk } => draw.end.max(talk.end),
            Self::Raw { both } => both.end,
        }
    }

    /// Source span that must be extracted for this segment.
    pub fn source_span(&self) -> Interval {
        Interval::new(self.start(), self.end())
    }

    /// Source span whose pictures end up in the output.
    pub fn visual(&self) -> Interval {
        match self {
            Self::Edit { draw, .. } => *draw,
            Self::Raw { both } => *both,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, Self::Edit { .. })
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Edit { .. } => "edit",
            Self::Raw { .. } => "raw",
        }
    }
}

/// Problems found when checking a finished timeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("timeline has no segments")]
    Empty,

    #[error("segment {index} has an inverted interval [{start}, {end}]")]
    Inverted { index: usize, start: f64, end: f64 },

    #[error("segment {index} starts at {start}s before segment {previous} ends at {previous_end}s")]
    Overlap {
        index: usize,
        previous: usize,
        start: f64,
        previous_end: f64,
    },
}

impl From<TimelineError> for EditorError {
    fn from(err: TimelineError) -> Self {
        EditorError::missing_input(err.to_string())
    }
}

/// Ordered list of segments for one editing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub segments: Vec<Segment>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Check ordering and interval sanity.
    ///
    /// Gaps are allowed (a Stop cue pauses the recording); overlaps and
    /// inverted intervals are not.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.segments.is_empty() {
            return Err(TimelineError::Empty);
        }

        for (index, segment) in self.segments.iter().enumerate() {
            let intervals: Vec<Interval> = match segment {
                Segment::Edit { draw, talk } => vec![*draw, *talk],
                Segment::Raw { both } => vec![*both],
            };
            for interval in intervals {
                if interval.end + BOUNDARY_EPSILON < interval.start {
                    return Err(TimelineError::Inverted {
                        index,
                        start: interval.start,
                        end: interval.end,
                    });
                }
            }

            if index > 0 {
                let previous_end = self.segments[index - 1].end();
                if segment.start() + BOUNDARY_EPSILON < previous_end {
                    return Err(TimelineError::Overlap {
                        index,
                        previous: index - 1,
                        start: segment.start(),
                        previous_end,
                    });
                }
            }
        }
        Ok(())
    }

    /// Source ranges in `[0, duration]` not claimed by any segment.
    pub fn gaps(&self, duration_secs: f64) -> Vec<Interval> {
        let mut gaps = Vec::new();
        let mut cursor = 0.0;
        for segment in &self.segments {
            if segment.start() > cursor + BOUNDARY_EPSILON {
                gaps.push(Interval::new(cursor, segment.start()));
            }
            cursor = f64::max(cursor, segment.end());
        }
        if duration_secs > cursor + BOUNDARY_EPSILON {
            gaps.push(Interval::new(cursor, duration_secs));
        }
        gaps
    }

    /// Whether the segments tile `[0, duration]` exactly.
    pub fn covers(&self, duration_secs: f64) -> bool {
        if self.validate().is_err() || !self.gaps(duration_secs).is_empty() {
            return false;
        }
        self.segments
            .last()
            .map(|last| (last.end() - duration_secs).abs() <= BOUNDARY_EPSILON)
            .unwrap_or(false)
    }

    /// Human-readable table of the segments.
    pub fn summary(&self) -> String {
        const WIDTH: usize = 6;
        const PRECISION: usize = 1;

        let mut out = String::from("--------------- Timestamps ----------------\n");
        for segment in &self.segments {
            match segment {
                Segment::Edit { draw, talk } => {
                    out.push_str(&format!(
                        "Edit: Draw [{:>WIDTH$.PRECISION$}, {:>WIDTH$.PRECISION$}] - {:>WIDTH$.PRECISION$}\n",
                        draw.start,
                        draw.end,
                        draw.duration(),
                    ));
                    out.push_str(&format!(
                        "Edit: Talk [{:>WIDTH$.PRECISION$}, {:>WIDTH$.PRECISION$}] - {:>WIDTH$.PRECISION$}\n",
                        talk.start,
                        talk.end,
                        talk.duration(),
                    ));
                }
                Segment::Raw { both } => {
                    out.push_str(&format!(
                        "Raw : Both [{:>WIDTH$.PRECISION$}, {:>WIDTH$.PRECISION$}] - {:>WIDTH$.PRECISION$}\n",
                        both.start,
                        both.end,
                        both.duration(),
                    ));
                }
            }
        }
        out.push_str("-------------------------------------------");
        out
    }
}
