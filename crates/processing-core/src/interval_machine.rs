//! Interval state machine: recording cues to timeline segments.
//!
//! # States
//!
//! The machine is in one of four states: `Stopped` (initial), `Drawing`,
//! `Talking`, or `Both`. Each cue closes whatever interval is open and
//! opens the next one:
//!
//! | State    | Draw                 | Talk                   | Both              | Stop       |
//! |----------|----------------------|------------------------|-------------------|------------|
//! | Stopped  | open edit            | resume talk on last edit | open raw        | no-op      |
//! | Drawing  | close, open new edit | close draw, open talk  | **illegal**       | close draw |
//! | Talking  | close, open new edit | restart talk           | close, open raw   | close talk |
//! | Both     | close, open new edit | **illegal**            | close, open raw   | close both |
//!
//! At the end of the log, an open draw, talk, or both interval runs to the
//! end of the video.
//!
//! A redraw leaves the abandoned drawing behind as an edit with nothing to
//! narrate it. [`build_timeline_from_log`] drops those with
//! [`drop_superseded_drawings`], so the new drawing starts the section.
//!
//! The accumulator ([`TimelineBuilder`]) is threaded through the pure
//! [`transition`] function, so every cell of the table can be exercised
//! without touching the filesystem.

use lecturecut_common::error::EditorError;
use lecturecut_project_model::event::{Event, EventKind, EventLog};
use lecturecut_project_model::timeline::{Interval, Segment, Timeline, BOUNDARY_EPSILON};

/// Current mode of the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineState {
    #[default]
    Stopped,
    Drawing,
    Talking,
    Both,
}

/// Cue sequences the recording workflow forbids.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("TalkWithoutDraw: 'talk' at {at_secs}s has no preceding 'draw'")]
    TalkWithoutDraw { at_secs: f64 },

    #[error("BothAfterDrawWithoutTalk: can't go from 'draw' to 'both' at {at_secs}s without 'talk' in between")]
    BothAfterDrawWithoutTalk { at_secs: f64 },

    #[error("TalkAfterBothWithoutDraw: can't go from 'both' to 'talk' at {at_secs}s without 'draw' in between")]
    TalkAfterBothWithoutDraw { at_secs: f64 },
}

impl TransitionError {
    /// Time of the offending cue.
    pub fn at_secs(&self) -> f64 {
        match *self {
            Self::TalkWithoutDraw { at_secs }
            | Self::BothAfterDrawWithoutTalk { at_secs }
            | Self::TalkAfterBothWithoutDraw { at_secs } => at_secs,
        }
    }
}

impl From<TransitionError> for EditorError {
    fn from(err: TransitionError) -> Self {
        EditorError::illegal_transition(err.at_secs(), err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenInterval {
    start: f64,
    end: Option<f64>,
}

impl OpenInterval {
    fn open(start: f64) -> Self {
        Self { start, end: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OpenSegment {
    Edit {
        draw: OpenInterval,
        talk: Option<OpenInterval>,
    },
    Raw {
        both: OpenInterval,
    },
}

/// Segments under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineBuilder {
    segments: Vec<OpenSegment>,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn open_edit(&mut self, t: f64) {
        self.segments.push(OpenSegment::Edit {
            draw: OpenInterval::open(t),
            talk: None,
        });
    }

    fn open_raw(&mut self, t: f64) {
        self.segments.push(OpenSegment::Raw {
            both: OpenInterval::open(t),
        });
    }

    fn close_draw(&mut self, t: f64) {
        if let Some(OpenSegment::Edit { draw, .. }) = self.segments.last_mut() {
            draw.end = Some(t);
        }
    }

    /// Open (or reopen) the talk interval of the last edit segment.
    /// Returns false when the last segment is not an edit segment.
    fn open_talk(&mut self, t: f64) -> bool {
        match self.segments.last_mut() {
            Some(OpenSegment::Edit { talk, .. }) => {
                *talk = Some(OpenInterval::open(t));
                true
            }
            _ => false,
        }
    }

    fn close_talk(&mut self, t: f64) {
        if let Some(OpenSegment::Edit {
            talk: Some(talk), ..
        }) = self.segments.last_mut()
        {
            talk.end = Some(t);
        }
    }

    fn close_both(&mut self, t: f64) {
        if let Some(OpenSegment::Raw { both }) = self.segments.last_mut() {
            both.end = Some(t);
        }
    }

    /// Resolve every interval into a timeline.
    ///
    /// An edit segment that never received a talk cue gets an empty talk
    /// interval at the end of its drawing.
    fn into_timeline(self, duration_secs: f64) -> Timeline {
        let segments = self
            .segments
            .into_iter()
            .map(|segment| match segment {
                OpenSegment::Edit { draw, talk } => {
                    let draw_end = draw.end.unwrap_or(duration_secs);
                    let talk = match talk {
                        Some(talk) => Interval::new(talk.start, talk.end.unwrap_or(duration_secs)),
                        None => Interval::new(draw_end, draw_end),
                    };
                    Segment::edit(Interval::new(draw.start, draw_end), talk)
                }
                OpenSegment::Raw { both } => {
                    Segment::raw(Interval::new(both.start, both.end.unwrap_or(duration_secs)))
                }
            })
            .collect();
        Timeline::from_segments(segments)
    }
}

/// Apply one cue.
///
/// Returns the next state together with the updated accumulator, or the
/// violated rule.
pub fn transition(
    state: MachineState,
    mut acc: TimelineBuilder,
    event: Event,
) -> Result<(MachineState, TimelineBuilder), TransitionError> {
    let t = event.timestamp_secs;
    use EventKind as E;
    use MachineState as S;

    let next = match (state, event.kind) {
        (S::Stopped, E::Draw) => {
            acc.open_edit(t);
            S::Drawing
        }
        (S::Stopped, E::Talk) => {
            if !acc.open_talk(t) {
                return Err(TransitionError::TalkWithoutDraw { at_secs: t });
            }
            S::Talking
        }
        (S::Stopped, E::Both) => {
            acc.open_raw(t);
            S::Both
        }
        (S::Stopped, E::Stop) => S::Stopped,

        (S::Drawing, E::Draw) => {
            acc.close_draw(t);
            acc.open_edit(t);
            S::Drawing
        }
        (S::Drawing, E::Talk) => {
            acc.close_draw(t);
            acc.open_talk(t);
            S::Talking
        }
        (S::Drawing, E::Both) => {
            return Err(TransitionError::BothAfterDrawWithoutTalk { at_secs: t });
        }
        (S::Drawing, E::Stop) => {
            acc.close_draw(t);
            S::Stopped
        }

        (S::Talking, E::Draw) => {
            acc.close_talk(t);
            acc.open_edit(t);
            S::Drawing
        }
        (S::Talking, E::Talk) => {
            acc.close_talk(t);
            acc.open_talk(t);
            S::Talking
        }
        (S::Talking, E::Both) => {
            acc.close_talk(t);
            acc.open_raw(t);
            S::Both
        }
        (S::Talking, E::Stop) => {
            acc.close_talk(t);
            S::Stopped
        }

        (S::Both, E::Draw) => {
            acc.close_both(t);
            acc.open_edit(t);
            S::Drawing
        }
        (S::Both, E::Talk) => {
            return Err(TransitionError::TalkAfterBothWithoutDraw { at_secs: t });
        }
        (S::Both, E::Both) => {
            acc.close_both(t);
            acc.open_raw(t);
            S::Both
        }
        (S::Both, E::Stop) => {
            acc.close_both(t);
            S::Stopped
        }
    };

    Ok((next, acc))
}

/// Close whatever interval is still open at the end of the log.
pub fn close_at_end(state: MachineState, mut acc: TimelineBuilder, duration_secs: f64) -> TimelineBuilder {
    match state {
        MachineState::Drawing => acc.close_draw(duration_secs),
        MachineState::Talking => acc.close_talk(duration_secs),
        MachineState::Both => acc.close_both(duration_secs),
        MachineState::Stopped => {}
    }
    acc
}

/// Stateful wrapper around [`transition`] for incremental use.
#[derive(Debug, Clone, Default)]
pub struct IntervalMachine {
    state: MachineState,
    acc: TimelineBuilder,
}

impl IntervalMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Feed one cue. On error the machine is left unchanged.
    pub fn apply(&mut self, event: Event) -> Result<MachineState, TransitionError> {
        let (state, acc) = transition(self.state, self.acc.clone(), event)?;
        tracing::trace!(t = event.timestamp_secs, cue = event.kind.log_name(), from = ?self.state, to = ?state, "Cue applied");
        self.state = state;
        self.acc = acc;
        Ok(state)
    }

    /// Close open intervals at `duration_secs` and produce the timeline.
    pub fn finish(self, duration_secs: f64) -> Timeline {
        if self.state == MachineState::Both {
            tracing::debug!(
                duration_secs,
                "Log ends inside a 'both' section; running it to the end of the video"
            );
        }
        close_at_end(self.state, self.acc, duration_secs).into_timeline(duration_secs)
    }
}

/// Build a timeline from a cue sequence over a video of `duration_secs`.
pub fn build_timeline(events: &[Event], duration_secs: f64) -> Result<Timeline, TransitionError> {
    let mut machine = IntervalMachine::new();
    for event in events {
        machine.apply(*event)?;
    }
    Ok(machine.finish(duration_secs))
}

/// Remove drawings abandoned by a redraw.
///
/// An edit segment whose talk is empty and pinned to the end of its drawing,
/// followed by an edit whose drawing starts at that same instant, was closed
/// by a Draw cue before any narration. Its footage becomes a gap.
pub fn drop_superseded_drawings(timeline: Timeline) -> Timeline {
    let mut kept = Vec::with_capacity(timeline.len());
    let mut rest = timeline.segments.into_iter().peekable();
    while let Some(segment) = rest.next() {
        let superseded = match (&segment, rest.peek()) {
            (Segment::Edit { draw, talk }, Some(Segment::Edit { draw: next, .. })) => {
                talk.is_empty()
                    && (talk.start - draw.end).abs() <= BOUNDARY_EPSILON
                    && (next.start - draw.end).abs() <= BOUNDARY_EPSILON
            }
            _ => false,
        };
        if superseded {
            tracing::debug!(
                start = segment.start(),
                end = segment.end(),
                "Dropping drawing restarted before any narration"
            );
        } else {
            kept.push(segment);
        }
    }
    Timeline::from_segments(kept)
}

/// Build a timeline from a parsed log, reporting skipped cues.
pub fn build_timeline_from_log(log: &EventLog, duration_secs: f64) -> Result<Timeline, TransitionError> {
    if !log.unrecognized.is_empty() {
        tracing::warn!(
            skipped = log.unrecognized.len(),
            "Event log contains unrecognized events"
        );
    }
    let timeline = drop_superseded_drawings(build_timeline(&log.events, duration_secs)?);
    tracing::info!(
        events = log.events.len(),
        segments = timeline.len(),
        duration_secs,
        "Timeline built from event log"
    );
    Ok(timeline)
}
