//! lecturecut Processing Core
//!
//! Turns recording cues or detected silences into an editing timeline and
//! plans how each segment is retimed:
//! - **Interval Machine:** Four-state reconstruction of edit/raw segments from cues
//! - **Silence Segmenter:** Edit segments from silence/speech alternation
//! - **Retime:** Speed ratio, last-frame extension, frame-accurate durations
//! - **Palette:** Colour-palette visibility detection and cut-out intervals
//!
//! This crate is pure computation: no I/O, no external processes.
//! All inputs are data; all outputs are data.

pub mod interval_machine;
pub mod palette;
pub mod retime;
pub mod silence_segmenter;

pub use interval_machine::{build_timeline, drop_superseded_drawings, IntervalMachine, MachineState, TransitionError};
pub use silence_segmenter::segments_from_silences;
