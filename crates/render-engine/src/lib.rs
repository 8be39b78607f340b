//! lecturecut Render Engine
//!
//! Offline pipeline that turns a lecture recording and its timeline into
//! the final edited video.
//!
//! # Pipeline Architecture
//!
//! ```text
//! lecture.mp4 ──┐
//!               ├── Timeline (event log or silences)
//! events.log ───┘         │
//!                         ├── Extract sub-clips (frame-accurate)
//!                         │         │
//!                         │         ├── segment 0: frame ─ synthesize ─────────── output0
//!                         │         ├── segment 1: frame ─ synthesize ─ crossfade ─ output1
//!                         │         └── segment N: ...        ▲ boundary frame of N-1
//!                         ▼
//!                   Concatenate (stream copy)
//!                         │
//!                         ▼
//!                     edited.mp4
//! ```

pub mod backend;
pub mod concat;
pub mod ffmpeg;
pub mod pipeline;
pub mod stitcher;
pub mod synthesizer;

pub use backend::*;
pub use ffmpeg::FfmpegBackend;
pub use pipeline::*;
