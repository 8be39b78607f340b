//! lecturecut Audio
//!
//! In-memory narration processing:
//! - **Buffer:** Interleaved `f32` PCM with millisecond slicing and padding
//! - **Effects:** Peak normalization, linear fades, gain
//! - **Silence:** Windowed-RMS silence detection for log-free segmentation
//!
//! Decoding and encoding live in the render engine; everything here works
//! on samples already in memory.

pub mod buffer;
pub mod effects;
pub mod silence;

pub use buffer::*;
pub use effects::*;
pub use silence::*;
