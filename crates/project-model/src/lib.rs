//! lecturecut Project Model
//!
//! Defines the core data contracts for an editing run:
//! - **Events:** Timestamped recording cues (draw, talk, both, stop)
//! - **Timeline:** Ordered edit/raw segments derived from the cues
//! - **Workspace:** Deterministic per-segment artifact names in the working directory
//!
//! All times are seconds from the start of the source recording.

pub mod event;
pub mod timeline;
pub mod workspace;

pub use event::*;
pub use timeline::*;
pub use workspace::*;
