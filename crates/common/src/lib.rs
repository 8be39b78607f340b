//! lecturecut Common Utilities
//!
//! Shared infrastructure for all lecturecut crates:
//! - Error types and result aliases
//! - Timecode and frame-period helpers
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
