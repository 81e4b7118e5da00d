//! Frame capture for the exam monitor.
//!
//! The capture source is a pure resource wrapper: it owns the live video
//! feed plus an off-screen snapshot of the most recent frame. The actual
//! feed is behind the [`VideoFeed`] trait so embedders can supply their
//! device while the harness and tests use the synthetic feed.

pub mod source;
pub mod synthetic;
pub mod types;

// Re-export commonly used types
pub use source::{CaptureError, CaptureSource, VideoFeed};
pub use synthetic::SyntheticFeed;
pub use types::{FaceBox, FacePrediction, Frame};
