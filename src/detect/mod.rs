//! Frame classification and violation debouncing.
//!
//! This module contains:
//! - The face-estimation capability boundary
//! - Per-frame classification into behavioral signals
//! - The stateful debouncer that turns signals into violation events

pub mod classifier;
pub mod debounce;
pub mod estimator;

// Re-export commonly used types
pub use classifier::{FrameClassifier, FrameSignal};
pub use debounce::{Debouncer, Emission};
pub use estimator::{EstimatorError, FaceEstimator, ScriptedEstimator, ScriptedOutcome};
