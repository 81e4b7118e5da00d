//! Face-geometry estimation capability boundary.
//!
//! The model itself is opaque to the monitor: it is consumed strictly as
//! `detect_faces(frame) -> predictions`. The monitor never trains or
//! calibrates it.

use crate::capture::types::{FacePrediction, Frame};

/// The face-estimation capability.
pub trait FaceEstimator: Send {
    /// Identifying label for diagnostics.
    fn describe(&self) -> String;

    /// Run detection on one frame. Implementations must return within a
    /// bounded time; a wedged backend is reported as an error.
    fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<FacePrediction>, EstimatorError>;
}

/// Errors from the estimation capability.
#[derive(Debug)]
pub enum EstimatorError {
    /// The capability cannot be acquired at all
    Unavailable(String),
    /// A single detection call failed; the sampling cycle is skipped
    Detection(String),
}

impl std::fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimatorError::Unavailable(msg) => write!(f, "Face estimation unavailable: {msg}"),
            EstimatorError::Detection(msg) => write!(f, "Face detection error: {msg}"),
        }
    }
}

impl std::error::Error for EstimatorError {}

/// One scripted estimator outcome.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Faces(Vec<FacePrediction>),
    Error(String),
}

/// Estimator that replays a fixed outcome sequence, wrapping around.
///
/// Used by the operator harness scenarios and the test suite.
pub struct ScriptedEstimator {
    script: Vec<ScriptedOutcome>,
    cursor: usize,
}

impl ScriptedEstimator {
    pub fn new(script: Vec<ScriptedOutcome>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl FaceEstimator for ScriptedEstimator {
    fn describe(&self) -> String {
        format!("scripted ({} outcomes)", self.script.len())
    }

    fn detect_faces(&mut self, _frame: &Frame) -> Result<Vec<FacePrediction>, EstimatorError> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let outcome = self.script[self.cursor % self.script.len()].clone();
        self.cursor += 1;
        match outcome {
            ScriptedOutcome::Faces(faces) => Ok(faces),
            ScriptedOutcome::Error(msg) => Err(EstimatorError::Detection(msg)),
        }
    }
}
