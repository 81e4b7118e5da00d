//! Per-frame classification of face predictions into behavioral signals.
//!
//! The look-down rule is an OR of three independent votes. Any single vote
//! is enough: false positives only cost a debounced warning, while a missed
//! detection is the expensive outcome.

use crate::capture::types::{FacePrediction, Frame};
use crate::config::DetectionConfig;
use crate::detect::estimator::{EstimatorError, FaceEstimator};

/// Discrete behavioral state derived from one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSignal {
    /// Zero faces detected
    NoFace,
    /// Exactly one face, facing the screen
    OneFaceNormal,
    /// Exactly one face, gaze-down posture
    OneFaceLookdown,
    /// More than one face; the count is preserved for messaging
    MultipleFaces(usize),
}

/// Reduces face predictions to a [`FrameSignal`].
pub struct FrameClassifier {
    thresholds: DetectionConfig,
}

impl FrameClassifier {
    pub fn new(thresholds: DetectionConfig) -> Self {
        Self { thresholds }
    }

    /// Classify one captured frame via the estimation capability.
    ///
    /// An estimation failure propagates so the caller can skip the cycle
    /// and log a soft diagnostic; it is never itself a violation.
    pub fn classify(
        &self,
        estimator: &mut dyn FaceEstimator,
        frame: &Frame,
    ) -> Result<FrameSignal, EstimatorError> {
        let predictions = estimator.detect_faces(frame)?;
        Ok(self.reduce(&predictions, frame.height))
    }

    /// Pure reduction over predictions, separated so tests can drive it
    /// without an estimator.
    pub fn reduce(&self, predictions: &[FacePrediction], frame_height: u32) -> FrameSignal {
        match predictions {
            [] => FrameSignal::NoFace,
            [face] => {
                if self.is_looking_down(face, frame_height) {
                    FrameSignal::OneFaceLookdown
                } else {
                    FrameSignal::OneFaceNormal
                }
            }
            many => FrameSignal::MultipleFaces(many.len()),
        }
    }

    fn is_looking_down(&self, face: &FacePrediction, frame_height: u32) -> bool {
        // Vote 1: face sits low in the frame.
        if frame_height > 0 {
            let relative_position = face.bounds.center_y() / frame_height as f32;
            if relative_position > self.thresholds.position_ratio {
                return true;
            }
        }

        // Vote 2: nose below the eye line, when landmarks are available.
        // Landmark order is left eye, right eye, nose.
        if let Some(landmarks) = &face.landmarks {
            if landmarks.len() >= 3 {
                let eye_level = (landmarks[0][1] + landmarks[1][1]) / 2.0;
                let nose_drop = landmarks[2][1] - eye_level;
                if nose_drop > self.thresholds.nose_drop_px {
                    return true;
                }
            }
        }

        // Vote 3: low detection confidence as an odd-pose proxy.
        face.probability < self.thresholds.min_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_HEIGHT: u32 = 480;

    fn classifier() -> FrameClassifier {
        FrameClassifier::new(DetectionConfig::default())
    }

    /// A confident, centered face that trips none of the votes.
    fn normal_face() -> FacePrediction {
        FacePrediction::new([200.0, 100.0], [400.0, 300.0])
    }

    #[test]
    fn test_no_face() {
        assert_eq!(classifier().reduce(&[], FRAME_HEIGHT), FrameSignal::NoFace);
    }

    #[test]
    fn test_multiple_faces_preserves_count() {
        let faces = vec![normal_face(), normal_face(), normal_face()];
        assert_eq!(
            classifier().reduce(&faces, FRAME_HEIGHT),
            FrameSignal::MultipleFaces(3)
        );
    }

    #[test]
    fn test_single_face_normal() {
        assert_eq!(
            classifier().reduce(&[normal_face()], FRAME_HEIGHT),
            FrameSignal::OneFaceNormal
        );
    }

    #[test]
    fn test_low_position_vote() {
        // Center y = 380 of 480 -> 0.79 > 0.6
        let face = FacePrediction::new([200.0, 330.0], [400.0, 430.0]);
        assert_eq!(
            classifier().reduce(&[face], FRAME_HEIGHT),
            FrameSignal::OneFaceLookdown
        );
    }

    #[test]
    fn test_nose_drop_vote() {
        let face = normal_face().with_landmarks(vec![
            [250.0, 150.0], // left eye
            [350.0, 150.0], // right eye
            [300.0, 160.0], // nose, 10 px below the eye line
        ]);
        assert_eq!(
            classifier().reduce(&[face], FRAME_HEIGHT),
            FrameSignal::OneFaceLookdown
        );
    }

    #[test]
    fn test_mild_nose_drop_does_not_vote() {
        let face = normal_face().with_landmarks(vec![
            [250.0, 150.0],
            [350.0, 150.0],
            [300.0, 155.0], // 5 px, under the 8 px threshold
        ]);
        assert_eq!(
            classifier().reduce(&[face], FRAME_HEIGHT),
            FrameSignal::OneFaceNormal
        );
    }

    #[test]
    fn test_low_confidence_vote() {
        let face = normal_face().with_probability(0.8);
        assert_eq!(
            classifier().reduce(&[face], FRAME_HEIGHT),
            FrameSignal::OneFaceLookdown
        );
    }
}
