//! Violation debouncing: per-category counters with hysteresis.
//!
//! The debouncer is a pure reducer from frame signals to emissions; it
//! touches no clock, no capture, and no network, so its hysteresis rules
//! can be exercised tick by tick in tests.

use crate::config::DebounceConfig;
use crate::detect::classifier::FrameSignal;
use crate::event::ViolationCategory;

/// One debounced violation produced by a sample tick or a visibility
/// transition.
///
/// `detail` is the log message; `warning` is the candidate-facing alert
/// text, absent for routine audit and diagnostic categories.
#[derive(Debug, Clone)]
pub struct Emission {
    pub category: ViolationCategory,
    pub detail: String,
    pub warning: Option<String>,
}

impl Emission {
    pub fn new(category: ViolationCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
            warning: None,
        }
    }

    pub fn with_warning(mut self, text: impl Into<String>) -> Self {
        self.warning = Some(text.into());
        self
    }
}

/// Converts the noisy per-frame signal stream into debounced violations.
///
/// Three independent counters, advanced once per classified frame. Reset
/// rules are category-specific: absence resets on any face-present frame,
/// the multi-face count only ever floors down from its cap, and the
/// lookdown score decays slower than it grows.
pub struct Debouncer {
    cfg: DebounceConfig,
    absence: u32,
    multi_face: u32,
    lookdown: f64,
}

impl Debouncer {
    pub fn new(cfg: DebounceConfig) -> Self {
        Self {
            cfg,
            absence: 0,
            multi_face: 0,
            lookdown: 0.0,
        }
    }

    /// Advance all counters with one classified frame.
    pub fn advance(&mut self, signal: &FrameSignal) -> Vec<Emission> {
        match signal {
            FrameSignal::NoFace => self.advance_absence(),
            FrameSignal::MultipleFaces(count) => {
                self.absence = 0;
                self.advance_multi_face(*count)
            }
            FrameSignal::OneFaceLookdown => {
                self.absence = 0;
                self.advance_lookdown()
            }
            FrameSignal::OneFaceNormal => {
                self.absence = 0;
                self.lookdown = (self.lookdown - self.cfg.lookdown_decay).max(0.0);
                Vec::new()
            }
        }
    }

    fn advance_absence(&mut self) -> Vec<Emission> {
        self.absence += 1;
        let streak = self.absence;

        let fire = if self.absence >= self.cfg.absence_clamp {
            // Clamp back down instead of resetting: the condition stays
            // armed without re-logging on every tick in between.
            self.absence = self.cfg.absence_emit;
            true
        } else {
            self.absence == self.cfg.absence_emit
        };

        if !fire {
            return Vec::new();
        }

        vec![Emission::new(
            ViolationCategory::FaceMissing,
            format!("No face detected in frame ({streak} consecutive frames)"),
        )
        .with_warning("No face detected. Please ensure your face is visible to the camera.")]
    }

    fn advance_multi_face(&mut self, faces_in_frame: usize) -> Vec<Emission> {
        self.multi_face += 1;
        let total = self.multi_face;

        // Unambiguous condition: every occurrence is reported.
        let mut out = vec![Emission::new(
            ViolationCategory::MultipleFaces,
            format!("{faces_in_frame} faces detected in frame ({total} total detections)"),
        )
        .with_warning(format!(
            "Multiple faces detected ({faces_in_frame}). Only the test taker should be present."
        ))];

        if total >= self.cfg.multi_serious_after {
            out.push(
                Emission::new(
                    ViolationCategory::SeriousViolation,
                    format!("Persistent multiple persons detected during exam ({total} occurrences so far)"),
                )
                .with_warning("Repeated multi-person presence has been flagged as a serious violation."),
            );
        }

        // Cap and floor to bound the count, not to suppress detection.
        if self.multi_face > self.cfg.multi_cap {
            self.multi_face = self.cfg.multi_floor;
        }

        out
    }

    fn advance_lookdown(&mut self) -> Vec<Emission> {
        self.lookdown += 1.0;
        let score = self.lookdown;

        if score < self.cfg.lookdown_emit {
            return Vec::new();
        }

        let mut out = vec![Emission::new(
            ViolationCategory::PhoneUsageSuspected,
            format!("Candidate appears to be looking down at a phone (score {score:.1})"),
        )
        .with_warning("You appear to be looking down. Please keep your eyes on the screen.")];

        if score >= self.cfg.lookdown_serious {
            out.push(
                Emission::new(
                    ViolationCategory::SeriousViolation,
                    "Consistent pattern of looking down indicates potential use of an unauthorized device",
                )
                .with_warning("Continued looking away has been flagged as a serious violation."),
            );
            // Clamp to stay armed without unbounded growth.
            self.lookdown = self.cfg.lookdown_emit;
        }

        out
    }

    pub fn absence_count(&self) -> u32 {
        self.absence
    }

    pub fn multi_face_count(&self) -> u32 {
        self.multi_face
    }

    pub fn lookdown_score(&self) -> f64 {
        self.lookdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> Debouncer {
        Debouncer::new(DebounceConfig::default())
    }

    fn categories(emissions: &[Emission]) -> Vec<ViolationCategory> {
        emissions.iter().map(|e| e.category).collect()
    }

    #[test]
    fn test_absence_emits_once_before_clamp() {
        let mut d = debouncer();

        // Tick 1: below threshold, nothing yet.
        assert!(d.advance(&FrameSignal::NoFace).is_empty());
        // Tick 2: threshold reached, exactly one event.
        let out = d.advance(&FrameSignal::NoFace);
        assert_eq!(categories(&out), vec![ViolationCategory::FaceMissing]);
        // Ticks 3-4: condition persists silently.
        assert!(d.advance(&FrameSignal::NoFace).is_empty());
        assert!(d.advance(&FrameSignal::NoFace).is_empty());
        // Tick 5: clamp forces the counter back to 2 and re-emits.
        let out = d.advance(&FrameSignal::NoFace);
        assert_eq!(categories(&out), vec![ViolationCategory::FaceMissing]);
        assert_eq!(d.absence_count(), 2);
    }

    #[test]
    fn test_absence_resets_on_any_face() {
        let mut d = debouncer();
        d.advance(&FrameSignal::NoFace);
        assert_eq!(d.absence_count(), 1);

        d.advance(&FrameSignal::OneFaceNormal);
        assert_eq!(d.absence_count(), 0);

        d.advance(&FrameSignal::NoFace);
        d.advance(&FrameSignal::MultipleFaces(2));
        assert_eq!(d.absence_count(), 0);

        d.advance(&FrameSignal::NoFace);
        d.advance(&FrameSignal::OneFaceLookdown);
        assert_eq!(d.absence_count(), 0);
    }

    #[test]
    fn test_multi_face_reports_every_occurrence() {
        let mut d = debouncer();

        let first = d.advance(&FrameSignal::MultipleFaces(2));
        assert_eq!(categories(&first), vec![ViolationCategory::MultipleFaces]);
        assert!(first[0].detail.contains("2 faces"));

        let second = d.advance(&FrameSignal::MultipleFaces(3));
        assert_eq!(categories(&second), vec![ViolationCategory::MultipleFaces]);

        // Third occurrence escalates, and so does every one after it.
        let third = d.advance(&FrameSignal::MultipleFaces(2));
        assert_eq!(
            categories(&third),
            vec![
                ViolationCategory::MultipleFaces,
                ViolationCategory::SeriousViolation
            ]
        );
        let fourth = d.advance(&FrameSignal::MultipleFaces(2));
        assert_eq!(
            categories(&fourth),
            vec![
                ViolationCategory::MultipleFaces,
                ViolationCategory::SeriousViolation
            ]
        );
    }

    #[test]
    fn test_multi_face_cap_floors_counter() {
        let mut d = debouncer();
        for _ in 0..11 {
            d.advance(&FrameSignal::MultipleFaces(2));
        }
        assert_eq!(d.multi_face_count(), 5);

        // Detection stays active after flooring.
        let out = d.advance(&FrameSignal::MultipleFaces(2));
        assert_eq!(out[0].category, ViolationCategory::MultipleFaces);
    }

    #[test]
    fn test_lookdown_decay_arithmetic() {
        let mut d = debouncer();

        d.advance(&FrameSignal::OneFaceLookdown);
        assert!((d.lookdown_score() - 1.0).abs() < f64::EPSILON);

        d.advance(&FrameSignal::OneFaceNormal);
        assert!((d.lookdown_score() - 0.5).abs() < f64::EPSILON);

        // Never negative.
        d.advance(&FrameSignal::OneFaceNormal);
        d.advance(&FrameSignal::OneFaceNormal);
        assert_eq!(d.lookdown_score(), 0.0);
    }

    #[test]
    fn test_lookdown_emission_and_escalation() {
        let mut d = debouncer();

        assert!(d.advance(&FrameSignal::OneFaceLookdown).is_empty());

        let out = d.advance(&FrameSignal::OneFaceLookdown);
        assert_eq!(categories(&out), vec![ViolationCategory::PhoneUsageSuspected]);

        let out = d.advance(&FrameSignal::OneFaceLookdown);
        assert_eq!(categories(&out), vec![ViolationCategory::PhoneUsageSuspected]);

        // Score 4: escalation plus clamp back to the emit threshold.
        let out = d.advance(&FrameSignal::OneFaceLookdown);
        assert_eq!(
            categories(&out),
            vec![
                ViolationCategory::PhoneUsageSuspected,
                ViolationCategory::SeriousViolation
            ]
        );
        assert!((d.lookdown_score() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lookdown_survives_alternation() {
        let mut d = debouncer();

        // Alternating lookdown/normal nets +0.5 per pair, so suspicion
        // still accumulates past the threshold.
        for _ in 0..3 {
            d.advance(&FrameSignal::OneFaceLookdown);
            d.advance(&FrameSignal::OneFaceNormal);
        }
        let out = d.advance(&FrameSignal::OneFaceLookdown);
        assert_eq!(categories(&out), vec![ViolationCategory::PhoneUsageSuspected]);
    }
}
