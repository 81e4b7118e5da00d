//! Host visibility monitoring: tab-switch detection and return pairing.
//!
//! Runs independently of the sampling loop. The host context reports
//! visibility transitions; this state machine pairs each hidden period with
//! its return by elapsed time and schedules the return capture after a
//! short resynchronization delay.

use chrono::{DateTime, Duration, Utc};

use crate::detect::debounce::Emission;
use crate::event::ViolationCategory;

/// Host-reported visibility of the exam surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// A return capture scheduled after the feed has had time to resynchronize.
#[derive(Debug, Clone)]
pub struct PendingReturn {
    /// When the capture becomes due
    pub due_at: DateTime<Utc>,
    /// Seconds the candidate was away
    pub away_secs: f64,
    /// Which tab switch this return closes out
    pub switch_number: u32,
}

/// Tab-switch state machine.
pub struct VisibilityMonitor {
    state: Visibility,
    switch_count: u32,
    hidden_since: Option<DateTime<Utc>>,
    pending_return: Option<PendingReturn>,
    return_capture_delay: Duration,
    serious_after: u32,
}

impl VisibilityMonitor {
    pub fn new(return_capture_delay_ms: i64, serious_after: u32) -> Self {
        Self {
            state: Visibility::Visible,
            switch_count: 0,
            hidden_since: None,
            pending_return: None,
            return_capture_delay: Duration::milliseconds(return_capture_delay_ms),
            serious_after,
        }
    }

    pub fn switch_count(&self) -> u32 {
        self.switch_count
    }

    /// Feed one visibility transition. Same-state transitions are no-ops.
    pub fn observe(&mut self, next: Visibility, now: DateTime<Utc>) -> Vec<Emission> {
        if next == self.state {
            return Vec::new();
        }
        self.state = next;

        match next {
            Visibility::Hidden => {
                self.switch_count += 1;
                self.hidden_since = Some(now);
                let n = self.switch_count;

                // No evidence here: capture is unavailable while hidden.
                let mut out = vec![Emission::new(
                    ViolationCategory::TabSwitch,
                    format!("Candidate switched away from the exam tab (occurrence #{n})"),
                )
                .with_warning("Tab switching detected! Please return to the exam immediately.")];

                if n >= self.serious_after {
                    out.push(
                        Emission::new(
                            ViolationCategory::SeriousViolation,
                            format!("Candidate has switched tabs {n} times during the exam"),
                        )
                        .with_warning(
                            "Repeated tab switching has been flagged as a serious violation.",
                        ),
                    );
                }

                out
            }
            Visibility::Visible => {
                if let Some(since) = self.hidden_since.take() {
                    let away_secs = (now - since).num_milliseconds() as f64 / 1000.0;
                    self.pending_return = Some(PendingReturn {
                        due_at: now + self.return_capture_delay,
                        away_secs,
                        switch_number: self.switch_count,
                    });
                }
                Vec::new()
            }
        }
    }

    /// Take the scheduled return capture once its delay has elapsed.
    pub fn take_due_return(&mut self, now: DateTime<Utc>) -> Option<PendingReturn> {
        let due = self
            .pending_return
            .as_ref()
            .map_or(false, |pending| now >= pending.due_at);
        if due {
            self.pending_return.take()
        } else {
            None
        }
    }
}

/// Build the return event for a completed pending return.
pub fn return_emission(pending: &PendingReturn) -> Emission {
    Emission::new(
        ViolationCategory::TabSwitchReturn,
        format!(
            "Candidate returned after {:.1} seconds away from the exam tab (switch #{})",
            pending.away_secs, pending.switch_number
        ),
    )
    .with_warning("Time away from the exam tab has been recorded.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> VisibilityMonitor {
        VisibilityMonitor::new(1000, 3)
    }

    #[test]
    fn test_hide_emits_tab_switch_without_evidence() {
        let mut m = monitor();
        let now = Utc::now();

        let out = m.observe(Visibility::Hidden, now);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, ViolationCategory::TabSwitch);
        assert_eq!(out[0].category.evidence_quality(), None);
        assert!(out[0].detail.contains("occurrence #1"));
    }

    #[test]
    fn test_return_pairing_embeds_elapsed_time() {
        let mut m = monitor();
        let t0 = Utc::now();

        m.observe(Visibility::Hidden, t0);
        let out = m.observe(Visibility::Visible, t0 + Duration::milliseconds(12_300));
        assert!(out.is_empty());

        // Not due until the resynchronization delay has passed.
        assert!(m
            .take_due_return(t0 + Duration::milliseconds(12_300 + 900))
            .is_none());

        let pending = m
            .take_due_return(t0 + Duration::milliseconds(12_300 + 1000))
            .expect("return capture should be due");
        assert!((pending.away_secs - 12.3).abs() < 1e-9);

        let emission = return_emission(&pending);
        assert_eq!(emission.category, ViolationCategory::TabSwitchReturn);
        assert!(emission.detail.contains("12.3"));

        // Consumed exactly once.
        assert!(m.take_due_return(t0 + Duration::seconds(60)).is_none());
    }

    #[test]
    fn test_serious_violation_from_third_switch() {
        let mut m = monitor();
        let mut now = Utc::now();

        for expected_serious in [false, false, true, true] {
            let out = m.observe(Visibility::Hidden, now);
            let has_serious = out
                .iter()
                .any(|e| e.category == ViolationCategory::SeriousViolation);
            assert_eq!(has_serious, expected_serious);

            now = now + Duration::seconds(5);
            m.observe(Visibility::Visible, now);
            now = now + Duration::seconds(5);
        }
        assert_eq!(m.switch_count(), 4);
    }

    #[test]
    fn test_same_state_transitions_are_noops() {
        let mut m = monitor();
        let now = Utc::now();

        assert!(m.observe(Visibility::Visible, now).is_empty());
        assert!(m.take_due_return(now + Duration::seconds(10)).is_none());

        m.observe(Visibility::Hidden, now);
        assert!(m.observe(Visibility::Hidden, now).is_empty());
        assert_eq!(m.switch_count(), 1);
    }
}
