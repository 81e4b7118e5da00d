//! Monitor orchestration: the sampling loop and its side channels.
//!
//! One `Monitor` wires capture, classification, debouncing, visibility
//! tracking, and delivery for a single exam session. All of its work runs
//! on one thread: sampling ticks, drain attempts, and return captures
//! interleave but never overlap. Host visibility transitions arrive over a
//! crossbeam channel.

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::alert::WarningPresenter;
use crate::capture::types::Frame;
use crate::capture::CaptureSource;
use crate::config::Config;
use crate::delivery::pipeline::{DeliveryPipeline, RetryPolicy};
use crate::delivery::queue::RetryQueue;
use crate::delivery::transport::LogTransport;
use crate::detect::classifier::FrameClassifier;
use crate::detect::debounce::{Debouncer, Emission};
use crate::detect::estimator::FaceEstimator;
use crate::event::{ClientInfo, ViolationCategory, ViolationEvent};
use crate::evidence;
use crate::stats::{MonitorStats, SharedStats};
use crate::visibility::{self, Visibility, VisibilityMonitor};

/// Wires capture, detection, and delivery for one exam session.
pub struct Monitor<T: LogTransport> {
    session_id: String,
    config: Config,
    capture: CaptureSource,
    /// `None` puts the monitor in periodic-screenshot fallback mode.
    estimator: Option<Box<dyn FaceEstimator>>,
    classifier: FrameClassifier,
    debouncer: Debouncer,
    visibility: VisibilityMonitor,
    pipeline: DeliveryPipeline<T>,
    presenter: Box<dyn WarningPresenter>,
    stats: SharedStats,
    client_info: ClientInfo,
}

impl<T: LogTransport> Monitor<T> {
    pub fn new(
        session_id: impl Into<String>,
        config: Config,
        capture: CaptureSource,
        estimator: Option<Box<dyn FaceEstimator>>,
        transport: T,
        presenter: Box<dyn WarningPresenter>,
    ) -> Self {
        let session_id = session_id.into();

        let queue = RetryQueue::open(
            config
                .data_path
                .join(format!("queue-{}.json", file_tag(&session_id))),
            config.delivery.max_persisted_entries,
            config.delivery.max_persisted_evidence_bytes,
        );
        let pipeline = DeliveryPipeline::new(
            transport,
            queue,
            RetryPolicy::from_config(&config.delivery),
        );

        let stats = Arc::new(MonitorStats::with_persistence(
            config
                .data_path
                .join(format!("stats-{}.json", file_tag(&session_id))),
        ));

        let (width, height) = capture.resolution();
        let client_info = ClientInfo::gather(width, height);

        let classifier = FrameClassifier::new(config.detection.clone());
        let debouncer = Debouncer::new(config.debounce.clone());
        let visibility = VisibilityMonitor::new(
            config.return_capture_delay_ms,
            config.tab_switch_serious_after,
        );

        Self {
            session_id,
            config,
            capture,
            estimator,
            classifier,
            debouncer,
            visibility,
            pipeline,
            presenter,
            stats,
            client_info,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stats(&self) -> SharedStats {
        Arc::clone(&self.stats)
    }

    /// Not-yet-acknowledged events waiting in the retry queue.
    pub fn backlog(&self) -> usize {
        self.pipeline.backlog()
    }

    pub fn pipeline(&self) -> &DeliveryPipeline<T> {
        &self.pipeline
    }

    /// Whether the monitor is running without face estimation.
    pub fn is_fallback(&self) -> bool {
        self.estimator.is_none()
    }

    /// Verify the capability set and announce monitoring.
    ///
    /// Capability problems are surfaced once as a blocking warning and the
    /// monitor degrades instead of terminating.
    pub fn startup(&mut self, now: Instant) {
        let estimator_desc = self.estimator.as_ref().map(|est| est.describe());
        match self.capture.snapshot() {
            Ok(_) => {
                if let Some(desc) = estimator_desc {
                    let (w, h) = self.capture.resolution();
                    let detail = format!(
                        "Monitoring started: {} at {w}x{h}, estimator {desc}",
                        self.capture.describe()
                    );
                    self.dispatch(
                        vec![Emission::new(ViolationCategory::MonitorSetup, detail)],
                        None,
                        now,
                    );
                } else {
                    self.presenter.warn(
                        "Face detection is unavailable. Periodic screenshots will be recorded instead.",
                    );
                    self.stats.record_warning_shown();
                    self.dispatch(
                        vec![Emission::new(
                            ViolationCategory::SetupWarning,
                            "Face estimation unavailable; monitoring degraded to periodic screenshots",
                        )],
                        None,
                        now,
                    );
                }
            }
            Err(e) => {
                self.presenter.warn(
                    "Failed to access the camera. Please enable camera access to continue the exam.",
                );
                self.stats.record_warning_shown();
                self.dispatch(
                    vec![Emission::new(
                        ViolationCategory::SetupFailure,
                        format!("Failed to set up capture: {e}"),
                    )],
                    None,
                    now,
                );
            }
        }
    }

    /// One sampling tick: snapshot, classify, debounce, ship.
    pub fn sample_tick(&mut self, now: Instant) {
        self.stats.record_frame_sampled();

        let frame = match self.capture.snapshot() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "frame capture failed; skipping tick");
                return;
            }
        };

        let Some(estimator) = self.estimator.as_mut() else {
            return;
        };

        let signal = match self.classifier.classify(estimator.as_mut(), &frame) {
            Ok(signal) => signal,
            Err(e) => {
                // Soft diagnostic, never a violation; this cycle is skipped.
                self.stats.record_detection_error();
                self.dispatch(
                    vec![Emission::new(
                        ViolationCategory::DetectionError,
                        format!("Error in face detection cycle: {e}"),
                    )],
                    None,
                    now,
                );
                return;
            }
        };

        let emissions = self.debouncer.advance(&signal);
        self.dispatch(emissions, Some(&frame), now);

        // Routine audit trail, independent of any anomaly.
        if rand::random::<f64>() < self.config.random_check_probability {
            self.dispatch(
                vec![Emission::new(
                    ViolationCategory::RandomCheck,
                    "Routine proctoring check",
                )],
                Some(&frame),
                now,
            );
        }
    }

    /// One fallback-mode tick: periodic screenshots, no classification.
    pub fn fallback_tick(&mut self, now: Instant) {
        self.stats.record_frame_sampled();

        let frame = match self.capture.snapshot() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "frame capture failed; skipping fallback tick");
                return;
            }
        };

        if rand::random::<f64>() < self.config.fallback_screenshot_probability {
            self.dispatch(
                vec![Emission::new(
                    ViolationCategory::FallbackMonitoring,
                    "Periodic screenshot (no face estimation available)",
                )],
                Some(&frame),
                now,
            );
        }
    }

    /// Host-reported visibility transition.
    pub fn on_visibility_change(&mut self, next: Visibility, wall: DateTime<Utc>, now: Instant) {
        let before = self.visibility.switch_count();
        let emissions = self.visibility.observe(next, wall);
        if self.visibility.switch_count() > before {
            self.stats.record_tab_switch();
        }
        // No capture while hidden; the return capture happens in service().
        self.dispatch(emissions, None, now);
    }

    /// Interleaved housekeeping: due return captures and drain attempts.
    pub fn service(&mut self, wall: DateTime<Utc>, now: Instant) {
        if let Some(pending) = self.visibility.take_due_return(wall) {
            let frame = self.capture.snapshot().ok();
            self.dispatch(
                vec![visibility::return_emission(&pending)],
                frame.as_ref(),
                now,
            );
        }
        self.pipeline.poll(now);
    }

    /// Drive the monitor until `running` clears.
    ///
    /// `visibility_rx` carries transitions from the host context; dropping
    /// the sender leaves the sampling loop running without tab tracking.
    pub fn run(&mut self, visibility_rx: Receiver<Visibility>, running: Arc<AtomicBool>) {
        self.startup(Instant::now());

        let mut receiver = Some(visibility_rx);
        let mut last_sample = Instant::now();

        while running.load(Ordering::SeqCst) {
            let mut disconnected = false;
            match &receiver {
                Some(rx) => match rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(state) => {
                        self.on_visibility_change(state, Utc::now(), Instant::now());
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                        tracing::info!("visibility channel closed; continuing without it");
                        disconnected = true;
                    }
                },
                None => thread::sleep(Duration::from_millis(100)),
            }
            if disconnected {
                receiver = None;
            }

            let interval = if self.is_fallback() {
                self.config.fallback_interval
            } else {
                self.config.sample_interval
            };
            if last_sample.elapsed() >= interval {
                if self.is_fallback() {
                    self.fallback_tick(Instant::now());
                } else {
                    self.sample_tick(Instant::now());
                }
                last_sample = Instant::now();
            }

            self.service(Utc::now(), Instant::now());
        }

        if let Err(e) = self.stats.save() {
            tracing::warn!(error = %e, "could not save session statistics");
        }
    }

    fn dispatch(&mut self, emissions: Vec<Emission>, frame: Option<&Frame>, now: Instant) {
        for emission in emissions {
            if let Some(text) = &emission.warning {
                self.presenter.warn(text);
                self.stats.record_warning_shown();
            }

            let screenshot = match (emission.category.evidence_quality(), frame) {
                (Some(quality), Some(frame)) => match evidence::encode_frame(frame, quality) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!(error = %e, "evidence encoding failed; sending without it");
                        None
                    }
                },
                _ => None,
            };

            let event = ViolationEvent::new(
                &self.session_id,
                emission.category,
                emission.detail,
                screenshot,
                self.client_info.clone(),
            );
            self.stats.record_event_emitted();
            self.pipeline.submit(event, now);
        }
    }
}

/// Session ids are opaque strings; keep the derived file names tame.
fn file_tag(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_tag_sanitizes() {
        assert_eq!(file_tag("SESS-123"), "SESS-123");
        assert_eq!(file_tag("a/b:c d"), "a-b-c-d");
    }
}
