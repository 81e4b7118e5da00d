//! Proctorwatch Agent - client-side exam integrity monitor.
//!
//! While a candidate takes a timed online exam, this library samples a
//! video feed and host-visibility signals, flags suspicious behavior
//! (absent face, extra faces, gaze-down posture, tab switching), and
//! reliably ships each flagged event to a remote logging endpoint, even
//! across transient network failure.
//!
//! # Reliability Guarantees
//!
//! - **At-least-once delivery**: failed sends enter a FIFO retry queue
//!   drained with depth-scaled backoff
//! - **Restart-safe**: the retry queue is mirrored to durable storage
//!   after every mutation and reloaded on startup
//! - **Never fatal**: every failure path logs and keeps the sampling and
//!   drain loops running
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Proctorwatch Agent                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Capture   │──▶│ Classifier  │──▶│  Debouncer  │        │
//! │  │  (frames)   │   │  (3 votes)  │   │ (hysteresis)│        │
//! │  └─────────────┘   └─────────────┘   └──────┬──────┘        │
//! │         ▲                                   │               │
//! │  ┌──────┴──────┐                     ┌──────▼──────┐        │
//! │  │ Visibility  │────────────────────▶│  Delivery   │──▶ log │
//! │  │   Monitor   │                     │  Pipeline   │    API │
//! │  └─────────────┘                     └──────┬──────┘        │
//! │                                      ┌──────▼──────┐        │
//! │                                      │ Retry Queue │        │
//! │                                      │ (persisted) │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use proctorwatch_agent::{
//!     alert::TerminalPresenter,
//!     capture::{CaptureSource, SyntheticFeed},
//!     config::Config,
//!     delivery::HttpLogTransport,
//!     monitor::Monitor,
//! };
//!
//! let config = Config::default();
//! let capture = CaptureSource::new(Box::new(SyntheticFeed::new(640, 480)));
//! let transport = HttpLogTransport::new(config.delivery.endpoint_url.clone())
//!     .expect("Failed to create transport");
//!
//! let monitor = Monitor::new(
//!     "SESS-EXAMPLE",
//!     config,
//!     capture,
//!     None, // the embedder supplies its face estimator here
//!     transport,
//!     Box::new(TerminalPresenter),
//! );
//! ```

pub mod alert;
pub mod capture;
pub mod config;
pub mod delivery;
pub mod detect;
pub mod event;
pub mod evidence;
pub mod monitor;
pub mod stats;
pub mod visibility;

// Re-export key types at crate root for convenience
pub use alert::{TerminalPresenter, WarningPresenter};
pub use capture::{CaptureError, CaptureSource, FacePrediction, Frame, SyntheticFeed, VideoFeed};
pub use config::{Config, ConfigError, DebounceConfig, DeliveryConfig, DetectionConfig};
pub use delivery::{
    DeliveryError, DeliveryPipeline, HttpLogTransport, LogTransport, RetryPolicy, RetryQueue,
    SendOutcome,
};
pub use detect::{
    Debouncer, Emission, EstimatorError, FaceEstimator, FrameClassifier, FrameSignal,
    ScriptedEstimator, ScriptedOutcome,
};
pub use event::{ClientInfo, ViolationCategory, ViolationEvent};
pub use monitor::Monitor;
pub use stats::{MonitorStats, StatsSnapshot};
pub use visibility::{Visibility, VisibilityMonitor};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Monitoring disclosure that can be displayed to candidates.
pub const MONITORING_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║            PROCTORWATCH AGENT - MONITORING DISCLOSURE            ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This exam session is monitored for integrity.                   ║
║                                                                  ║
║  ✓ WHAT IS RECORDED:                                             ║
║    • Whether a face is visible to the camera                     ║
║    • Whether more than one person is in frame                    ║
║    • Sustained looking away from the screen                      ║
║    • Switching away from the exam tab                            ║
║    • Compressed snapshots attached to flagged events             ║
║                                                                  ║
║  ✗ WHAT IS NOT DONE:                                             ║
║    • No enforcement: the monitor observes and reports only       ║
║    • No audio recording                                          ║
║    • No snapshots while the exam tab is hidden                   ║
║                                                                  ║
║  Flagged events are delivered to your exam provider's logging    ║
║  service, with retries across network failures.                  ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
