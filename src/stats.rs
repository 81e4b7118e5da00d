//! Session statistics for the monitor.
//!
//! Counters are cheap atomics bumped from the monitoring loop; a snapshot
//! can be persisted per session and read back by the `status` command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one monitoring session.
#[derive(Debug)]
pub struct MonitorStats {
    frames_sampled: AtomicU64,
    detection_errors: AtomicU64,
    events_emitted: AtomicU64,
    warnings_shown: AtomicU64,
    tab_switches: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl MonitorStats {
    pub fn new() -> Self {
        Self {
            frames_sampled: AtomicU64::new(0),
            detection_errors: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            warnings_shown: AtomicU64::new(0),
            tab_switches: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Stats that save a snapshot to `path` on demand.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);
        stats
    }

    pub fn record_frame_sampled(&self) {
        self.frames_sampled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detection_error(&self) {
        self.detection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warning_shown(&self) {
        self.warnings_shown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tab_switch(&self) {
        self.tab_switches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_sampled: self.frames_sampled.load(Ordering::Relaxed),
            detection_errors: self.detection_errors.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            warnings_shown: self.warnings_shown.load(Ordering::Relaxed),
            tab_switches: self.tab_switches.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Frames sampled: {}\n\
             - Detection errors: {}\n\
             - Events emitted: {}\n\
             - Warnings shown: {}\n\
             - Tab switches: {}\n\
             - Session duration: {} seconds",
            snapshot.frames_sampled,
            snapshot.detection_errors,
            snapshot.events_emitted,
            snapshot.warnings_shown,
            snapshot.tab_switches,
            snapshot.session_duration_secs
        )
    }

    /// Save a snapshot to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json =
                serde_json::to_string_pretty(&self.snapshot()).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of session statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub frames_sampled: u64,
    pub detection_errors: u64,
    pub events_emitted: u64,
    pub warnings_shown: u64,
    pub tab_switches: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared stats handle.
pub type SharedStats = Arc<MonitorStats>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counting() {
        let stats = MonitorStats::new();

        stats.record_frame_sampled();
        stats.record_frame_sampled();
        stats.record_event_emitted();
        stats.record_warning_shown();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_sampled, 2);
        assert_eq!(snapshot.events_emitted, 1);
        assert_eq!(snapshot.warnings_shown, 1);
        assert_eq!(snapshot.detection_errors, 0);
    }

    #[test]
    fn test_summary_format() {
        let stats = MonitorStats::new();
        stats.record_frame_sampled();

        let summary = stats.summary();
        assert!(summary.contains("Frames sampled: 1"));
        assert!(summary.contains("Session duration"));
    }

    #[test]
    fn test_save_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats-SESS.json");

        let stats = MonitorStats::with_persistence(path.clone());
        stats.record_event_emitted();
        stats.save().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: StatsSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.events_emitted, 1);
    }
}
