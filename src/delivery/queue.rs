//! Durable, order-preserving retry queue for violation events.
//!
//! The on-disk copy always reflects the in-memory queue after each
//! push/pop: every mutation rewrites the whole file through a temp-file
//! rename, so an abrupt termination can never leave a half-written queue.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::event::ViolationEvent;

/// Placeholder substituted for oversized evidence before persistence.
pub const TRUNCATED_EVIDENCE_PLACEHOLDER: &str = "data:image/jpeg;base64,/9j/4AAQ...(truncated)";

/// FIFO queue of not-yet-acknowledged events, mirrored to durable storage.
pub struct RetryQueue {
    entries: VecDeque<ViolationEvent>,
    persist_path: Option<PathBuf>,
    max_persisted_entries: usize,
    max_evidence_bytes: usize,
    /// Set once persistence has failed twice in a row; the queue keeps
    /// working in memory (best-effort, lost on restart).
    memory_only: bool,
}

impl RetryQueue {
    /// Create a queue persisted at `path`, reloading any prior contents.
    pub fn open(path: PathBuf, max_persisted_entries: usize, max_evidence_bytes: usize) -> Self {
        let entries = Self::load_entries(&path);
        if !entries.is_empty() {
            tracing::info!(count = entries.len(), "restored persisted retry queue");
        }
        Self {
            entries,
            persist_path: Some(path),
            max_persisted_entries,
            max_evidence_bytes,
            memory_only: false,
        }
    }

    /// Memory-only queue.
    pub fn in_memory(max_evidence_bytes: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            persist_path: None,
            max_persisted_entries: usize::MAX,
            max_evidence_bytes,
            memory_only: false,
        }
    }

    fn load_entries(path: &Path) -> VecDeque<ViolationEvent> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str::<Vec<ViolationEvent>>(&content)
                .map(VecDeque::from)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "discarding unreadable retry queue file");
                    VecDeque::new()
                }),
            // No file yet is the normal first-run case.
            Err(_) => VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The next event due for delivery.
    pub fn head(&self) -> Option<&ViolationEvent> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViolationEvent> {
        self.entries.iter()
    }

    /// Append a failed event, truncating oversized evidence first.
    pub fn push(&mut self, mut event: ViolationEvent) {
        if let Some(screenshot) = &event.screenshot {
            if screenshot.len() > self.max_evidence_bytes {
                event.screenshot = Some(TRUNCATED_EVIDENCE_PLACEHOLDER.to_string());
                event.screenshot_truncated = Some(true);
            }
        }
        self.entries.push_back(event);
        self.persist();
    }

    /// Drop the head after an acknowledged (or soft-rejected) send.
    pub fn acknowledge_head(&mut self) -> Option<ViolationEvent> {
        let event = self.entries.pop_front();
        if event.is_some() {
            self.persist();
        }
        event
    }

    /// Mirror the in-memory queue to disk, whole-file replace.
    fn persist(&mut self) {
        if self.memory_only {
            return;
        }
        let Some(path) = self.persist_path.clone() else {
            return;
        };

        if let Err(first) = self.write_atomic(&path) {
            tracing::warn!(
                error = %first,
                "retry queue persistence failed; truncating to most recent entries"
            );
            // Storage full or unwritable: keep only the most recent entries
            // and try once more.
            if self.entries.len() > self.max_persisted_entries {
                let excess = self.entries.len() - self.max_persisted_entries;
                self.entries.drain(..excess);
            }
            if let Err(second) = self.write_atomic(&path) {
                tracing::error!(
                    error = %second,
                    "retry queue persistence lost; continuing memory-only"
                );
                self.memory_only = true;
            }
        }
    }

    fn write_atomic(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&self.entries).map_err(std::io::Error::other)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }
}
