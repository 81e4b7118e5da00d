//! Capture source: owns the live video feed and the snapshot buffer.
//!
//! The feed itself is an injected capability; the embedder wraps whatever
//! device or stream it has. The capture source holds the feed for the
//! monitoring session's lifetime and keeps the most recent snapshot around
//! for evidence capture.

use crate::capture::types::Frame;

/// A live video feed the monitor pulls frames from.
pub trait VideoFeed: Send {
    /// Identifying label for diagnostics.
    fn describe(&self) -> String;

    /// Fixed frame resolution `(width, height)`.
    fn resolution(&self) -> (u32, u32);

    /// Pull the next frame. Implementations must return within a bounded
    /// time; a stalled device is reported as a `CaptureError`.
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Errors that can occur while capturing frames.
#[derive(Debug)]
pub enum CaptureError {
    /// The underlying stream cannot be acquired at all
    Unavailable(String),
    /// A single frame grab failed
    Failed(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Unavailable(msg) => write!(f, "Capture unavailable: {msg}"),
            CaptureError::Failed(msg) => write!(f, "Frame capture failed: {msg}"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Owns the video feed for one monitoring session.
pub struct CaptureSource {
    feed: Box<dyn VideoFeed>,
    last_snapshot: Option<Frame>,
}

impl CaptureSource {
    pub fn new(feed: Box<dyn VideoFeed>) -> Self {
        Self {
            feed,
            last_snapshot: None,
        }
    }

    /// Label of the underlying feed.
    pub fn describe(&self) -> String {
        self.feed.describe()
    }

    /// Frame resolution of the underlying feed.
    pub fn resolution(&self) -> (u32, u32) {
        self.feed.resolution()
    }

    /// Grab a fresh frame and retain it as the current snapshot.
    pub fn snapshot(&mut self) -> Result<Frame, CaptureError> {
        let frame = self.feed.next_frame()?;
        self.last_snapshot = Some(frame.clone());
        Ok(frame)
    }

    /// Most recent successfully captured frame, if any.
    pub fn last_snapshot(&self) -> Option<&Frame> {
        self.last_snapshot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::SyntheticFeed;

    #[test]
    fn test_snapshot_retained() {
        let mut capture = CaptureSource::new(Box::new(SyntheticFeed::new(8, 8)));
        assert!(capture.last_snapshot().is_none());

        let frame = capture.snapshot().expect("synthetic feed never fails");
        assert_eq!((frame.width, frame.height), (8, 8));
        assert!(capture.last_snapshot().is_some());
    }

    #[test]
    fn test_resolution_passthrough() {
        let capture = CaptureSource::new(Box::new(SyntheticFeed::new(320, 240)));
        assert_eq!(capture.resolution(), (320, 240));
    }
}
