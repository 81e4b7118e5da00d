//! Synthetic video feed.
//!
//! This exists so the operator harness and the test suite can drive the
//! full monitoring path without a camera device.

use crate::capture::source::{CaptureError, VideoFeed};
use crate::capture::types::Frame;

/// A deterministic feed producing flat-shaded frames.
pub struct SyntheticFeed {
    width: u32,
    height: u32,
    frame_index: u64,
}

impl SyntheticFeed {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_index: 0,
        }
    }

    /// Number of frames produced so far.
    pub fn frames_produced(&self) -> u64 {
        self.frame_index
    }
}

impl VideoFeed for SyntheticFeed {
    fn describe(&self) -> String {
        format!("synthetic {}x{}", self.width, self.height)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        self.frame_index += 1;
        // Vary the shade per frame so consecutive snapshots are distinguishable.
        let shade = (self.frame_index % 200) as u8 + 32;
        Ok(Frame::solid(self.width, self.height, [shade, shade, shade]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_vary_by_index() {
        let mut feed = SyntheticFeed::new(4, 4);
        let first = feed.next_frame().unwrap();
        let second = feed.next_frame().unwrap();
        assert_ne!(first.pixels[0], second.pixels[0]);
        assert_eq!(feed.frames_produced(), 2);
    }
}
