//! Frame and face-prediction types shared by capture and detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One still image sampled from the live video feed.
///
/// Pixels are tightly packed RGB8 rows at the feed's fixed resolution.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// RGB8 pixel data, `width * height * 3` bytes
    pub pixels: Vec<u8>,
    /// When this frame was sampled
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
            captured_at: Utc::now(),
        }
    }

    /// Create a single-color frame.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            pixels.extend_from_slice(&rgb);
        }
        Self::new(width, height, pixels)
    }
}

/// Axis-aligned face bounding box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaceBox {
    /// Top-left corner `[x, y]`
    pub top_left: [f32; 2],
    /// Bottom-right corner `[x, y]`
    pub bottom_right: [f32; 2],
}

impl FaceBox {
    pub fn new(top_left: [f32; 2], bottom_right: [f32; 2]) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Vertical center of the box.
    pub fn center_y(&self) -> f32 {
        (self.top_left[1] + self.bottom_right[1]) / 2.0
    }
}

/// One face detection returned by the estimation capability.
///
/// When landmarks are present they lead with left eye, right eye, nose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacePrediction {
    /// Bounding box of the detected face
    pub bounds: FaceBox,
    /// Landmark points `[x, y]`, when the model provides them
    pub landmarks: Option<Vec<[f32; 2]>>,
    /// Detection confidence in `[0, 1]`
    pub probability: f32,
}

impl FacePrediction {
    pub fn new(top_left: [f32; 2], bottom_right: [f32; 2]) -> Self {
        Self {
            bounds: FaceBox::new(top_left, bottom_right),
            landmarks: None,
            probability: 0.98,
        }
    }

    pub fn with_landmarks(mut self, landmarks: Vec<[f32; 2]>) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self
    }
}
