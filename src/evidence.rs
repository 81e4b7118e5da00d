//! Evidence encoding: bounded JPEG snapshots attached to events.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;

use crate::capture::types::Frame;

/// Prefix of every encoded evidence payload.
pub const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Errors while encoding evidence.
#[derive(Debug)]
pub enum EvidenceError {
    Encode(String),
}

impl std::fmt::Display for EvidenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceError::Encode(msg) => write!(f, "Evidence encoding error: {msg}"),
        }
    }
}

impl std::error::Error for EvidenceError {}

/// Encode a frame as a JPEG data URL at the given quality (1-100).
///
/// Quality tiers come from [`ViolationCategory::evidence_quality`]; routine
/// checks ship lower-fidelity snapshots than violations.
///
/// [`ViolationCategory::evidence_quality`]: crate::event::ViolationCategory::evidence_quality
pub fn encode_frame(frame: &Frame, quality: u8) -> Result<String, EvidenceError> {
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder
        .encode(
            &frame.pixels,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| EvidenceError::Encode(e.to_string()))?;

    Ok(format!("{DATA_URL_PREFIX}{}", BASE64.encode(&jpeg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_jpeg_data_url() {
        let frame = Frame::solid(16, 16, [120, 80, 40]);
        let url = encode_frame(&frame, 70).unwrap();

        assert!(url.starts_with(DATA_URL_PREFIX));

        let bytes = BASE64.decode(&url[DATA_URL_PREFIX.len()..]).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        let mut frame = Frame::solid(16, 16, [0, 0, 0]);
        frame.pixels.truncate(10);
        assert!(encode_frame(&frame, 70).is_err());
    }
}
