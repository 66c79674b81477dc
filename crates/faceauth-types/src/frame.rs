use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FaceAuthError, Result};

pub const JPEG_MIME: &str = "image/jpeg";

/// One encoded still image extracted from a camera session.
#[derive(Clone, Serialize, Deserialize)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes, never empty.
    pub payload: Vec<u8>,
    pub mime: String,
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub fn jpeg(width: u32, height: u32, payload: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FaceAuthError::Capture(format!(
                "invalid frame dimensions {width}x{height}"
            )));
        }
        if payload.is_empty() {
            return Err(FaceAuthError::Capture("encode failed".into()));
        }
        Ok(Self {
            width,
            height,
            payload,
            mime: JPEG_MIME.to_string(),
            captured_at: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl std::fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mime", &self.mime)
            .field("payload_bytes", &self.payload.len())
            .finish()
    }
}
