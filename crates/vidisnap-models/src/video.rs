//! Uploaded video and request identity.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File extensions accepted as video uploads.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// Check a declared filename against [`VIDEO_EXTENSIONS`] (case-insensitive).
pub fn is_supported_video_filename(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Unique identifier of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw upload handed to the pipeline by the ingress layer.
#[derive(Clone)]
pub struct UploadedVideo {
    bytes: Vec<u8>,
    filename: String,
}

impl UploadedVideo {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_length(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for UploadedVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedVideo")
            .field("filename", &self.filename)
            .field("content_length", &self.content_length())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_video_filename("clip.mp4"));
        assert!(is_supported_video_filename("CLIP.MOV"));
        assert!(is_supported_video_filename("a.b.webm"));
        assert!(!is_supported_video_filename("photo.jpg"));
        assert!(!is_supported_video_filename("mp4"));
        assert!(!is_supported_video_filename(""));
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_uploaded_video_debug_hides_bytes() {
        let video = UploadedVideo::new(vec![1u8, 2, 3], "cat.mp4");
        let debug = format!("{:?}", video);
        assert!(debug.contains("cat.mp4"));
        assert!(debug.contains("content_length: 3"));
        assert_eq!(video.content_length(), 3);
    }
}
