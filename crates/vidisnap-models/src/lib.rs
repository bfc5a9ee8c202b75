//! Shared data models for the VidiSnap pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Ranked classifier output (labels and scores)
//! - The analysis response returned to callers
//! - Uploaded videos and request identifiers
//! - Thumbnail and ranking constants

pub mod encoding;
pub mod label;
pub mod response;
pub mod video;

// Re-export common types
pub use encoding::{THUMBNAIL_JPEG_QUALITY, THUMBNAIL_MAX_WIDTH, TOP_K};
pub use label::{ClassificationResult, LabelScore};
pub use response::AnalysisResponse;
pub use video::{is_supported_video_filename, RequestId, UploadedVideo, VIDEO_EXTENSIONS};
