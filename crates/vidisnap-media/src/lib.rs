//! Media handling for the VidiSnap pipeline.
//!
//! This crate provides:
//! - Request-scoped transient storage for uploads and extracted frames
//! - Type-safe FFmpeg command building with bounded, cancellable execution
//! - FFprobe stream discovery
//! - Deterministic single-frame extraction (first decodable frame)
//! - JPEG thumbnail encoding

pub mod command;
pub mod error;
pub mod extract;
pub mod frame;
pub mod streams;
pub mod store;
pub mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use extract::{ExtractorConfig, FfmpegFrameExtractor, FrameExtractor};
pub use frame::ExtractedFrame;
pub use streams::{discover_streams, ContainerInfo, StreamInfo};
pub use store::{MediaHandle, StoreConfig, StoreScope, TransientStore};
pub use thumbnail::{encode_thumbnail, ThumbnailConfig};
