//! First-frame extraction.
//!
//! Selection rule: the first video stream in container order (cover art
//! excluded), and the first frame its decoder produces (`select=eq(n\,0)`).
//! There is no seeking and no fallback to a later frame; a stream that yields
//! no frame is corrupt input.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::frame::ExtractedFrame;
use crate::streams::discover_streams;
use crate::store::MediaHandle;

/// Filter selecting the frame with decode index 0.
const FIRST_FRAME_FILTER: &str = "select=eq(n\\,0)";

/// Frame extraction configuration.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Deadline covering both stream discovery and decode
    pub decode_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            decode_timeout: Duration::from_secs(20),
        }
    }
}

impl ExtractorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            decode_timeout: Duration::from_secs(
                std::env::var("VIDISNAP_DECODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            ),
        }
    }
}

/// Decodes exactly one representative frame from a stored video.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Decode the first frame of the first video stream.
    ///
    /// Errors: [`MediaError::UnsupportedFormat`] when there is no decodable
    /// video stream, [`MediaError::CorruptInput`] when the stream exists but
    /// no frame decodes, [`MediaError::Timeout`] past the decode deadline.
    async fn extract(&self, video: &MediaHandle) -> MediaResult<ExtractedFrame>;
}

/// FFprobe + FFmpeg backed extractor.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameExtractor {
    config: ExtractorConfig,
}

impl FfmpegFrameExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(&self, video: &MediaHandle) -> MediaResult<ExtractedFrame> {
        let timeout = self.config.decode_timeout;
        let deadline = Instant::now() + timeout;
        let path = video.path();

        let size = tokio::fs::metadata(path).await?.len();
        if size == 0 {
            return Err(MediaError::unsupported_format("upload is empty"));
        }

        let container = match tokio::time::timeout_at(deadline, discover_streams(path)).await {
            Ok(Ok(container)) => container,
            Ok(Err(MediaError::FfprobeFailed { stderr, .. })) => {
                return Err(MediaError::unsupported_format(format!(
                    "container not recognized: {}",
                    stderr.unwrap_or_default()
                )));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(MediaError::Timeout(timeout)),
        };

        let stream = container
            .first_video_stream()
            .ok_or_else(|| MediaError::unsupported_format("no video stream in container"))?;

        debug!(
            handle = %video.id(),
            stream = stream.index,
            codec = stream.codec_name.as_deref().unwrap_or("unknown"),
            format = container.format_name.as_deref().unwrap_or("unknown"),
            "Selected video stream"
        );

        let cmd = FfmpegCommand::to_stdout(path)
            .map_stream(stream.index)
            .video_filter(FIRST_FRAME_FILTER)
            .single_frame()
            .no_audio()
            .png_pipe();

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(MediaError::Timeout(timeout));
        }

        let png = match FfmpegRunner::new().with_timeout(remaining).run_capture(&cmd).await {
            Ok(png) => png,
            Err(MediaError::Timeout(_)) => return Err(MediaError::Timeout(timeout)),
            Err(MediaError::FfmpegFailed { stderr, exit_code, .. }) => {
                return Err(MediaError::corrupt_input(format!(
                    "frame decode failed (exit {:?}): {}",
                    exit_code,
                    stderr.unwrap_or_default()
                )));
            }
            Err(e) => return Err(e),
        };

        if png.is_empty() {
            return Err(MediaError::corrupt_input("decoder produced no frame at index 0"));
        }

        let frame = ExtractedFrame::from_png(png)?;

        info!(
            handle = %video.id(),
            stream = stream.index,
            width = frame.width(),
            height = frame.height(),
            "Extracted first frame"
        );

        Ok(frame)
    }
}
