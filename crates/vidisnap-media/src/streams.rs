//! FFprobe stream discovery.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// One stream of an inspected container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Absolute stream index in the container
    pub index: usize,
    /// "video", "audio", "subtitle", ...
    pub codec_type: String,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Frame rate (fps), when reported
    pub fps: Option<f64>,
    /// Cover art rather than a real video track
    pub attached_pic: bool,
}

impl StreamInfo {
    /// A decodable video track (cover art excluded).
    pub fn is_video(&self) -> bool {
        self.codec_type == "video" && !self.attached_pic
    }
}

/// Container information reported by FFprobe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Container format name (e.g. "mov,mp4,m4a,3gp,3g2,mj2")
    pub format_name: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Streams in container order
    pub streams: Vec<StreamInfo>,
}

impl ContainerInfo {
    /// First video stream in container order.
    pub fn first_video_stream(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.is_video())
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    #[serde(default)]
    disposition: Option<FfprobeDisposition>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

/// Discover the streams of a media file.
///
/// A file FFprobe cannot parse yields [`MediaError::FfprobeFailed`]. The child
/// process is killed if the returned future is dropped.
pub async fn discover_streams(path: impl AsRef<Path>) -> MediaResult<ContainerInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        });
    }

    parse_ffprobe_output(&output.stdout)
}

fn parse_ffprobe_output(stdout: &[u8]) -> MediaResult<ContainerInfo> {
    let output: FfprobeOutput = serde_json::from_slice(stdout)?;

    let streams = output
        .streams
        .into_iter()
        .map(|s| StreamInfo {
            index: s.index,
            codec_type: s.codec_type.unwrap_or_default(),
            codec_name: s.codec_name,
            width: s.width,
            height: s.height,
            fps: s
                .avg_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate)),
            attached_pic: s.disposition.map(|d| d.attached_pic != 0).unwrap_or(false),
        })
        .collect();

    let (format_name, duration) = match output.format {
        Some(format) => (
            format.format_name,
            format.duration.and_then(|d| d.parse::<f64>().ok()),
        ),
        None => (None, None),
    };

    Ok(ContainerInfo {
        format_name,
        duration,
        streams,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUDIO_ONLY: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "audio", "codec_name": "aac",
             "r_frame_rate": "0/0", "avg_frame_rate": "0/0",
             "disposition": {"default": 1, "attached_pic": 0}}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "3.000000"}
    }"#;

    const AUDIO_THEN_VIDEO: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "audio", "codec_name": "aac"},
            {"index": 1, "codec_type": "video", "codec_name": "mjpeg", "width": 300, "height": 300,
             "disposition": {"attached_pic": 1}},
            {"index": 2, "codec_type": "video", "codec_name": "h264", "width": 640, "height": 360,
             "avg_frame_rate": "30000/1001", "disposition": {"attached_pic": 0}},
            {"index": 3, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080}
        ],
        "format": {"format_name": "matroska,webm", "duration": "3.5"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_audio_only_has_no_video_stream() {
        let info = parse_ffprobe_output(AUDIO_ONLY.as_bytes()).unwrap();
        assert_eq!(info.streams.len(), 1);
        assert!(info.first_video_stream().is_none());
        assert_eq!(info.duration, Some(3.0));
    }

    #[test]
    fn test_first_video_stream_skips_cover_art() {
        let info = parse_ffprobe_output(AUDIO_THEN_VIDEO.as_bytes()).unwrap();
        let stream = info.first_video_stream().unwrap();

        assert_eq!(stream.index, 2);
        assert_eq!(stream.width, Some(640));
        assert!((stream.fps.unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_empty_ffprobe_output() {
        let info = parse_ffprobe_output(b"{}").unwrap();
        assert!(info.streams.is_empty());
        assert!(info.format_name.is_none());
    }
}
