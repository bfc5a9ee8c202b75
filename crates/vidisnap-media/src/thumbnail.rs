//! Thumbnail encoding.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use vidisnap_models::{THUMBNAIL_JPEG_QUALITY, THUMBNAIL_MAX_WIDTH};

use crate::error::{MediaError, MediaResult};

/// Thumbnail settings.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Frames wider than this are downscaled
    pub max_width: u32,
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: THUMBNAIL_MAX_WIDTH,
            quality: THUMBNAIL_JPEG_QUALITY,
        }
    }
}

impl ThumbnailConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_width: std::env::var("VIDISNAP_THUMBNAIL_MAX_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|w| *w > 0)
                .unwrap_or(THUMBNAIL_MAX_WIDTH),
            quality: std::env::var("VIDISNAP_THUMBNAIL_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|q: u8| q.clamp(1, 100))
                .unwrap_or(THUMBNAIL_JPEG_QUALITY),
        }
    }
}

/// Encode a frame as a JPEG thumbnail, keeping its aspect ratio.
pub fn encode_thumbnail(frame: &RgbImage, config: &ThumbnailConfig) -> MediaResult<Vec<u8>> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(MediaError::Encode("cannot encode an empty frame".to_string()));
    }

    let (target_w, target_h) = thumbnail_size(width, height, config.max_width);
    let image = if (target_w, target_h) == (width, height) {
        DynamicImage::ImageRgb8(frame.clone())
    } else {
        DynamicImage::ImageRgb8(imageops::resize(frame, target_w, target_h, FilterType::Triangle))
    };

    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageOutputFormat::Jpeg(config.quality))
        .map_err(|e| MediaError::Encode(e.to_string()))?;

    Ok(buf.into_inner())
}

/// Scaled size with width capped at `max_width`, height rounded to nearest.
fn thumbnail_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (height as u64 * max_width as u64 + width as u64 / 2) / width as u64;
    (max_width, scaled.max(1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb};

    #[test]
    fn test_thumbnail_size() {
        assert_eq!(thumbnail_size(1920, 1080, 480), (480, 270));
        assert_eq!(thumbnail_size(320, 180, 480), (320, 180));
        assert_eq!(thumbnail_size(4000, 1, 480), (480, 1));
    }

    #[test]
    fn test_encode_downscales_and_keeps_aspect() {
        let frame = RgbImage::from_pixel(1280, 720, Rgb([200, 100, 50]));
        let jpeg = encode_thumbnail(&frame, &ThumbnailConfig::default()).unwrap();

        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (480, 270));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let frame = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, (x + y) as u8]));
        let config = ThumbnailConfig::default();

        let a = encode_thumbnail(&frame, &config).unwrap();
        let b = encode_thumbnail(&frame, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_rejects_empty_frame() {
        let err = encode_thumbnail(&RgbImage::new(0, 0), &ThumbnailConfig::default()).unwrap_err();
        assert!(matches!(err, MediaError::Encode(_)));
    }
}
