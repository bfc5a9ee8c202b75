//! The single frame decoded from an upload.

use image::{ImageFormat, RgbImage};

use crate::error::{MediaError, MediaResult};

/// The first frame of the selected video stream, decoded to RGB.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    image: RgbImage,
    encoded_png: Vec<u8>,
}

impl ExtractedFrame {
    pub fn new(image: RgbImage, encoded_png: Vec<u8>) -> Self {
        Self { image, encoded_png }
    }

    /// Decode a PNG produced by the decoder.
    pub fn from_png(png: Vec<u8>) -> MediaResult<Self> {
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| {
                MediaError::corrupt_input(format!("decoded frame is not a valid PNG: {}", e))
            })?
            .to_rgb8();

        Ok(Self::new(image, png))
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Zero width or height.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Lossless PNG encoding of the frame.
    pub fn encoded_png(&self) -> &[u8] {
        &self.encoded_png
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn png_of(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_from_png() {
        let frame = ExtractedFrame::from_png(png_of(4, 3)).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert_eq!(frame.image().get_pixel(0, 0), &Rgb([10, 20, 30]));
        assert!(!frame.is_degenerate());
    }

    #[test]
    fn test_from_garbage_is_corrupt_input() {
        let err = ExtractedFrame::from_png(b"not a png".to_vec()).unwrap_err();
        assert!(matches!(err, MediaError::CorruptInput(_)));
    }

    #[test]
    fn test_degenerate_frame() {
        let frame = ExtractedFrame::new(RgbImage::new(0, 10), Vec::new());
        assert!(frame.is_degenerate());
    }
}
