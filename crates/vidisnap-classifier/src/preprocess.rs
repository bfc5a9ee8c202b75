//! Frame preprocessing for classification models.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::config::PreprocessConfig;

/// Resize, rescale and normalize an RGB frame into NCHW `[1, 3, H, W]` data.
///
/// - Resize to the configured geometry (bilinear, aspect not preserved)
/// - Rescale pixel values to [0, 1]
/// - Normalize each channel as `(v - mean) / std`
pub fn to_nchw(frame: &RgbImage, config: &PreprocessConfig) -> Vec<f32> {
    let (w, h) = (config.width, config.height);

    let resized;
    let rgb = if frame.dimensions() == (w, h) {
        frame
    } else {
        resized = imageops::resize(frame, w, h, FilterType::Triangle);
        &resized
    };

    let (w, h) = (w as usize, h as usize);
    let mut chw = Vec::with_capacity(3 * h * w);
    let raw = rgb.as_raw();

    // HWC -> CHW
    for c in 0..3 {
        let mean = config.mean[c];
        let std = config.std[c];
        for y in 0..h {
            for x in 0..w {
                let v = raw[(y * w + x) * 3 + c] as f32 / 255.0;
                chw.push((v - mean) / std);
            }
        }
    }

    chw
}

/// Tensor shape for [`to_nchw`] output.
pub fn input_shape(config: &PreprocessConfig) -> Vec<usize> {
    vec![1, 3, config.height as usize, config.width as usize]
}
