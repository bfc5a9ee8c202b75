//! Result assembly: top-K truncation plus the base64 thumbnail.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use vidisnap_media::{encode_thumbnail, ExtractedFrame, ThumbnailConfig};
use vidisnap_models::encoding::round_score;
use vidisnap_models::{AnalysisResponse, ClassificationResult, LabelScore};

use crate::error::{PipelineError, PipelineResult, Stage};

/// Build the response from a full classification and its source frame.
///
/// Fails only on an empty classification, or if the frame cannot be encoded.
pub fn assemble(
    classification: &ClassificationResult,
    frame: &ExtractedFrame,
    k: usize,
    thumbnail: &ThumbnailConfig,
) -> PipelineResult<AnalysisResponse> {
    if classification.is_empty() {
        return Err(PipelineError::empty_result());
    }

    let labels = classification
        .top(k)
        .iter()
        .map(|entry| LabelScore::new(entry.label.clone(), round_score(entry.score)))
        .collect();

    let jpeg = encode_thumbnail(frame.image(), thumbnail)
        .map_err(|e| PipelineError::from_media(Stage::Assemble, e))?;

    Ok(AnalysisResponse {
        labels,
        thumbnail_b64: STANDARD.encode(jpeg),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{Rgb, RgbImage};

    fn frame(width: u32, height: u32) -> ExtractedFrame {
        ExtractedFrame::new(
            RgbImage::from_pixel(width, height, Rgb([200, 120, 40])),
            Vec::new(),
        )
    }

    fn classification() -> ClassificationResult {
        ClassificationResult::rank(
            &["tench", "goldfish", "tabby cat", "tiger cat", "Egyptian cat"],
            &[0.01, 0.02, 0.61234567, 0.25, 0.11],
        )
    }

    #[test]
    fn test_truncates_to_k() {
        let config = ThumbnailConfig::default();
        let response = assemble(&classification(), &frame(64, 48), 3, &config).unwrap();

        let labels: Vec<&str> = response.labels.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["tabby cat", "tiger cat", "Egyptian cat"]);
        assert_eq!(response.labels[0].score, 0.6123);
    }

    #[test]
    fn test_fewer_labels_than_k() {
        let classification = ClassificationResult::rank(&["cat", "dog"], &[0.3, 0.7]);
        let config = ThumbnailConfig::default();
        let response = assemble(&classification, &frame(8, 8), 3, &config).unwrap();
        assert_eq!(response.labels.len(), 2);
        assert_eq!(response.labels[0].label, "dog");
    }

    #[test]
    fn test_empty_classification_is_rejected() {
        let err = assemble(
            &ClassificationResult::default(),
            &frame(8, 8),
            3,
            &ThumbnailConfig::default(),
        )
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::EmptyResult);
        assert_eq!(err.stage, Stage::Assemble);
    }

    #[test]
    fn test_thumbnail_is_base64_jpeg_with_frame_aspect() {
        let config = ThumbnailConfig::default();
        let response = assemble(&classification(), &frame(960, 540), 3, &config).unwrap();

        let bytes = STANDARD.decode(&response.thumbnail_b64).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (480, 270));
    }

    #[test]
    fn test_deterministic_thumbnail() {
        let config = ThumbnailConfig::default();
        let a = assemble(&classification(), &frame(320, 200), 3, &config).unwrap();
        let b = assemble(&classification(), &frame(320, 200), 3, &config).unwrap();
        assert_eq!(a, b);
    }
}
