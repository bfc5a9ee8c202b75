//! Classifier seam.

use async_trait::async_trait;
use vidisnap_media::ExtractedFrame;
use vidisnap_models::ClassificationResult;

use crate::error::ClassifyResult;
use crate::vocabulary::Vocabulary;

/// Produces a ranked probability distribution over a fixed vocabulary.
///
/// Implementations hold only read-only state after construction, so one
/// instance is shared by every concurrent request.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one frame.
    ///
    /// The result has exactly one entry per vocabulary label, sorted by
    /// descending score with ties in vocabulary order.
    async fn classify(&self, frame: &ExtractedFrame) -> ClassifyResult<ClassificationResult>;

    /// The closed label set this classifier emits.
    fn vocabulary(&self) -> &Vocabulary;
}
