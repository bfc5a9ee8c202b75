//! Pipeline orchestrator.
//!
//! Runs Store -> Extract -> Classify -> Assemble for one upload under an
//! overall budget. Every handle acquired along the way is released before
//! `analyze` returns, whichever way it returns. If the `analyze` future is
//! dropped mid-flight, the store scope releases on drop instead.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use vidisnap_classifier::{Classifier, OnnxClassifier};
use vidisnap_media::{
    ExtractedFrame, FfmpegFrameExtractor, FrameExtractor, StoreScope, TransientStore,
};
use vidisnap_models::{AnalysisResponse, ClassificationResult, RequestId, UploadedVideo, TOP_K};

use crate::assembler::assemble;
use crate::config::PipelineConfig;
use crate::error::{ErrorKind, PipelineError, PipelineResult, Stage};
use crate::logging::RequestLogger;
use crate::metrics;
use crate::state::{PipelineState, StateTracker};

/// Name under which the extracted frame is persisted.
const FRAME_NAME: &str = "frame.png";

/// The single entry point from ingress into the core.
pub struct Pipeline {
    store: Arc<TransientStore>,
    extractor: Arc<dyn FrameExtractor>,
    classifier: Arc<dyn Classifier>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<TransientStore>,
        extractor: Arc<dyn FrameExtractor>,
        classifier: Arc<dyn Classifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            classifier,
            config,
        }
    }

    /// Build the production pipeline: FFmpeg extractor and ONNX classifier.
    ///
    /// Loads the model; call once at startup.
    pub fn from_config(config: PipelineConfig) -> PipelineResult<Self> {
        let classifier = OnnxClassifier::load(config.classifier.clone())?;
        let store = TransientStore::new(config.store.clone());
        let extractor = FfmpegFrameExtractor::new(config.extractor.clone());

        Ok(Self::new(
            Arc::new(store),
            Arc::new(extractor),
            Arc::new(classifier),
            config,
        ))
    }

    pub fn store(&self) -> &Arc<TransientStore> {
        &self.store
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    /// Analyze one upload under a fresh request id.
    pub async fn analyze(&self, video: UploadedVideo) -> PipelineResult<AnalysisResponse> {
        self.analyze_with_id(video, RequestId::new()).await
    }

    /// Analyze one upload, tagging logs with `request_id`.
    pub async fn analyze_with_id(
        &self,
        video: UploadedVideo,
        request_id: RequestId,
    ) -> PipelineResult<AnalysisResponse> {
        let logger = RequestLogger::new(&request_id, "analyze");
        let span = logger.create_span();

        async move {
            let started = Instant::now();
            logger.log_start(&format!(
                "{} ({} bytes)",
                video.filename(),
                video.content_length()
            ));
            metrics::record_upload_size(video.content_length());

            let mut scope = StoreScope::new(Arc::clone(&self.store));
            let mut tracker = StateTracker::new();

            let budget = self.config.budget;
            let outcome = tokio::time::timeout(
                budget,
                self.run_stages(&video, &mut scope, &mut tracker, &logger),
            )
            .await;
            let result = match outcome {
                Ok(result) => result,
                Err(_) => Err(PipelineError::pipeline_timeout(
                    budget,
                    tracker.state().pending_stage(),
                )),
            };

            let released = scope.release_all().await;
            metrics::record_released_handles(released);
            metrics::record_store_usage(self.store.live_handles(), self.store.used_bytes());

            let elapsed = started.elapsed().as_secs_f64();
            match &result {
                Ok(response) => {
                    metrics::record_run(Ok(()), elapsed);
                    logger.log_completion(&format!(
                        "top label {:?} in {:.3}s",
                        response.labels.first().map(|l| l.label.as_str()),
                        elapsed
                    ));
                }
                Err(e) => {
                    let state = tracker.fail(e.stage, e.kind);
                    metrics::record_run(Err((e.stage, e.kind)), elapsed);
                    if e.kind.is_client_error() {
                        logger.log_warning(&format!("{} [{}]", e, state.as_str()));
                    } else {
                        logger.log_error(&format!("{} [{}]", e, state.as_str()));
                    }
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        video: &UploadedVideo,
        scope: &mut StoreScope,
        tracker: &mut StateTracker,
        logger: &RequestLogger,
    ) -> PipelineResult<AnalysisResponse> {
        let video_handle = timed(Stage::Store, scope.store(video.bytes(), video.filename()))
            .await
            .map_err(|e| PipelineError::from_media(Stage::Store, e))?;
        self.advance(tracker, logger);

        let frame: ExtractedFrame = timed(Stage::Extract, self.extractor.extract(&video_handle))
            .await
            .map_err(|e| PipelineError::from_media(Stage::Extract, e))?;

        if self.config.persist_frame {
            scope
                .store(frame.encoded_png(), FRAME_NAME)
                .await
                .map_err(|e| PipelineError::from_media(Stage::Store, e))?;
        }
        self.advance(tracker, logger);

        let classification: ClassificationResult =
            timed(Stage::Classify, self.classifier.classify(&frame)).await?;

        let vocabulary_len = self.classifier.vocabulary().len();
        if classification.len() != vocabulary_len {
            return Err(PipelineError::new(
                Stage::Classify,
                ErrorKind::InferenceFailed,
                format!(
                    "classifier returned {} entries for {} labels",
                    classification.len(),
                    vocabulary_len
                ),
            ));
        }
        if !classification.is_ranked() {
            return Err(PipelineError::new(
                Stage::Classify,
                ErrorKind::InferenceFailed,
                "classifier returned entries out of score order",
            ));
        }
        self.advance(tracker, logger);

        let response = timed(Stage::Assemble, async {
            assemble(&classification, &frame, TOP_K, &self.config.thumbnail)
        })
        .await?;
        self.advance(tracker, logger);
        self.advance(tracker, logger);

        Ok(response)
    }

    fn advance(&self, tracker: &mut StateTracker, logger: &RequestLogger) {
        if let Some(state) = tracker.advance() {
            if state != PipelineState::Done {
                logger.log_progress(state.as_str());
            }
        }
    }
}

/// Await `fut`, recording its duration under `stage`.
async fn timed<F: Future>(stage: Stage, fut: F) -> F::Output {
    let start = Instant::now();
    let output = fut.await;
    metrics::record_stage_duration(stage, start.elapsed().as_secs_f64());
    output
}
