//! Pipeline configuration.

use std::time::Duration;

use vidisnap_classifier::ClassifierConfig;
use vidisnap_media::{ExtractorConfig, StoreConfig, ThumbnailConfig};

/// Pipeline configuration, including each component's settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Wall-clock budget for one invocation, on top of component deadlines
    pub budget: Duration,
    /// Also write the extracted frame (PNG) to the transient store
    pub persist_frame: bool,
    pub store: StoreConfig,
    pub extractor: ExtractorConfig,
    pub classifier: ClassifierConfig,
    pub thumbnail: ThumbnailConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(60),
            persist_frame: true,
            store: StoreConfig::default(),
            extractor: ExtractorConfig::default(),
            classifier: ClassifierConfig::default(),
            thumbnail: ThumbnailConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            budget: Duration::from_secs(
                std::env::var("VIDISNAP_PIPELINE_BUDGET_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            persist_frame: std::env::var("VIDISNAP_PERSIST_FRAME")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            store: StoreConfig::from_env(),
            extractor: ExtractorConfig::from_env(),
            classifier: ClassifierConfig::from_env(),
            thumbnail: ThumbnailConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.budget, Duration::from_secs(60));
        assert!(config.persist_frame);
    }
}
