//! Application state.

use std::sync::Arc;

use vidisnap_pipeline::{Pipeline, PipelineConfig, PipelineResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: ApiConfig, pipeline: Arc<Pipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Build state with the production pipeline. Loads the model.
    pub fn from_config(config: ApiConfig, pipeline_config: PipelineConfig) -> PipelineResult<Self> {
        let pipeline = Pipeline::from_config(pipeline_config)?;
        Ok(Self::new(config, Arc::new(pipeline)))
    }
}
