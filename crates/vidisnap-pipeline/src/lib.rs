//! Frame extraction and classification pipeline.
//!
//! This crate provides:
//! - The [`Pipeline`] orchestrator, the single entry point used by ingress
//! - Result assembly (top-K labels plus base64 thumbnail)
//! - The per-request state machine and error taxonomy
//! - Request logging and pipeline metrics

pub mod assembler;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod state;

pub use assembler::assemble;
pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError, PipelineResult, Stage};
pub use logging::{init_tracing, RequestLogger};
pub use orchestrator::Pipeline;
pub use state::{PipelineState, StateTracker};
