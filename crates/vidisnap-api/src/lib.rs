//! Axum HTTP ingress.
//!
//! This crate provides:
//! - `POST /analyze` (multipart upload) calling the pipeline
//! - Liveness and readiness checks
//! - Request ID, logging and CORS middleware
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
