//! Pipeline metrics.

use metrics::{counter, gauge, histogram};

use crate::error::{ErrorKind, Stage};

/// Metric names as constants for consistency.
pub mod names {
    pub const PIPELINE_RUNS_TOTAL: &str = "vidisnap_pipeline_runs_total";
    pub const PIPELINE_FAILURES_TOTAL: &str = "vidisnap_pipeline_failures_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "vidisnap_pipeline_duration_seconds";
    pub const STAGE_DURATION_SECONDS: &str = "vidisnap_stage_duration_seconds";
    pub const UPLOAD_BYTES: &str = "vidisnap_upload_bytes";
    pub const RELEASED_HANDLES_TOTAL: &str = "vidisnap_released_handles_total";
    pub const STORE_LIVE_HANDLES: &str = "vidisnap_store_live_handles";
    pub const STORE_USED_BYTES: &str = "vidisnap_store_used_bytes";
}

/// Record how long one stage took.
pub fn record_stage_duration(stage: Stage, duration_secs: f64) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a finished invocation.
pub fn record_run(outcome: Result<(), (Stage, ErrorKind)>, duration_secs: f64) {
    let status = if outcome.is_ok() { "ok" } else { "error" };
    let labels = [("status", status.to_string())];
    counter!(names::PIPELINE_RUNS_TOTAL, &labels).increment(1);
    histogram!(names::PIPELINE_DURATION_SECONDS, &labels).record(duration_secs);

    if let Err((stage, kind)) = outcome {
        let labels = [
            ("stage", stage.as_str().to_string()),
            ("kind", kind.as_str().to_string()),
        ];
        counter!(names::PIPELINE_FAILURES_TOTAL, &labels).increment(1);
    }
}

pub fn record_upload_size(bytes: u64) {
    histogram!(names::UPLOAD_BYTES).record(bytes as f64);
}

pub fn record_released_handles(count: usize) {
    counter!(names::RELEASED_HANDLES_TOTAL).increment(count as u64);
}

/// Snapshot of the transient store after a request released its handles.
pub fn record_store_usage(live_handles: usize, used_bytes: u64) {
    gauge!(names::STORE_LIVE_HANDLES).set(live_handles as f64);
    gauge!(names::STORE_USED_BYTES).set(used_bytes as f64);
}
