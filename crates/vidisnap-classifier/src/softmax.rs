//! Logits to probabilities.

use crate::error::{ClassifyError, ClassifyResult};

/// Max-subtracted softmax. Non-finite logits are rejected.
pub fn softmax(logits: &[f32]) -> ClassifyResult<Vec<f32>> {
    if let Some(pos) = logits.iter().position(|v| !v.is_finite()) {
        return Err(ClassifyError::inference_failed(format!(
            "non-finite logit at index {}",
            pos
        )));
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    Ok(exps.into_iter().map(|e| e / sum).collect())
}
