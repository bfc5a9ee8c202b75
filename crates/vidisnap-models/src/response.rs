//! Analysis response returned to callers.

use serde::{Deserialize, Serialize};

use crate::label::LabelScore;

/// Top-ranked labels plus a base64 thumbnail of the analysed frame.
///
/// Serializes to `{"labels": [{"label", "score"}...], "thumbnail_b64": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub labels: Vec<LabelScore>,
    pub thumbnail_b64: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let response = AnalysisResponse {
            labels: vec![
                LabelScore::new("tabby, tabby cat", 0.8123),
                LabelScore::new("Egyptian cat", 0.1),
            ],
            thumbnail_b64: "aGVsbG8=".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["labels"][0]["label"], "tabby, tabby cat");
        assert_eq!(json["thumbnail_b64"], "aGVsbG8=");
        assert_eq!(json.as_object().unwrap().len(), 2);
        assert_eq!(json["labels"][0].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_score_serializes_as_short_decimal() {
        let response = AnalysisResponse {
            labels: vec![LabelScore::new("cat", 0.8123)],
            thumbnail_b64: String::new(),
        };

        let text = serde_json::to_string(&response).unwrap();
        assert!(text.contains("\"score\":0.8123"));
    }
}
