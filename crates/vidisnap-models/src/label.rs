//! Ranked classifier output.

use serde::{Deserialize, Serialize};

/// A single vocabulary label with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// Label from the classifier vocabulary
    pub label: String,
    /// Probability in [0, 1]
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Full classifier output, one entry per vocabulary label.
///
/// Entries are ordered by descending score; equal scores keep the
/// vocabulary's index order. Construct through [`ClassificationResult::rank`]
/// to get that ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    entries: Vec<LabelScore>,
}

impl ClassificationResult {
    /// Pair each probability with its label and sort.
    ///
    /// `labels` and `probabilities` are in vocabulary index order. Extra
    /// entries on either side are ignored.
    pub fn rank<S: AsRef<str>>(labels: &[S], probabilities: &[f32]) -> Self {
        let mut indexed: Vec<(usize, f32)> = probabilities
            .iter()
            .copied()
            .take(labels.len())
            .enumerate()
            .collect();

        // Stable sort: ties stay in index order.
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

        let entries = indexed
            .into_iter()
            .map(|(idx, score)| LabelScore::new(labels[idx].as_ref(), score))
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First `k` entries (fewer if the result is shorter).
    pub fn top(&self, k: usize) -> &[LabelScore] {
        &self.entries[..k.min(self.entries.len())]
    }

    /// Check that scores never increase along the ranking.
    pub fn is_ranked(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].score >= w[1].score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_orders_descending() {
        let labels = ["cat", "dog", "car"];
        let result = ClassificationResult::rank(&labels, &[0.2, 0.7, 0.1]);

        let order: Vec<&str> = result.top(result.len()).iter().map(|e| e.label.as_str()).collect();
        assert_eq!(order, vec!["dog", "cat", "car"]);
        assert!(result.is_ranked());
    }

    #[test]
    fn test_rank_breaks_ties_by_vocabulary_index() {
        let labels = ["a", "b", "c", "d"];
        let result = ClassificationResult::rank(&labels, &[0.25, 0.25, 0.25, 0.25]);

        let order: Vec<&str> = result.top(result.len()).iter().map(|e| e.label.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_top_truncates() {
        let labels = ["a", "b", "c", "d"];
        let result = ClassificationResult::rank(&labels, &[0.1, 0.4, 0.3, 0.2]);

        assert_eq!(result.len(), 4);
        assert_eq!(result.top(3).len(), 3);
        assert_eq!(result.top(10).len(), 4);
        assert_eq!(result.top(1)[0].label, "b");
    }

    #[test]
    fn test_is_ranked_detects_disorder() {
        let result: ClassificationResult = serde_json::from_str(
            r#"{"entries": [{"label": "a", "score": 0.1}, {"label": "b", "score": 0.9}]}"#,
        )
        .unwrap();
        assert!(!result.is_ranked());
    }
}
