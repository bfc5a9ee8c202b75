//! Label vocabulary.
//!
//! Two on-disk formats are accepted:
//! - a Hugging Face model `config.json`, whose `id2label` map gives the labels
//!   by class index
//! - a plain text file with one label per line, in class index order

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ClassifyError, ClassifyResult};

/// Closed, ordered label set. Index `i` names model output `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HfConfig {
    id2label: HashMap<String, String>,
}

impl Vocabulary {
    /// Build from labels in class index order. Must not be empty.
    pub fn new<I, S>(labels: I) -> ClassifyResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ClassifyError::invalid_vocabulary("vocabulary is empty"));
        }
        Ok(Self { labels })
    }

    /// Load from a `.json` HF config or a plain label list.
    pub fn load(path: impl AsRef<Path>) -> ClassifyResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClassifyError::model_unavailable(format!("read labels {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_hf_config(&text)
        } else {
            Self::from_lines(&text)
        }
    }

    /// Parse the `id2label` map of a HF config.
    pub fn from_hf_config(json: &str) -> ClassifyResult<Self> {
        let config: HfConfig = serde_json::from_str(json)
            .map_err(|e| ClassifyError::invalid_vocabulary(format!("bad config.json: {}", e)))?;

        let mut indexed = config
            .id2label
            .into_iter()
            .map(|(id, label)| {
                id.trim()
                    .parse::<usize>()
                    .map(|idx| (idx, label))
                    .map_err(|_| {
                        ClassifyError::invalid_vocabulary(format!("non-numeric label id {:?}", id))
                    })
            })
            .collect::<ClassifyResult<Vec<_>>>()?;

        indexed.sort_by_key(|(idx, _)| *idx);

        // Ids must cover 0..n exactly.
        if let Some(pos) = indexed.iter().enumerate().position(|(i, (idx, _))| i != *idx) {
            return Err(ClassifyError::invalid_vocabulary(format!(
                "label ids are not contiguous at position {}",
                pos
            )));
        }

        Self::new(indexed.into_iter().map(|(_, label)| label))
    }

    /// One label per line; line `i` names class `i`.
    ///
    /// Trailing blank lines are ignored. A blank line anywhere else would
    /// shift every later class index, so it is rejected.
    pub fn from_lines(text: &str) -> ClassifyResult<Self> {
        let labels = text
            .trim_end()
            .lines()
            .enumerate()
            .map(|(idx, line)| {
                let label = line.trim();
                if label.is_empty() {
                    Err(ClassifyError::invalid_vocabulary(format!(
                        "blank label on line {}",
                        idx + 1
                    )))
                } else {
                    Ok(label.to_string())
                }
            })
            .collect::<ClassifyResult<Vec<_>>>()?;

        Self::new(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
