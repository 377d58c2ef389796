//! Choosing one document among several same-typed candidates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::BoundedExtractor;
use super::prompt;
use super::schema::{FieldKind, FieldSchema, FieldSpec};
use super::ExtractionError;

/// A classifier's pick and, when it gave one, its explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub index: usize,
    pub reason: Option<String>,
}

/// Picks one candidate by name. May return an out-of-range index; callers
/// must bounds-check.
#[async_trait]
pub trait CandidateClassifier: Send + Sync {
    async fn classify(&self, names: &[String]) -> Result<Classification, ExtractionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Only one candidate existed.
    Single,
    /// The classifier picked a valid index; its reason is kept.
    Classified,
    /// Classifier failed or returned an out-of-range index; last candidate used.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub index: usize,
    pub method: SelectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Selects among `names`.
///
/// No candidates gives `None`; one candidate is used without consulting the
/// classifier; otherwise the classifier decides, falling back to the last
/// candidate in input order.
pub async fn select_candidate(
    classifier: &dyn CandidateClassifier,
    names: &[String],
) -> Option<Selection> {
    match names.len() {
        0 => None,
        1 => Some(Selection {
            index: 0,
            method: SelectionMethod::Single,
            reason: None,
        }),
        n => {
            let last = n - 1;
            let selection = match classifier.classify(names).await {
                Ok(Classification { index, reason }) if index < n => Selection {
                    index,
                    method: SelectionMethod::Classified,
                    reason,
                },
                Ok(Classification { index, .. }) => {
                    tracing::warn!(index, candidates = n, "Classifier index out of range");
                    Selection {
                        index: last,
                        method: SelectionMethod::Fallback,
                        reason: Some(format!(
                            "classifier returned index {} for {} candidates",
                            index, n
                        )),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Candidate classification failed");
                    Selection {
                        index: last,
                        method: SelectionMethod::Fallback,
                        reason: Some(e.to_string()),
                    }
                }
            };
            Some(selection)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClassifierReply {
    selected_index: i64,
    #[serde(default)]
    reason: Option<String>,
}

/// Classifier backed by a secondary structured request that sees only the
/// candidate filenames.
#[derive(Clone)]
pub struct ModelClassifier {
    extractor: BoundedExtractor,
}

impl ModelClassifier {
    pub fn new(extractor: BoundedExtractor) -> Self {
        Self { extractor }
    }

    pub fn schema() -> FieldSchema {
        FieldSchema::new(
            "media_plan_selection",
            vec![
                FieldSpec::required("selected_index", FieldKind::Integer)
                    .describe("Zero-based index of the actualized media plan"),
                FieldSpec::optional("reason", FieldKind::String),
            ],
        )
    }
}

#[async_trait]
impl CandidateClassifier for ModelClassifier {
    async fn classify(&self, names: &[String]) -> Result<Classification, ExtractionError> {
        let reply: ClassifierReply = self
            .extractor
            .typed(&prompt::media_plan_candidates(names), &Self::schema())
            .await?;

        let index =
            usize::try_from(reply.selected_index).map_err(|_| ExtractionError::SchemaMismatch {
                schema: "media_plan_selection".to_string(),
                errors: format!("negative selected_index {}", reply.selected_index),
            })?;

        tracing::debug!(index, reason = ?reply.reason, "Candidate classified");
        Ok(Classification {
            index,
            reason: reply.reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: Option<usize>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(reply: Option<usize>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CandidateClassifier for Scripted {
        async fn classify(&self, _names: &[String]) -> Result<Classification, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = self
                .reply
                .ok_or_else(|| ExtractionError::Malformed("no reply".to_string()))?;
            Ok(Classification {
                index,
                reason: Some(format!("candidate {} is marked actualized", index)),
            })
        }
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Media Plan {}.xlsx", i)).collect()
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let classifier = Scripted::new(Some(0));
        assert!(select_candidate(&classifier, &[]).await.is_none());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_candidate_skips_classifier() {
        let classifier = Scripted::new(Some(5));
        let selection = select_candidate(&classifier, &names(1)).await.unwrap();
        assert_eq!(selection.index, 0);
        assert_eq!(selection.method, SelectionMethod::Single);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classifier_pick_used_when_in_range() {
        let classifier = Scripted::new(Some(0));
        let selection = select_candidate(&classifier, &names(3)).await.unwrap();
        assert_eq!(selection.index, 0);
        assert_eq!(selection.method, SelectionMethod::Classified);
        assert_eq!(
            selection.reason.as_deref(),
            Some("candidate 0 is marked actualized")
        );
    }

    struct Reply(serde_json::Value);

    #[async_trait]
    impl crate::extraction::StructuredExtractor for Reply {
        async fn request(
            &self,
            _: &str,
            _: &FieldSchema,
        ) -> Result<serde_json::Value, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    fn model(reply: serde_json::Value) -> ModelClassifier {
        ModelClassifier::new(BoundedExtractor::new(
            std::sync::Arc::new(Reply(reply)),
            std::time::Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn test_model_reason_reaches_selection() {
        let classifier = model(serde_json::json!({
            "selected_index": 1,
            "reason": "filename says Actualized"
        }));
        let selection = select_candidate(&classifier, &names(3)).await.unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.method, SelectionMethod::Classified);
        assert_eq!(selection.reason.as_deref(), Some("filename says Actualized"));
    }

    #[tokio::test]
    async fn test_model_negative_index_falls_back() {
        let classifier = model(serde_json::json!({"selected_index": -1}));
        let selection = select_candidate(&classifier, &names(2)).await.unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.method, SelectionMethod::Fallback);
    }

    #[tokio::test]
    async fn test_out_of_range_falls_back_to_last() {
        let classifier = Scripted::new(Some(7));
        let selection = select_candidate(&classifier, &names(3)).await.unwrap();
        assert_eq!(selection.index, 2);
        assert_eq!(selection.method, SelectionMethod::Fallback);
        assert!(selection.reason.unwrap().contains("index 7"));
    }

    #[tokio::test]
    async fn test_classifier_error_falls_back_to_last() {
        let classifier = Scripted::new(None);
        let selection = select_candidate(&classifier, &names(2)).await.unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.method, SelectionMethod::Fallback);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }
}
