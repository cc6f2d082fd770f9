//! Threshold check deciding whether a label needs a fresh dataset.
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument};

use retro_model::{Label, LabelPipeline};

use crate::error::CountError;

/// Store of reviewed misclassification records.
#[async_trait]
pub trait MisclassificationSource: Send + Sync {
    /// Number of reviewed records of `label` whose confirmed value differs from the prediction.
    async fn misclassified_count(&self, label: Label) -> Result<u64, CountError>;
}

/// Result of a threshold check for one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdVerdict {
    pub label: Label,
    pub misclassified: u64,
    /// Correctly classified samples added to the dataset (`floor(M / 2)`).
    pub sampled_correct: u64,
    pub required_len: u64,
    pub threshold: u64,
    pub needs_prep: bool,
}

/// Dataset size required for `misclassified` records: `M + floor(M * 0.5)`.
#[inline]
pub fn required_len(misclassified: u64) -> u64 {
    misclassified.saturating_add(misclassified / 2)
}

/// Evaluates the misclassification signal of each label against its threshold.
pub struct ThresholdMonitor {
    source: Arc<dyn MisclassificationSource>,
}

impl ThresholdMonitor {
    pub fn new(source: Arc<dyn MisclassificationSource>) -> Self {
        Self { source }
    }

    /// Query the count for `pipeline.label` and compare it to the pipeline threshold.
    #[instrument(level = "debug", skip(self, pipeline), fields(label = %pipeline.label))]
    pub async fn evaluate(&self, pipeline: &LabelPipeline) -> Result<ThresholdVerdict, CountError> {
        let misclassified = self.source.misclassified_count(pipeline.label).await?;
        let verdict = verdict(pipeline.label, misclassified, pipeline.threshold);

        debug!(
            misclassified = verdict.misclassified,
            sampled_correct = verdict.sampled_correct,
            "misclassification count loaded"
        );
        info!(
            label = %verdict.label,
            required_len = verdict.required_len,
            threshold = verdict.threshold,
            needs_prep = verdict.needs_prep,
            "threshold evaluated"
        );
        Ok(verdict)
    }
}

fn verdict(label: Label, misclassified: u64, threshold: u64) -> ThresholdVerdict {
    let required_len = required_len(misclassified);
    ThresholdVerdict {
        label,
        misclassified,
        sampled_correct: misclassified / 2,
        required_len,
        threshold,
        needs_prep: required_len >= threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedCounts, pipeline};
    use std::collections::HashMap;

    fn monitor(label: Label, count: Result<u64, String>) -> ThresholdMonitor {
        ThresholdMonitor::new(Arc::new(FixedCounts(HashMap::from([(label, count)]))))
    }

    #[test]
    fn required_len_adds_half_rounded_down() {
        assert_eq!(required_len(0), 0);
        assert_eq!(required_len(1), 1);
        assert_eq!(required_len(3), 4);
        assert_eq!(required_len(1000), 1500);
        assert_eq!(required_len(u64::MAX), u64::MAX);
    }

    #[test]
    fn needs_prep_matches_formula_for_a_grid() {
        for m in 0..200u64 {
            for t in 1..200u64 {
                let v = verdict(Label::Urgency, m, t);
                assert_eq!(v.needs_prep, m + m / 2 >= t, "m={m} t={t}");
            }
        }
    }

    #[test]
    fn zero_count_never_needs_prep() {
        for t in [1, 2, 1500, u64::MAX] {
            assert!(!verdict(Label::Department, 0, t).needs_prep);
        }
    }

    #[tokio::test]
    async fn thousand_records_reach_default_threshold() {
        let v = monitor(Label::Department, Ok(1000))
            .evaluate(&pipeline(Label::Department, 1500))
            .await
            .unwrap();
        assert_eq!(v.required_len, 1500);
        assert_eq!(v.sampled_correct, 500);
        assert!(v.needs_prep);
    }

    #[tokio::test]
    async fn nine_hundred_records_stay_below_default_threshold() {
        let v = monitor(Label::Department, Ok(900))
            .evaluate(&pipeline(Label::Department, 1500))
            .await
            .unwrap();
        assert_eq!(v.required_len, 1350);
        assert!(!v.needs_prep);
    }

    #[tokio::test]
    async fn query_failure_is_returned() {
        let err = monitor(Label::Urgency, Err("connection refused".to_string()))
            .evaluate(&pipeline(Label::Urgency, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CountError::Query { label: Label::Urgency, .. }));
    }
}
