use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    domain::{Label, RunId},
    error::{ModelError, ModelResult},
};

/// Verdict of the challenger gate.
///
/// `Rejected` is a successful terminal state, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Accepted => "accepted",
            Decision::Rejected => "rejected",
        })
    }
}

/// Per-class metrics of a classification report.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Classification report keyed by class name.
pub type ClassificationReport = BTreeMap<String, ClassMetrics>;

/// Record of one retraining attempt for a label.
///
/// Created when training starts. The decision is written exactly once by [`TrainingRun::decide`] and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRun {
    pub run_id: RunId,
    pub label: Label,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(default)]
    pub classification_report: ClassificationReport,
    #[serde(default)]
    pub confusion_matrix: Vec<Vec<u64>>,
    #[serde(default)]
    pub challenger_macro_f1: f64,
    #[serde(default)]
    pub champion_macro_f1: Option<f64>,
    #[serde(default)]
    decision: Option<Decision>,
}

impl TrainingRun {
    /// Start a new run with empty evaluation results.
    pub fn start(run_id: impl Into<RunId>, label: Label, started_at: OffsetDateTime) -> Self {
        Self {
            run_id: run_id.into(),
            label,
            started_at,
            classification_report: ClassificationReport::new(),
            confusion_matrix: Vec::new(),
            challenger_macro_f1: 0.0,
            champion_macro_f1: None,
            decision: None,
        }
    }

    /// Decision of the gate, if it was already rendered.
    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Returns `true` only for runs whose decision is `accepted`.
    pub fn is_accepted(&self) -> bool {
        self.decision.is_some_and(|d| d.is_accepted())
    }

    /// Record the champion score and the gate decision.
    ///
    /// Fails if a decision was already recorded for this run.
    pub fn decide(&mut self, champion_macro_f1: f64, decision: Decision) -> ModelResult<()> {
        if let Some(existing) = self.decision {
            return Err(ModelError::DecisionAlreadySet {
                run_id: self.run_id.clone(),
                decision: existing.to_string(),
            });
        }
        self.champion_macro_f1 = Some(champion_macro_f1);
        self.decision = Some(decision);
        Ok(())
    }
}
