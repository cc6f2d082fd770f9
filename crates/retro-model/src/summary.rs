use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{Label, RunId};
use crate::record::DatasetSnapshot;
use crate::strategy::ExitPolicy;

/// Furthest state a label reached during one orchestration run.
///
/// `Idle` is terminal for labels below their threshold. Terminal failure states are `PrepTriggerFailed` and `Timeout`; `RetrainTriggered` is the only terminal success state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabelPhase {
    Idle,
    ThresholdExceeded,
    PrepTriggered,
    PrepTriggerFailed,
    WaitingForDataset,
    DatasetReady,
    Timeout,
    RetrainTriggered,
}

impl LabelPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelPhase::Idle => "IDLE",
            LabelPhase::ThresholdExceeded => "THRESHOLD_EXCEEDED",
            LabelPhase::PrepTriggered => "PREP_TRIGGERED",
            LabelPhase::PrepTriggerFailed => "PREP_TRIGGER_FAILED",
            LabelPhase::WaitingForDataset => "WAITING_FOR_DATASET",
            LabelPhase::DatasetReady => "DATASET_READY",
            LabelPhase::Timeout => "TIMEOUT",
            LabelPhase::RetrainTriggered => "RETRAIN_TRIGGERED",
        }
    }
}

impl fmt::Display for LabelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStatus {
    Succeeded,
    Skipped,
    Failed,
}

impl LabelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelStatus::Succeeded => "succeeded",
            LabelStatus::Skipped => "skipped",
            LabelStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for LabelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one label's pass through the control loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelOutcome {
    pub label: Label,
    pub phase: LabelPhase,
    pub status: LabelStatus,
    /// Dataset size the label asked for (`M + floor(M / 2)`).
    pub required_len: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<DatasetSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LabelOutcome {
    /// Label stayed below its threshold.
    pub fn skipped(label: Label, required_len: u64) -> Self {
        Self {
            label,
            phase: LabelPhase::Idle,
            status: LabelStatus::Skipped,
            required_len,
            snapshot: None,
            error: None,
        }
    }

    /// Label reached `RETRAIN_TRIGGERED` with the given snapshot.
    pub fn succeeded(label: Label, required_len: u64, snapshot: DatasetSnapshot) -> Self {
        Self {
            label,
            phase: LabelPhase::RetrainTriggered,
            status: LabelStatus::Succeeded,
            required_len,
            snapshot: Some(snapshot),
            error: None,
        }
    }

    /// Label stopped at `phase` because of `error`.
    pub fn failed(
        label: Label,
        phase: LabelPhase,
        required_len: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            label,
            phase,
            status: LabelStatus::Failed,
            required_len,
            snapshot: None,
            error: Some(error.into()),
        }
    }

    /// Attach the snapshot that was accepted before the failure.
    pub fn with_snapshot(mut self, snapshot: DatasetSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == LabelStatus::Failed
    }
}

/// Outcome of one orchestration run across all configured labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: RunId,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub outcomes: BTreeMap<Label, LabelOutcome>,
}

impl RunSummary {
    pub fn new(run_id: impl Into<RunId>, started_at: OffsetDateTime) -> Self {
        Self {
            run_id: run_id.into(),
            started_at,
            finished_at: started_at,
            outcomes: BTreeMap::new(),
        }
    }

    /// Record an outcome, replacing any earlier outcome for the same label.
    pub fn record(&mut self, outcome: LabelOutcome) {
        self.outcomes.insert(outcome.label, outcome);
    }

    pub fn count(&self, status: LabelStatus) -> usize {
        self.outcomes.values().filter(|o| o.status == status).count()
    }

    pub fn failed_labels(&self) -> Vec<Label> {
        self.outcomes
            .values()
            .filter(|o| o.is_failed())
            .map(|o| o.label)
            .collect()
    }

    /// Returns `true` if the run counts as successful under `policy`.
    pub fn is_success(&self, policy: ExitPolicy) -> bool {
        let failed = self.count(LabelStatus::Failed);
        let succeeded = self.count(LabelStatus::Succeeded);
        match policy {
            ExitPolicy::BestEffort => true,
            ExitPolicy::AnyFailure => failed == 0,
            ExitPolicy::AllFailed => !(failed > 0 && succeeded == 0),
        }
    }

    /// Process exit code for this run: `0` on success, `2` otherwise.
    pub fn exit_code(&self, policy: ExitPolicy) -> u8 {
        if self.is_success(policy) { 0 } else { 2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(outcomes: Vec<LabelOutcome>) -> RunSummary {
        let mut s = RunSummary::new("run-1", OffsetDateTime::UNIX_EPOCH);
        for o in outcomes {
            s.record(o);
        }
        s
    }

    fn ok(label: Label) -> LabelOutcome {
        LabelOutcome::succeeded(label, 1500, DatasetSnapshot::new("v2", 1600))
    }

    fn timeout(label: Label) -> LabelOutcome {
        LabelOutcome::failed(label, LabelPhase::Timeout, 1500, "timed out")
    }

    #[test]
    fn exit_policy_table() {
        let all_ok = summary(vec![ok(Label::Department), ok(Label::Urgency)]);
        let mixed = summary(vec![ok(Label::Department), timeout(Label::Urgency)]);
        let all_failed = summary(vec![timeout(Label::Department), timeout(Label::Urgency)]);
        let idle = summary(vec![
            LabelOutcome::skipped(Label::Department, 0),
            LabelOutcome::skipped(Label::Urgency, 10),
        ]);

        let cases = [
            (&all_ok, ExitPolicy::BestEffort, 0),
            (&all_ok, ExitPolicy::AnyFailure, 0),
            (&all_ok, ExitPolicy::AllFailed, 0),
            (&mixed, ExitPolicy::BestEffort, 0),
            (&mixed, ExitPolicy::AnyFailure, 2),
            (&mixed, ExitPolicy::AllFailed, 0),
            (&all_failed, ExitPolicy::BestEffort, 0),
            (&all_failed, ExitPolicy::AnyFailure, 2),
            (&all_failed, ExitPolicy::AllFailed, 2),
            (&idle, ExitPolicy::BestEffort, 0),
            (&idle, ExitPolicy::AnyFailure, 0),
            (&idle, ExitPolicy::AllFailed, 0),
        ];
        for (s, policy, code) in cases {
            assert_eq!(s.exit_code(policy), code, "policy={policy} outcomes={:?}", s.outcomes);
        }
    }

    #[test]
    fn failed_labels_lists_only_failures() {
        let s = summary(vec![ok(Label::Department), timeout(Label::Urgency)]);
        assert_eq!(s.failed_labels(), vec![Label::Urgency]);
    }

    #[test]
    fn phases_serialize_in_upper_snake_case() {
        let json = serde_json::to_string(&timeout(Label::Urgency)).unwrap();
        assert!(json.contains(r#""phase":"TIMEOUT""#), "{json}");
        assert!(json.contains(r#""status":"failed""#), "{json}");
        assert_eq!(
            serde_json::to_string(&LabelPhase::PrepTriggerFailed).unwrap(),
            format!("\"{}\"", LabelPhase::PrepTriggerFailed)
        );
    }
}
