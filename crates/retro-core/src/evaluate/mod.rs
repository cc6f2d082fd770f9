//! Challenger gate: compares a challenger's held-out macro-F1 against the live champion.
mod score;
pub use score::macro_f1;

use std::sync::Arc;

use async_trait::async_trait;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use retro_model::{Decision, EVALUATION_SEED, Label};

use crate::{
    config::EvaluatorConfig,
    error::FetchError,
    metrics::{MetricsHandle, noop_metrics},
};

/// Inference access to the serving champion.
#[async_trait]
pub trait ChampionClient: Send + Sync {
    /// Predict a label for every text; the result has one entry per input, in input order.
    ///
    /// Per-item failures are reported in place and never fail the whole batch.
    async fn batch_predict(&self, endpoint: &str, texts: &[String])
    -> Vec<Result<String, FetchError>>;
}

/// Accept iff the challenger beats the champion by strictly more than `threshold`.
#[inline]
pub fn gate(challenger_macro_f1: f64, champion_macro_f1: f64, threshold: f64) -> Decision {
    if challenger_macro_f1 > champion_macro_f1 + threshold {
        Decision::Accepted
    } else {
        Decision::Rejected
    }
}

/// Result of a challenger evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Champion score; `None` when no serving endpoint is configured.
    pub champion_macro_f1: Option<f64>,
    pub decision: Decision,
    /// Examples sent to the champion.
    pub sampled: usize,
    /// Examples with a usable champion prediction.
    pub usable: usize,
}

/// Renders the accept/reject decision for a challenger.
pub struct ChallengerEvaluator {
    client: Arc<dyn ChampionClient>,
    cfg: EvaluatorConfig,
    metrics: MetricsHandle,
}

impl ChallengerEvaluator {
    pub fn new(client: Arc<dyn ChampionClient>, cfg: EvaluatorConfig) -> Self {
        Self {
            client,
            cfg,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Indices of the evaluation sample: a seeded shuffle of `0..len` cut to `sample_size`.
    pub fn sample_indices(len: usize, sample_size: usize) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..len).collect();
        idx.shuffle(&mut StdRng::seed_from_u64(EVALUATION_SEED));
        idx.truncate(sample_size.min(len));
        idx
    }

    /// Macro-F1 of the champion on a fixed sample of the held-out set.
    ///
    /// Returns the score with the number of sampled and usable examples. Unusable predictions (failed calls or unknown labels) are excluded; no usable prediction scores `0.0`.
    pub async fn champion_macro_f1(
        &self,
        label: Label,
        endpoint: &str,
        held_out_texts: &[String],
        held_out_labels: &[usize],
    ) -> (f64, usize, usize) {
        let len = held_out_texts.len().min(held_out_labels.len());
        let sample = Self::sample_indices(len, self.cfg.sample_size);
        let texts: Vec<String> = sample.iter().map(|&i| held_out_texts[i].clone()).collect();

        let predictions = self.client.batch_predict(endpoint, &texts).await;

        let mut y_true = Vec::with_capacity(sample.len());
        let mut y_pred = Vec::with_capacity(sample.len());
        let mut failed = 0usize;
        let mut unknown = 0usize;
        for (&i, prediction) in sample.iter().zip(predictions) {
            match prediction {
                Ok(raw) => match label.class_index(&raw) {
                    Some(class) => {
                        y_true.push(held_out_labels[i]);
                        y_pred.push(class);
                    }
                    None => unknown += 1,
                },
                Err(_) => failed += 1,
            }
        }
        if failed + unknown > 0 {
            warn!(
                %label,
                failed,
                unknown,
                sampled = sample.len(),
                "champion predictions excluded from scoring"
            );
        }
        (macro_f1(&y_true, &y_pred), sample.len(), y_true.len())
    }

    /// Compare `challenger_macro_f1` against the champion behind `endpoint`.
    ///
    /// Without an endpoint the champion scores `0.0` and is not queried.
    #[instrument(level = "info", skip_all, fields(label = %label, challenger_macro_f1 = challenger_macro_f1))]
    pub async fn decide(
        &self,
        label: Label,
        challenger_macro_f1: f64,
        endpoint: Option<&str>,
        held_out_texts: &[String],
        held_out_labels: &[usize],
    ) -> Evaluation {
        let (champion, sampled, usable) = match endpoint {
            Some(endpoint) => {
                let (f1, sampled, usable) = self
                    .champion_macro_f1(label, endpoint, held_out_texts, held_out_labels)
                    .await;
                (Some(f1), sampled, usable)
            }
            None => {
                debug!("no serving endpoint configured; champion scores 0.0");
                (None, 0, 0)
            }
        };

        let champion_f1 = champion.unwrap_or(0.0);
        let decision = gate(challenger_macro_f1, champion_f1, self.cfg.decision_threshold);
        self.metrics
            .record_decision(label, decision, challenger_macro_f1, champion_f1);
        info!(
            champion_macro_f1 = champion_f1,
            threshold = self.cfg.decision_threshold,
            sampled,
            usable,
            %decision,
            "challenger evaluated"
        );
        Evaluation {
            champion_macro_f1: champion,
            decision,
            sampled,
            usable,
        }
    }
}
