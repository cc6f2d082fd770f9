//! Train → evaluate → deploy cycle of a single label.
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use retro_model::{
    ClassificationReport, DatasetSnapshot, LabelPipeline, ModelError, ModelVersion, TrainingRun,
};

use crate::{
    deploy::DeploymentController,
    error::{DeployError, TrainError},
    evaluate::{ChallengerEvaluator, Evaluation},
};

/// Everything a trainer reports about a finished fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerOutput {
    #[serde(default)]
    pub classification_report: ClassificationReport,
    #[serde(default)]
    pub confusion_matrix: Vec<Vec<u64>>,
    pub challenger_macro_f1: f64,
    /// Held-out texts, aligned with `held_out_labels`.
    #[serde(default)]
    pub held_out_texts: Vec<String>,
    /// Class ids of the held-out texts.
    #[serde(default)]
    pub held_out_labels: Vec<usize>,
    /// Location of the trained artifacts (directory, URI, ...).
    pub artifact: String,
}

impl TrainerOutput {
    fn validate(&self) -> Result<(), TrainError> {
        if !self.challenger_macro_f1.is_finite() || !(0.0..=1.0).contains(&self.challenger_macro_f1) {
            return Err(TrainError::Output(format!(
                "challenger_macro_f1 out of range: {}",
                self.challenger_macro_f1
            )));
        }
        if self.held_out_texts.len() != self.held_out_labels.len() {
            return Err(TrainError::Output(format!(
                "{} held-out texts but {} labels",
                self.held_out_texts.len(),
                self.held_out_labels.len()
            )));
        }
        if self.artifact.trim().is_empty() {
            return Err(TrainError::Output("empty artifact reference".into()));
        }
        Ok(())
    }
}

/// Opaque training capability.
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Trainer name used in logs.
    fn name(&self) -> &'static str;

    /// Fit a challenger on `dataset` and evaluate it on a held-out split.
    async fn fit_and_evaluate(
        &self,
        dataset: &DatasetSnapshot,
        pipeline: &LabelPipeline,
        cancel: &CancellationToken,
    ) -> Result<TrainerOutput, TrainError>;
}

#[derive(Debug, Error)]
pub enum RetrainError {
    #[error(transparent)]
    Train(#[from] TrainError),

    #[error(transparent)]
    Decision(#[from] ModelError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

/// Result of a completed retrain cycle.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub run: TrainingRun,
    pub evaluation: Evaluation,
    /// Promoted version; `None` for rejected challengers.
    pub deployed: Option<ModelVersion>,
}

/// Drives one label's retrain: fit, gate, and deploy when accepted.
pub struct TrainingCoordinator {
    trainer: Arc<dyn Trainer>,
    evaluator: ChallengerEvaluator,
    deployer: DeploymentController,
}

impl TrainingCoordinator {
    pub fn new(
        trainer: Arc<dyn Trainer>,
        evaluator: ChallengerEvaluator,
        deployer: DeploymentController,
    ) -> Self {
        Self {
            trainer,
            evaluator,
            deployer,
        }
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(label = %pipeline.label, dataset = %dataset.version_tag, trainer = self.trainer.name())
    )]
    pub async fn run(
        &self,
        pipeline: &LabelPipeline,
        dataset: &DatasetSnapshot,
        cancel: &CancellationToken,
    ) -> Result<TrainingOutcome, RetrainError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut run = TrainingRun::start(run_id, pipeline.label, OffsetDateTime::now_utc());
        info!(run_id = %run.run_id, num_samples = dataset.num_samples, "training started");

        let output = self
            .trainer
            .fit_and_evaluate(dataset, pipeline, cancel)
            .await
            .inspect_err(|e| warn!(run_id = %run.run_id, error = %e, "training failed"))?;
        output.validate()?;

        run.classification_report = output.classification_report;
        run.confusion_matrix = output.confusion_matrix;
        run.challenger_macro_f1 = output.challenger_macro_f1;

        let evaluation = self
            .evaluator
            .decide(
                pipeline.label,
                run.challenger_macro_f1,
                pipeline.serving_endpoint.as_deref(),
                &output.held_out_texts,
                &output.held_out_labels,
            )
            .await;
        run.decide(evaluation.champion_macro_f1.unwrap_or(0.0), evaluation.decision)?;

        if !run.is_accepted() {
            info!(run_id = %run.run_id, "challenger rejected; champion kept");
            return Ok(TrainingOutcome {
                run,
                evaluation,
                deployed: None,
            });
        }

        let version = self.deployer.deploy(&run, pipeline, &output.artifact).await?;
        info!(run_id = %run.run_id, version_tag = %version.version_tag, "challenger deployed");
        Ok(TrainingOutcome {
            run,
            evaluation,
            deployed: Some(version),
        })
    }
}
