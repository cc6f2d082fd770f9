//! Construction of the production backends from configuration.
use std::sync::Arc;

use anyhow::Context;

use retro_core::{
    ChallengerEvaluator, ConfigError, DeploymentController, DryRunTrigger, ManifestRegistry,
    MetricsHandle, Orchestrator, OrchestratorConfig, TrainingCoordinator, TriggerHandle,
};
use retro_exec::{
    http::{ChampionClientConfig, HttpChampionClient, HttpMetadataSource, HubJobTrigger},
    postgres::PgMisclassificationSource,
    subprocess::{SubprocessTrainer, TrainCommand},
};

use crate::config::AgentConfig;

/// Hub trigger, or a recording trigger in dry-run mode.
pub fn job_trigger(cfg: &OrchestratorConfig) -> anyhow::Result<TriggerHandle> {
    if cfg.dry_run {
        return Ok(Arc::new(DryRunTrigger::new()));
    }
    let token = cfg
        .hub_token
        .clone()
        .ok_or(ConfigError::Missing("HF_TOKEN"))?;
    let trigger = HubJobTrigger::new(&cfg.hub_endpoint, token).context("build hub job trigger")?;
    Ok(Arc::new(trigger))
}

pub fn metadata_source(cfg: &OrchestratorConfig) -> anyhow::Result<Arc<HttpMetadataSource>> {
    let source = HttpMetadataSource::new(cfg.hub_token.clone(), cfg.fetch_timeout)
        .context("build metadata client")?;
    Ok(Arc::new(source))
}

pub fn orchestrator(
    cfg: OrchestratorConfig,
    trigger: TriggerHandle,
    metrics: MetricsHandle,
) -> anyhow::Result<Orchestrator> {
    let counts = PgMisclassificationSource::connect_lazy(&cfg.database_url)
        .context("configure misclassification store")?;
    let metadata = metadata_source(&cfg)?;
    Ok(Orchestrator::new(cfg, Arc::new(counts), metadata, trigger).with_metrics(metrics))
}

/// Trainer, evaluator and registry for the `retrain` command.
pub async fn coordinator(
    cfg: &OrchestratorConfig,
    agent: &AgentConfig,
    trigger: TriggerHandle,
    metrics: MetricsHandle,
) -> anyhow::Result<TrainingCoordinator> {
    let command = agent
        .train_command
        .as_deref()
        .ok_or(ConfigError::Missing("TRAIN_COMMAND"))?;
    let trainer = SubprocessTrainer::new(TrainCommand::parse(command)?)?;

    let champion = HttpChampionClient::new(ChampionClientConfig::default())
        .context("build champion client")?;
    let evaluator =
        ChallengerEvaluator::new(Arc::new(champion), cfg.evaluator).with_metrics(metrics.clone());

    let registry = ManifestRegistry::open(agent.registry_manifest.clone())
        .await
        .with_context(|| format!("open registry {}", agent.registry_manifest.display()))?;
    let deployer = DeploymentController::new(Arc::new(registry), trigger).with_metrics(metrics);

    Ok(TrainingCoordinator::new(Arc::new(trainer), evaluator, deployer))
}
