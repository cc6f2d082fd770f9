mod config;
mod schedule;
mod wiring;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use retro_api::{HttpApi, OrchestratorApiAdapter};
use retro_core::{
    DatasetPoller, Evaluation, MetricsHandle, OrchestratorConfig, noop_metrics,
};
use retro_model::{Label, ModelVersion, TrainingRun};
use retro_observe::{LoggerConfig, init_logger};
use retro_prometheus::PrometheusMetrics;

use config::AgentConfig;

/// Exit status for invalid configuration or startup failures.
const EXIT_CONFIG: u8 = 1;
/// Exit status when the run failed per `EXIT_POLICY`, or a retrain failed.
const EXIT_FAILED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "retro-agentd", version, about = "Retraining control loop for grievance classifiers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute one orchestration run and exit per EXIT_POLICY.
    Run,
    /// Run on a schedule and expose the control API.
    Serve,
    /// Train, gate and deploy a challenger for one label on the current dataset.
    Retrain {
        /// Label to retrain (`department` or `urgency`).
        #[arg(long, value_parser = parse_label)]
        label: Label,
    },
}

fn parse_label(raw: &str) -> Result<Label, String> {
    raw.parse().map_err(|e: retro_model::ModelError| e.to_string())
}

/// Outcome of a retrain printed on stdout.
#[derive(Serialize)]
struct RetrainReport<'a> {
    run: &'a TrainingRun,
    evaluation: &'a Evaluation,
    deployed: Option<&'a ModelVersion>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let logger = match LoggerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("invalid logger configuration: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if let Err(e) = init_logger(&logger) {
        eprintln!("failed to initialize logger: {e}");
        return ExitCode::from(EXIT_CONFIG);
    }

    let (cfg, agent) = match load_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    info!(
        dry_run = cfg.dry_run,
        exit_policy = %cfg.exit_policy,
        labels = cfg.pipelines.len(),
        "configuration loaded"
    );

    let res = match cli.command {
        Command::Run => run(cfg).await,
        Command::Serve => serve(cfg, agent).await,
        Command::Retrain { label } => retrain(cfg, agent, label).await,
    };
    match res {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "startup failed");
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

fn load_config() -> anyhow::Result<(OrchestratorConfig, AgentConfig)> {
    let cfg = OrchestratorConfig::from_env()?;
    let agent = AgentConfig::from_env()?;
    Ok((cfg, agent))
}

async fn run(cfg: OrchestratorConfig) -> anyhow::Result<ExitCode> {
    let policy = cfg.exit_policy;
    let trigger = wiring::job_trigger(&cfg)?;
    let orchestrator = wiring::orchestrator(cfg, trigger, noop_metrics())?
        .with_cancellation(shutdown_token());

    let summary = orchestrator.run_once().await?;
    let code = summary.exit_code(policy);
    if code != 0 {
        warn!(failed = ?summary.failed_labels(), policy = %policy, "run failed per exit policy");
    }
    Ok(ExitCode::from(code))
}

async fn serve(cfg: OrchestratorConfig, agent: AgentConfig) -> anyhow::Result<ExitCode> {
    let metrics = PrometheusMetrics::new().context("register metrics")?;
    let handle: MetricsHandle = Arc::new(metrics.clone());
    let trigger = wiring::job_trigger(&cfg)?;

    let shutdown = shutdown_token();
    let orchestrator = Arc::new(
        wiring::orchestrator(cfg, Arc::clone(&trigger), handle)?
            .with_cancellation(shutdown.child_token()),
    );

    let sup = schedule::start_supervisor().await;
    sup.submit(schedule::scheduled_run(
        Arc::clone(&orchestrator),
        agent.schedule_interval,
    ))
    .await
    .map_err(|e| anyhow::anyhow!("submit scheduled run: {e}"))?;
    info!(interval = ?agent.schedule_interval, "scheduled runs submitted");

    let adapter = OrchestratorApiAdapter::new(orchestrator, trigger).with_metrics(metrics);
    let router = HttpApi::new(Arc::new(adapter)).router();
    let listener = tokio::net::TcpListener::bind(agent.api_listen)
        .await
        .with_context(|| format!("bind {}", agent.api_listen))?;
    info!(addr = %agent.api_listen, "control api listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("control api")?;
    info!("shut down");
    Ok(ExitCode::SUCCESS)
}

async fn retrain(cfg: OrchestratorConfig, agent: AgentConfig, label: Label) -> anyhow::Result<ExitCode> {
    let pipeline = cfg
        .pipeline(label)
        .cloned()
        .with_context(|| format!("label {label} is not configured"))?;
    let trigger = wiring::job_trigger(&cfg)?;
    let coordinator = wiring::coordinator(&cfg, &agent, trigger, noop_metrics()).await?;
    let poller = DatasetPoller::new(wiring::metadata_source(&cfg)?, cfg.fetch_retry);

    let dataset = match poller.current_version(&pipeline).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(%label, error = %e, "could not read the current dataset");
            return Ok(ExitCode::from(EXIT_FAILED));
        }
    };

    let cancel = shutdown_token();
    match coordinator.run(&pipeline, &dataset, &cancel).await {
        Ok(outcome) => {
            let report = RetrainReport {
                run: &outcome.run,
                evaluation: &outcome.evaluation,
                deployed: outcome.deployed.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(%label, error = %e, "retrain failed");
            Ok(ExitCode::from(EXIT_FAILED))
        }
    }
}

/// Token cancelled on Ctrl-C.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            trigger.cancel();
        }
    });
    token
}
