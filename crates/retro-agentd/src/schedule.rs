//! Periodic orchestration runs under the taskvisor supervisor.
use std::{sync::Arc, time::Duration};

use taskvisor::{
    BackoffPolicy, ControllerAdmission, ControllerConfig, ControllerSpec, JitterPolicy,
    Config as SupervisorConfig, RestartPolicy, Subscribe, Supervisor, TaskError, TaskFn, TaskRef, TaskSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use retro_core::{Orchestrator, RunError};
use retro_model::ExitPolicy;
use retro_observe::EventLogger;

pub const SCHEDULED_RUN_TASK: &str = "retro-scheduled-run";

/// First retry delay after a failed (timed out) scheduled run.
const RETRY_FIRST: Duration = Duration::from_secs(60);

/// Slack on top of the poll timeout before a scheduled run is abandoned.
const RUN_TIMEOUT_SLACK: Duration = Duration::from_secs(600);

/// Budget of one scheduled run.
fn run_timeout(poll_timeout: Duration) -> Duration {
    poll_timeout.saturating_add(RUN_TIMEOUT_SLACK)
}

/// Build the supervisor with the event logger and start its loop in the background.
pub async fn start_supervisor() -> Arc<Supervisor> {
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(EventLogger)];
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .with_controller(ControllerConfig::default())
        .build();

    let runner = Arc::clone(&sup);
    tokio::spawn(async move {
        if let Err(e) = runner.run(Vec::new()).await {
            error!(error = %e, "supervisor run loop exited with error");
        }
    });
    sup.wait_ready().await;
    info!("supervisor is ready to accept tasks");
    sup
}

/// Controller spec of the periodic run: start now, then every `interval` after a finished run.
///
/// A run still in progress (e.g. started over the api) makes the tick a no-op.
pub fn scheduled_run(orchestrator: Arc<Orchestrator>, interval: Duration) -> ControllerSpec {
    let timeout = run_timeout(orchestrator.config().poll_timeout);
    let policy = orchestrator.config().exit_policy;

    let task: TaskRef = TaskFn::arc(SCHEDULED_RUN_TASK, move |ctx: CancellationToken| {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            tokio::select! {
                res = orchestrator.run_once() => {
                    report(res, policy);
                    Ok(())
                }
                _ = ctx.cancelled() => Err(TaskError::Canceled),
            }
        }
    });

    let backoff = BackoffPolicy {
        success_delay: Some(interval),
        first: RETRY_FIRST,
        max: interval.max(RETRY_FIRST),
        jitter: JitterPolicy::None,
        factor: 2.0,
    };
    ControllerSpec {
        admission: ControllerAdmission::DropIfRunning,
        task_spec: TaskSpec::new(task, RestartPolicy::Always, backoff, Some(timeout)),
    }
}

fn report(res: Result<retro_model::RunSummary, RunError>, policy: ExitPolicy) {
    match res {
        Ok(summary) if summary.is_success(policy) => {
            info!(run_id = %summary.run_id, "scheduled run completed")
        }
        Ok(summary) => error!(
            run_id = %summary.run_id,
            failed = ?summary.failed_labels(),
            policy = %policy,
            "scheduled run failed per exit policy"
        ),
        Err(RunError::AlreadyRunning) => {
            info!("scheduled run skipped; a run is already in progress")
        }
    }
}
