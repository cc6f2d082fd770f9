//! Supervisor event logging.
//!
//! Maps taskvisor events of the scheduled control loop onto tracing records.

use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{debug, error, info, trace, warn};

/// Bounded queue for the subscriber worker; overflow drops events and emits `SubscriberOverflow`.
const QUEUE_CAPACITY: usize = 1024;

/// Logs supervisor events with structured `task`/`attempt` fields.
#[derive(Debug, Default)]
pub struct EventLogger;

#[async_trait]
impl Subscribe for EventLogger {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "event-logger"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

fn log_event(e: &Event) {
    let task = e.task.as_deref().unwrap_or("unknown");
    let reason = e.reason.as_deref().unwrap_or("");
    let attempt = e.attempt.unwrap_or(0);

    match e.kind {
        EventKind::TaskStarting => info!(task, attempt, "scheduled run starting"),
        EventKind::TaskStopped => debug!(task, attempt, "scheduled run finished"),
        EventKind::TaskFailed => error!(task, attempt, reason, "scheduled run failed"),
        EventKind::TimeoutHit => warn!(
            task,
            timeout_ms = e.timeout_ms.unwrap_or(0),
            "scheduled run exceeded its timeout"
        ),
        EventKind::BackoffScheduled if e.reason.is_some() => debug!(
            task,
            attempt,
            delay_ms = e.delay_ms.unwrap_or(0),
            reason,
            "retry scheduled after failure"
        ),
        EventKind::BackoffScheduled => debug!(
            task,
            delay_ms = e.delay_ms.unwrap_or(0),
            "next run scheduled"
        ),
        EventKind::ActorExhausted => warn!(task, reason, "task will not be restarted"),
        EventKind::ActorDead => error!(task, reason, "task terminated permanently"),
        EventKind::ControllerRejected => {
            warn!(task, reason, "run rejected; previous run still in progress")
        }
        EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
            error!(task, reason, "event subscriber failure")
        }
        EventKind::ShutdownRequested => info!("shutdown requested"),
        EventKind::AllStoppedWithinGrace => info!("all tasks stopped within grace period"),
        EventKind::GraceExceeded => warn!("grace exceeded; some tasks did not stop in time"),
        other => trace!(task, "{}", routine_message(other)),
    }
}

fn routine_message(kind: EventKind) -> &'static str {
    match kind {
        EventKind::TaskAddRequested => "task add requested",
        EventKind::TaskAdded => "task added",
        EventKind::TaskRemoveRequested => "task remove requested",
        EventKind::TaskRemoved => "task removed",
        EventKind::ControllerSubmitted => "task submitted by controller",
        EventKind::ControllerSlotTransition => "controller slot transition",
        _ => "supervisor event",
    }
}
