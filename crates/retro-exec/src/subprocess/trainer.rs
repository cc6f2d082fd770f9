use std::process::Stdio;

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader},
    process::Command,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use retro_core::{TrainError, Trainer, TrainerOutput};
use retro_model::{DatasetSnapshot, LabelPipeline};

use crate::{ExecError, subprocess::config::TrainCommand};

/// Runs the training command as a child process.
///
/// Environment of the child: `LABEL`, `DATASET_VERSION`, `DATASET_NUM_SAMPLES`, `DATASET_METADATA_URL`.
/// Stdout must contain the JSON output, either as the whole stream or as its last non-empty line.
pub struct SubprocessTrainer {
    cmd: TrainCommand,
}

impl SubprocessTrainer {
    pub fn new(cmd: TrainCommand) -> Result<Self, ExecError> {
        cmd.validate()?;
        Ok(Self { cmd })
    }

    fn command(&self, dataset: &DatasetSnapshot, pipeline: &LabelPipeline) -> Command {
        let mut cmd = Command::new(&self.cmd.program);
        cmd.args(&self.cmd.args);
        if let Some(cwd) = &self.cmd.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.cmd.env {
            cmd.env(k, v);
        }
        cmd.env("LABEL", pipeline.label.as_str())
            .env("DATASET_VERSION", &dataset.version_tag)
            .env("DATASET_NUM_SAMPLES", dataset.num_samples.to_string())
            .env("DATASET_METADATA_URL", &pipeline.metadata_url);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

/// Decode the trainer output from the whole stdout or from its last non-empty line.
fn parse_output(stdout: &[u8]) -> Result<TrainerOutput, TrainError> {
    if let Ok(out) = serde_json::from_slice::<TrainerOutput>(stdout) {
        return Ok(out);
    }
    let text = String::from_utf8_lossy(stdout);
    let last = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| TrainError::Output("trainer printed nothing on stdout".into()))?;
    serde_json::from_str(last).map_err(|e| TrainError::Output(e.to_string()))
}

/// Forward stderr lines to the log, truncated to `max_len`.
async fn forward_stderr<R>(stream: R, label: String, max_len: usize, warn_level: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(mut line)) = lines.next_line().await {
        if line.len() > max_len {
            let mut cut = max_len;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line.truncate(cut);
        }
        if warn_level {
            warn!(%label, "trainer: {line}");
        } else {
            debug!(%label, "trainer: {line}");
        }
    }
}

#[async_trait]
impl Trainer for SubprocessTrainer {
    fn name(&self) -> &'static str {
        "subprocess"
    }

    async fn fit_and_evaluate(
        &self,
        dataset: &DatasetSnapshot,
        pipeline: &LabelPipeline,
        cancel: &CancellationToken,
    ) -> Result<TrainerOutput, TrainError> {
        let label = pipeline.label.as_str();
        self.cmd.trace_state(label);

        let mut child = self
            .command(dataset, pipeline)
            .spawn()
            .map_err(|e| TrainError::Spawn(format!("{}: {e}", self.cmd.program)))?;

        let stderr = child.stderr.take().map(|s| {
            tokio::spawn(forward_stderr(
                s,
                label.to_string(),
                self.cmd.log.max_line_length,
                self.cmd.log.stderr_warn,
            ))
        });
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| TrainError::Spawn("stdout not captured".into()))?;
        let reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        });

        let status = tokio::select! {
            res = child.wait() => res.map_err(|e| TrainError::Spawn(format!("wait failed: {e}")))?,
            _ = cancel.cancelled() => {
                debug!(label, "cancellation requested; killing trainer");
                if let Err(e) = child.kill().await {
                    debug!(label, "failed to kill trainer: {e}");
                }
                reader.abort();
                return Err(TrainError::Canceled);
            }
        };

        let stdout = reader
            .await
            .map_err(|e| TrainError::Output(format!("stdout reader failed: {e}")))?
            .map_err(|e| TrainError::Output(format!("read stdout: {e}")))?;
        if let Some(h) = stderr {
            let _ = h.await;
        }

        if !status.success() {
            return Err(TrainError::Exit(match status.code() {
                Some(code) => format!("non-zero code {code}"),
                None => "termination by signal".into(),
            }));
        }
        debug!(label, bytes = stdout.len(), "trainer exited successfully");
        parse_output(&stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use retro_model::Label;
    use std::time::Duration;

    fn pipeline() -> LabelPipeline {
        LabelPipeline::new(Label::Urgency, 10, "org/prep", "org/retrain", "http://hub/meta.json")
    }

    fn sh(script: &str) -> SubprocessTrainer {
        SubprocessTrainer::new(TrainCommand::new("sh", vec!["-c".into(), script.into()])).unwrap()
    }

    const OUTPUT: &str = r#"{"challenger_macro_f1":0.8,"artifact":"/tmp/model","held_out_texts":["a"],"held_out_labels":[1]}"#;

    #[tokio::test]
    async fn reads_json_after_log_lines_and_exports_dataset_env() {
        let script = format!(
            "echo \"training $LABEL on $DATASET_VERSION ($DATASET_NUM_SAMPLES)\"; echo progress >&2; echo '{OUTPUT}'"
        );
        let out = sh(&script)
            .fit_and_evaluate(&DatasetSnapshot::new("v2", 2000), &pipeline(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.challenger_macro_f1, 0.8);
        assert_eq!(out.held_out_labels, vec![1]);
    }

    #[tokio::test]
    async fn dataset_coordinates_reach_the_child() {
        let script = r#"printf '{"challenger_macro_f1":0.5,"artifact":"%s-%s-%s"}' "$LABEL" "$DATASET_VERSION" "$DATASET_NUM_SAMPLES""#;
        let out = sh(script)
            .fit_and_evaluate(&DatasetSnapshot::new("v9", 42), &pipeline(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.artifact, "urgency-v9-42");
    }

    #[tokio::test]
    async fn non_zero_exit_fails() {
        let err = sh("echo boom >&2; exit 3")
            .fit_and_evaluate(&DatasetSnapshot::new("v2", 1), &pipeline(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TrainError::Exit(ref m) if m.contains('3')));
    }

    #[tokio::test]
    async fn garbage_stdout_is_an_output_error() {
        let err = sh("echo not-json")
            .fit_and_evaluate(&DatasetSnapshot::new("v2", 1), &pipeline(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TrainError::Output(_)));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let err = sh("sleep 30")
            .fit_and_evaluate(&DatasetSnapshot::new("v2", 1), &pipeline(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TrainError::Canceled));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let trainer =
            SubprocessTrainer::new(TrainCommand::new("/nonexistent/trainer", vec![])).unwrap();
        let err = trainer
            .fit_and_evaluate(&DatasetSnapshot::new("v2", 1), &pipeline(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TrainError::Spawn(_)));
    }
}
