use std::{fmt, path::PathBuf};

use tracing::trace;

use crate::ExecError;

/// Configuration for trainer stderr logging.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    /// Max line length before truncation.
    pub max_line_length: usize,
    /// Log stderr at WARN level (false = DEBUG).
    pub stderr_warn: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
            stderr_warn: false,
        }
    }
}

/// Training command and its static launch settings.
#[derive(Debug, Clone)]
pub struct TrainCommand {
    /// Program to execute (e.g. `"python"`).
    pub(crate) program: String,
    /// Arguments passed to the program.
    pub(crate) args: Vec<String>,
    /// Extra environment entries; the per-run variables override them.
    pub(crate) env: Vec<(String, String)>,
    /// Working directory; inherits the parent one if `None`.
    pub(crate) cwd: Option<PathBuf>,
    pub(crate) log: LogConfig,
}

impl TrainCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
            cwd: None,
            log: LogConfig::default(),
        }
    }

    /// Split a whitespace separated command line (`"python -m train"`).
    pub fn parse(line: &str) -> Result<Self, ExecError> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ExecError::InvalidConfig("train command is empty".into()))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Validate the command before spawning.
    ///
    /// Rules:
    /// - `program` is not empty or whitespace-only.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.program.trim().is_empty() {
            return Err(ExecError::InvalidConfig("train command is empty".into()));
        }
        Ok(())
    }

    /// Emit a trace-level log with the essential configuration fields.
    pub fn trace_state(&self, label: &str) {
        trace!(
            label,
            program = %self.program,
            args = ?self.args,
            cwd = ?self.cwd,
            env_len = self.env.len(),
            "train command resolved"
        );
    }
}

impl fmt::Display for TrainCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrainCommand(program='{}', args={}, env={}, cwd={:?})",
            self.program,
            self.args.len(),
            self.env.len(),
            self.cwd,
        )
    }
}
