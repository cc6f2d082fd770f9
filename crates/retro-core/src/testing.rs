//! Scripted collaborators shared by the unit tests of this crate.
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use retro_model::{DatasetSnapshot, ExitPolicy, JobHandle, Label, LabelPipeline, RetryPolicy};

use crate::{
    config::{Credential, EvaluatorConfig, OrchestratorConfig},
    error::{CountError, FetchError, JobError},
    evaluate::ChampionClient,
    monitor::MisclassificationSource,
    poller::MetadataSource,
    trigger::JobTrigger,
};

pub fn pipeline(label: Label, threshold: u64) -> LabelPipeline {
    LabelPipeline::new(
        label,
        threshold,
        "org/prepare-dataset",
        format!("org/retrain-{label}"),
        format!("http://hub/{label}/metadata.json"),
    )
}

/// Configuration with a 60 s poll interval and a 300 s poll timeout.
pub fn config(pipelines: Vec<LabelPipeline>) -> OrchestratorConfig {
    OrchestratorConfig {
        database_url: Credential::new("postgres://test"),
        hub_token: Some(Credential::new("token")),
        hub_endpoint: "http://hub".into(),
        pipelines,
        poll_interval: Duration::from_secs(60),
        poll_timeout: Duration::from_secs(300),
        fetch_retry: RetryPolicy::default(),
        fetch_timeout: Duration::from_secs(10),
        evaluator: EvaluatorConfig::default(),
        exit_policy: ExitPolicy::BestEffort,
        dry_run: false,
    }
}

/// Counts per label; missing labels count zero.
pub struct FixedCounts(pub HashMap<Label, Result<u64, String>>);

#[async_trait]
impl MisclassificationSource for FixedCounts {
    async fn misclassified_count(&self, label: Label) -> Result<u64, CountError> {
        match self.0.get(&label) {
            Some(Ok(n)) => Ok(*n),
            Some(Err(reason)) => Err(CountError::Query {
                label,
                reason: reason.clone(),
            }),
            None => Ok(0),
        }
    }
}

/// Metadata responses scripted per label; the last response repeats forever.
#[derive(Default)]
pub struct ScriptedMetadata {
    script: Mutex<HashMap<Label, VecDeque<Result<DatasetSnapshot, FetchError>>>>,
    calls: AtomicUsize,
}

impl ScriptedMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, label: Label, response: Result<DatasetSnapshot, FetchError>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .entry(label)
            .or_default()
            .push_back(response);
        self
    }

    pub fn ok(&self, label: Label, tag: &str, n: u64) -> &Self {
        self.push(label, Ok(DatasetSnapshot::new(tag, n)))
    }

    pub fn fail(&self, label: Label) -> &Self {
        self.push(label, Err(FetchError::Status { status: 503 }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for ScriptedMetadata {
    async fn fetch(&self, pipeline: &LabelPipeline) -> Result<DatasetSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let queue = script.entry(pipeline.label).or_default();
        match queue.len() {
            0 => Err(FetchError::Transport("no scripted response".into())),
            1 => queue[0].clone(),
            _ => queue.pop_front().unwrap(),
        }
    }
}

/// Trigger that records calls and fails for selected job refs.
#[derive(Default)]
pub struct RecordingTrigger {
    pub calls: Mutex<Vec<(String, String)>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingTrigger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(job_refs: &[&str]) -> Arc<Self> {
        let t = Self::default();
        *t.failing.lock().unwrap() = job_refs.iter().map(|s| s.to_string()).collect();
        Arc::new(t)
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobTrigger for RecordingTrigger {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn trigger(&self, job_ref: &str, label: &str) -> Result<JobHandle, JobError> {
        self.calls
            .lock()
            .unwrap()
            .push((job_ref.to_string(), label.to_string()));
        if self.failing.lock().unwrap().iter().any(|j| j == job_ref) {
            return Err(JobError::Status {
                job_ref: job_ref.to_string(),
                status: 500,
            });
        }
        Ok(JobHandle::requested(job_ref))
    }
}

/// Champion answering from a fixed list, one entry per input text.
pub struct ScriptedChampion {
    pub answers: Vec<Result<String, FetchError>>,
    pub batches: Mutex<Vec<usize>>,
}

impl ScriptedChampion {
    pub fn new(answers: Vec<Result<String, FetchError>>) -> Self {
        Self {
            answers,
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Champion whose every call fails.
    pub fn down() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl ChampionClient for ScriptedChampion {
    async fn batch_predict(&self, _endpoint: &str, texts: &[String]) -> Vec<Result<String, FetchError>> {
        self.batches.lock().unwrap().push(texts.len());
        (0..texts.len())
            .map(|i| {
                self.answers
                    .get(i)
                    .cloned()
                    .unwrap_or(Err(FetchError::Status { status: 502 }))
            })
            .collect()
    }
}
