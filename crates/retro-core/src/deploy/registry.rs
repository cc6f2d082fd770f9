//! Model registry abstraction and the manifest-backed implementation.
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

use retro_model::{Label, ModelVersion, TrainingRun};

use crate::error::DeployError;

/// Versioned store of published model artifacts.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Publish `artifact` of `run` under `version_tag` (not deployed yet).
    async fn push(
        &self,
        run: &TrainingRun,
        artifact: &str,
        version_tag: &str,
    ) -> Result<ModelVersion, DeployError>;

    /// Attach the version tag to the published commit.
    async fn tag(&self, label: Label, version: &ModelVersion) -> Result<(), DeployError>;

    /// Make `version_tag` the only deployed version of `label`.
    async fn promote(&self, label: Label, version_tag: &str) -> Result<ModelVersion, DeployError>;

    /// Currently deployed version of `label`.
    async fn champion(&self, label: Label) -> Result<Option<ModelVersion>, DeployError>;

    /// All versions of `label`, oldest first.
    async fn versions(&self, label: Label) -> Result<Vec<ModelVersion>, DeployError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    labels: BTreeMap<Label, Vec<ManifestEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    #[serde(flatten)]
    version: ModelVersion,
    artifact: String,
    #[serde(default)]
    tagged: bool,
    #[serde(with = "time::serde::rfc3339")]
    pushed_at: OffsetDateTime,
}

/// In-process registry holding every version of every label under one lock.
///
/// With a manifest path, each change is written to `<path>.tmp` and renamed over the manifest before it becomes visible in memory.
#[derive(Debug)]
pub struct ManifestRegistry {
    path: Option<PathBuf>,
    manifest: Mutex<Manifest>,
}

impl ManifestRegistry {
    /// Registry without persistence.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            manifest: Mutex::new(Manifest::default()),
        }
    }

    /// Registry persisted at `path`; an existing manifest is loaded.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DeployError> {
        let path = path.into();
        let manifest = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                DeployError::Registry(format!("corrupt manifest {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest::default(),
            Err(e) => {
                return Err(DeployError::Registry(format!(
                    "read {}: {e}",
                    path.display()
                )));
            }
        };
        debug!(path = %path.display(), "model manifest loaded");
        Ok(Self {
            path: Some(path),
            manifest: Mutex::new(manifest),
        })
    }

    /// Apply `change` to a copy of the manifest, persist it, then publish it.
    async fn update<T>(
        &self,
        change: impl FnOnce(&mut Manifest) -> Result<T, DeployError>,
    ) -> Result<T, DeployError> {
        let mut guard = self.manifest.lock().await;
        let mut next = guard.clone();
        let out = change(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next).await?;
        }
        *guard = next;
        Ok(out)
    }
}

async fn persist(path: &Path, manifest: &Manifest) -> Result<(), DeployError> {
    let bytes = serde_json::to_vec_pretty(manifest)
        .map_err(|e| DeployError::Registry(format!("encode manifest: {e}")))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| DeployError::Registry(format!("write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| DeployError::Registry(format!("rename {}: {e}", path.display())))
}

fn entry_mut<'a>(
    manifest: &'a mut Manifest,
    label: Label,
    version_tag: &str,
) -> Result<&'a mut ManifestEntry, DeployError> {
    manifest
        .labels
        .get_mut(&label)
        .and_then(|versions| {
            versions
                .iter_mut()
                .find(|e| e.version.version_tag == version_tag)
        })
        .ok_or_else(|| DeployError::Registry(format!("unknown version {label}/{version_tag}")))
}

#[async_trait]
impl ModelRegistry for ManifestRegistry {
    async fn push(
        &self,
        run: &TrainingRun,
        artifact: &str,
        version_tag: &str,
    ) -> Result<ModelVersion, DeployError> {
        let label = run.label;
        let version = ModelVersion {
            version_tag: version_tag.to_string(),
            registry_ref: format!("{label}@{version_tag}"),
            parent_run_id: run.run_id.clone(),
            deployed: false,
        };
        let entry = ManifestEntry {
            version: version.clone(),
            artifact: artifact.to_string(),
            tagged: false,
            pushed_at: OffsetDateTime::now_utc(),
        };
        self.update(move |m| {
            let versions = m.labels.entry(label).or_default();
            if versions.iter().any(|e| e.version.version_tag == entry.version.version_tag) {
                return Err(DeployError::Registry(format!(
                    "version {label}/{} already exists",
                    entry.version.version_tag
                )));
            }
            versions.push(entry);
            Ok(())
        })
        .await?;
        info!(%label, version_tag, artifact, "model version pushed");
        Ok(version)
    }

    async fn tag(&self, label: Label, version: &ModelVersion) -> Result<(), DeployError> {
        let tag = version.version_tag.clone();
        self.update(move |m| {
            entry_mut(m, label, &tag)?.tagged = true;
            Ok(())
        })
        .await
    }

    async fn promote(&self, label: Label, version_tag: &str) -> Result<ModelVersion, DeployError> {
        let promoted = self
            .update(|m| {
                entry_mut(m, label, version_tag)?;
                let versions = m.labels.entry(label).or_default();
                let mut promoted = None;
                for e in versions.iter_mut() {
                    e.version.deployed = e.version.version_tag == version_tag;
                    if e.version.deployed {
                        promoted = Some(e.version.clone());
                    }
                }
                promoted.ok_or_else(|| {
                    DeployError::Registry(format!("unknown version {label}/{version_tag}"))
                })
            })
            .await?;
        info!(%label, version_tag, "model version promoted");
        Ok(promoted)
    }

    async fn champion(&self, label: Label) -> Result<Option<ModelVersion>, DeployError> {
        let m = self.manifest.lock().await;
        Ok(m.labels
            .get(&label)
            .and_then(|v| v.iter().find(|e| e.version.deployed))
            .map(|e| e.version.clone()))
    }

    async fn versions(&self, label: Label) -> Result<Vec<ModelVersion>, DeployError> {
        let m = self.manifest.lock().await;
        Ok(m.labels
            .get(&label)
            .map(|v| v.iter().map(|e| e.version.clone()).collect())
            .unwrap_or_default())
    }
}
