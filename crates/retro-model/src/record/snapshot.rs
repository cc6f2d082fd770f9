use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::VersionTag;

/// Published dataset metadata, as returned by the metadata endpoint.
///
/// Snapshots are immutable once published; the control loop only observes them.
/// Missing fields decode to empty values so that a partially written metadata document is treated as "not yet ready" instead of an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// Version tag assigned by the dataset preparation job.
    #[serde(default)]
    pub version_tag: VersionTag,
    /// Number of samples in the snapshot.
    #[serde(default)]
    pub num_samples: u64,
    /// Publication time, when provided by the registry.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

impl DatasetSnapshot {
    /// Create a snapshot without a publication time.
    pub fn new(version_tag: impl Into<VersionTag>, num_samples: u64) -> Self {
        Self {
            version_tag: version_tag.into(),
            num_samples,
            created_at: None,
        }
    }

    /// Returns `true` if this snapshot is large enough and differs from `last_version`.
    ///
    /// The version check rejects a snapshot that already satisfied the size bound before the current run started.
    pub fn satisfies(&self, min_len: u64, last_version: Option<&str>) -> bool {
        self.num_samples >= min_len && last_version != Some(self.version_tag.as_str())
    }
}
