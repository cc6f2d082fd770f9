use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info, instrument};

use retro_core::{Credential, JobError, JobTrigger};
use retro_model::JobHandle;

use crate::{ExecError, http::client::build_client};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Restarts hub spaces: `POST {endpoint}/api/spaces/{job_ref}/restart`.
pub struct HubJobTrigger {
    client: reqwest::Client,
    endpoint: String,
    token: Credential,
}

impl HubJobTrigger {
    pub fn new(endpoint: impl Into<String>, token: Credential) -> Result<Self, ExecError> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn restart_url(&self, job_ref: &str) -> String {
        format!("{}/api/spaces/{}/restart", self.endpoint, job_ref.trim_matches('/'))
    }
}

#[async_trait]
impl JobTrigger for HubJobTrigger {
    fn name(&self) -> &'static str {
        "hub"
    }

    #[instrument(level = "debug", skip(self), fields(trigger = "hub"))]
    async fn trigger(&self, job_ref: &str, label: &str) -> Result<JobHandle, JobError> {
        let url = self.restart_url(job_ref);
        debug!(%url, "requesting job restart");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| JobError::Transport {
                job_ref: job_ref.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        match status {
            s if s.is_success() => {
                info!(job_ref, label, "job restart requested");
                Ok(JobHandle::requested(job_ref))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(JobError::Unauthorized {
                job_ref: job_ref.to_string(),
                status: status.as_u16(),
            }),
            StatusCode::NOT_FOUND => Err(JobError::NotFound {
                job_ref: job_ref.to_string(),
            }),
            _ => Err(JobError::Status {
                job_ref: job_ref.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}
