use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use retro_core::{Credential, FetchError, MetadataSource};
use retro_model::{DatasetSnapshot, LabelPipeline};

use crate::{
    ExecError,
    http::client::{build_client, fetch_error},
};

/// Reads dataset snapshot metadata with `GET {metadata_url}`.
pub struct HttpMetadataSource {
    client: reqwest::Client,
    token: Option<Credential>,
    timeout: Duration,
}

impl HttpMetadataSource {
    pub fn new(token: Option<Credential>, timeout: Duration) -> Result<Self, ExecError> {
        Ok(Self {
            client: build_client(timeout)?,
            token,
            timeout,
        })
    }
}

#[async_trait]
impl MetadataSource for HttpMetadataSource {
    async fn fetch(&self, pipeline: &LabelPipeline) -> Result<DatasetSnapshot, FetchError> {
        let mut req = self.client.get(&pipeline.metadata_url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token.expose());
        }
        let resp = req.send().await.map_err(|e| fetch_error(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| fetch_error(e, self.timeout))?;
        let snapshot: DatasetSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
        trace!(
            label = %pipeline.label,
            version_tag = %snapshot.version_tag,
            num_samples = snapshot.num_samples,
            "metadata fetched"
        );
        Ok(snapshot)
    }
}
