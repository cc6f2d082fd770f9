use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use retro_core::{ChampionClient, FetchError, retry};
use retro_model::RetryPolicy;

use crate::{
    ExecError,
    http::client::{build_client, fetch_error},
};

/// Fan-out settings of the champion client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChampionClientConfig {
    /// Maximal number of in-flight predictions.
    pub concurrency: usize,
    /// Retry policy of a single prediction.
    pub retry: RetryPolicy,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl Default for ChampionClientConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            retry: RetryPolicy::fixed(2, Duration::from_millis(500)),
            timeout: Duration::from_secs(8),
        }
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    label: Option<Value>,
}

/// Queries `POST {endpoint}/predict` once per text with bounded concurrency.
pub struct HttpChampionClient {
    client: reqwest::Client,
    cfg: ChampionClientConfig,
}

impl HttpChampionClient {
    pub fn new(cfg: ChampionClientConfig) -> Result<Self, ExecError> {
        if cfg.concurrency == 0 {
            return Err(ExecError::InvalidConfig(
                "champion concurrency must be greater than zero".into(),
            ));
        }
        Ok(Self {
            client: build_client(cfg.timeout)?,
            cfg,
        })
    }

    async fn predict(&self, url: &str, text: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .post(url)
            .json(&PredictRequest { text })
            .send()
            .await
            .map_err(|e| fetch_error(e, self.cfg.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let body: PredictResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        match body.label {
            Some(Value::String(label)) => Ok(label),
            Some(Value::Number(id)) => Ok(id.to_string()),
            other => Err(FetchError::Decode(format!("unexpected label: {other:?}"))),
        }
    }
}

#[async_trait]
impl ChampionClient for HttpChampionClient {
    async fn batch_predict(
        &self,
        endpoint: &str,
        texts: &[String],
    ) -> Vec<Result<String, FetchError>> {
        let url = format!("{}/predict", endpoint.trim_end_matches('/'));
        debug!(%url, batch = texts.len(), concurrency = self.cfg.concurrency, "querying champion");

        let url = url.as_str();
        let calls: Vec<_> = texts
            .iter()
            .map(|text| async move {
                retry(&self.cfg.retry, "champion-predict", |_| self.predict(url, text)).await
            })
            .collect();
        stream::iter(calls)
            .buffered(self.cfg.concurrency)
            .collect()
            .await
    }
}
