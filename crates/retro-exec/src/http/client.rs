use std::time::Duration;

use retro_core::FetchError;

use crate::ExecError;

/// Build a client whose every request is bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ExecError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("retro/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ExecError::Client(e.to_string()))
}

/// Map a transport-level reqwest error to a fetch error.
pub(crate) fn fetch_error(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else if e.is_decode() {
        FetchError::Decode(e.to_string())
    } else if let Some(status) = e.status() {
        FetchError::Status {
            status: status.as_u16(),
        }
    } else {
        FetchError::Transport(e.to_string())
    }
}
