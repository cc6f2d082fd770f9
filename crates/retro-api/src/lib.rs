//! Control API of the retraining loop.
//!
//! [`HttpApi`] mounts the routes over any [`ApiHandler`]; [`OrchestratorApiAdapter`] is the implementation backed by a live [`retro_core::Orchestrator`].
mod adapter;
mod error;
mod handler;
mod http;

pub use adapter::OrchestratorApiAdapter;
pub use error::ApiError;
pub use handler::{ApiHandler, MetricsExposition};
pub use http::HttpApi;
