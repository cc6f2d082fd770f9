use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use retro_model::{JobHandle, Label, RunSummary};

use crate::{error::ApiError, handler::ApiHandler};

/// HTTP control API builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build the router.
    ///
    /// Routes:
    /// - POST /api/v1/runs - start a run (202, or 409 while one is running)
    /// - GET /api/v1/runs/latest - last run summary (404 before the first run)
    /// - POST /api/v1/jobs/dataset - trigger dataset preparation
    /// - POST /api/v1/jobs/{label}/retrain - trigger one label's retrain job
    /// - GET /metrics - Prometheus text format
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/v1/runs", post(start_run::<H>))
            .route("/api/v1/runs/latest", get(latest_run::<H>))
            .route("/api/v1/jobs/dataset", post(trigger_dataset::<H>))
            .route("/api/v1/jobs/{label}/retrain", post(trigger_retrain::<H>))
            .route("/metrics", get(metrics::<H>))
            .with_state(self.handler)
    }
}

#[derive(Debug, Serialize)]
struct RunAccepted {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct JobTriggered {
    job: JobHandle,
}

/// POST /api/v1/runs
async fn start_run<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    handler.start_run().await?;
    Ok((StatusCode::ACCEPTED, Json(RunAccepted { status: "started" })))
}

/// GET /api/v1/runs/latest
async fn latest_run<H>(State(handler): State<Arc<H>>) -> Result<Json<RunSummary>, ApiError>
where
    H: ApiHandler,
{
    handler
        .latest_run()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no run has finished yet".into()))
}

/// POST /api/v1/jobs/dataset
async fn trigger_dataset<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let job = handler.trigger_dataset().await?;
    Ok((StatusCode::ACCEPTED, Json(JobTriggered { job })))
}

/// POST /api/v1/jobs/{label}/retrain
async fn trigger_retrain<H>(
    State(handler): State<Arc<H>>,
    Path(label): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let label: Label = label.parse()?;
    let job = handler.trigger_retrain(label).await?;
    Ok((StatusCode::ACCEPTED, Json(JobTriggered { job })))
}

/// GET /metrics
async fn metrics<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let exposition = handler.metrics().await?;
    Ok((
        [(header::CONTENT_TYPE, exposition.content_type)],
        exposition.body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use time::OffsetDateTime;
    use tower::ServiceExt;

    use crate::handler::MetricsExposition;

    #[derive(Default)]
    struct FakeHandler {
        running: Mutex<bool>,
        last: Option<RunSummary>,
    }

    #[async_trait]
    impl ApiHandler for FakeHandler {
        async fn start_run(&self) -> Result<(), ApiError> {
            let mut running = self.running.lock().unwrap();
            if *running {
                return Err(retro_core::RunError::AlreadyRunning.into());
            }
            *running = true;
            Ok(())
        }

        async fn latest_run(&self) -> Result<Option<RunSummary>, ApiError> {
            Ok(self.last.clone())
        }

        async fn trigger_dataset(&self) -> Result<JobHandle, ApiError> {
            Ok(JobHandle::dry_run("org/prepare-dataset"))
        }

        async fn trigger_retrain(&self, label: Label) -> Result<JobHandle, ApiError> {
            Ok(JobHandle::requested(format!("org/retrain-{label}")))
        }

        async fn metrics(&self) -> Result<MetricsExposition, ApiError> {
            Ok(MetricsExposition {
                body: b"retro_runs_started_total 3\n".to_vec(),
                content_type: "text/plain; version=0.0.4".into(),
            })
        }
    }

    fn router(handler: FakeHandler) -> Router {
        HttpApi::new(Arc::new(handler)).router()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn second_run_request_conflicts() {
        let app = router(FakeHandler::default());

        let first = app.clone().oneshot(post("/api/v1/runs")).await.unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app.oneshot(post("/api/v1/runs")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(json(second).await["error"], "conflict");
    }

    #[tokio::test]
    async fn latest_run_is_404_until_a_run_finished() {
        let resp = router(FakeHandler::default())
            .oneshot(get("/api/v1/runs/latest"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let handler = FakeHandler {
            last: Some(RunSummary::new("run-1", OffsetDateTime::UNIX_EPOCH)),
            ..Default::default()
        };
        let resp = router(handler)
            .oneshot(get("/api/v1/runs/latest"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["runId"], "run-1");
    }

    #[tokio::test]
    async fn retrain_route_parses_the_label() {
        let app = router(FakeHandler::default());

        let ok = app
            .clone()
            .oneshot(post("/api/v1/jobs/Urgency/retrain"))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::ACCEPTED);
        assert_eq!(json(ok).await["job"]["jobRef"], "org/retrain-urgency");

        let bad = app
            .oneshot(post("/api/v1/jobs/priority/retrain"))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dataset_route_returns_the_job() {
        let resp = router(FakeHandler::default())
            .oneshot(post("/api/v1/jobs/dataset"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body = json(resp).await;
        assert_eq!(body["job"]["dryRun"], true);
        assert_eq!(body["job"]["lastStatus"], "dry_run");
    }

    #[tokio::test]
    async fn metrics_route_sets_content_type() {
        let resp = router(FakeHandler::default())
            .oneshot(get("/metrics"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"retro_runs_started_total"));
    }
}
