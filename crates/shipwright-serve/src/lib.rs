use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use shipwright_core::{DeployError, ErrorKind, TaskRequest};
use shipwright_deploy::Orchestrator;

// ── Config ──

pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
}

// ── App State ──

struct AppState {
    orchestrator: Arc<Orchestrator>,
}

// ── Error Handling ──

struct AppError(DeployError);

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::RemoteUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let message = if kind == ErrorKind::Validation {
            tracing::info!(error = %self.0, "rejected task request");
            "Invalid task request"
        } else {
            tracing::error!(error = %self.0, kind = kind.as_str(), "deployment failed");
            "Failed to deploy"
        };
        let body = serde_json::json!({
            "message": message,
            "error": self.0.public_message(),
            "kind": kind,
        });
        (status_for(kind), Json(body)).into_response()
    }
}

impl<E: Into<DeployError>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// ── Entrypoint ──

pub async fn serve(orchestrator: Arc<Orchestrator>, config: ServeConfig) -> anyhow::Result<()> {
    let app = router(orchestrator);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("shipwright listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router (for testing without binding to a port).
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = Arc::new(AppState { orchestrator });
    Router::new()
        .route("/", get(root))
        .route("/build-app", post(build_app))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── GET / ──

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "shipwright deployment API running" }))
}

// ── POST /build-app ──

#[derive(Serialize)]
struct BuildResponse {
    message: &'static str,
    round: u32,
    repo_url: String,
    pages_url: String,
}

async fn build_app(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BuildResponse>, AppError> {
    let request = TaskRequest::from_slice(&body)?;
    let round = request.round;

    // Remote calls and evaluator backoff block; keep them off the async workers.
    let orchestrator = state.orchestrator.clone();
    let deployment = tokio::task::spawn_blocking(move || orchestrator.run(&request))
        .await
        .map_err(|e| anyhow::anyhow!("deployment task aborted: {e}"))??;

    Ok(Json(BuildResponse {
        message: "Task accepted",
        round,
        repo_url: deployment.result.repo_url,
        pages_url: deployment.result.pages_url,
    }))
}

// ── Tests ──
