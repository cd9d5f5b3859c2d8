//! REST API Handlers
//!
//! Implements the REST API endpoints for storage pool creation, storage
//! queries and task status.

use crate::controlplane::Provisioner;
use crate::domain::models::AddStorageRequest;
use crate::error::Error;
use crate::metrics::ProvisionMetrics;
use crate::tasks::TaskManager;
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response to an accepted storage creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreatedResponse {
    pub task_id: Uuid,
    pub message: String,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiErrorResponse {
    fn reply(status: StatusCode, error: &str, message: String) -> Response {
        (
            status,
            Json(Self {
                error: error.into(),
                message,
            }),
        )
            .into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        ApiErrorResponse::reply(self.status_code(), self.kind(), self.to_string())
    }
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    provisioner: Arc<Provisioner>,
    tasks: Arc<TaskManager>,
    metrics: Option<Arc<ProvisionMetrics>>,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(provisioner: Arc<Provisioner>, tasks: Arc<TaskManager>) -> Self {
        Self {
            provisioner,
            tasks,
            metrics: None,
        }
    }

    /// Serve `metrics` at `/metrics`
    pub fn with_metrics(mut self, metrics: Arc<ProvisionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            provisioner: self.provisioner,
            tasks: self.tasks,
            metrics: self.metrics,
        };

        Router::new()
            // Storage endpoints
            .route(
                "/v1/clusters/:cluster_id/storages",
                get(list_storage).post(create_storage),
            )
            .route("/v1/storages/:id", get(get_storage))
            // Task endpoints
            .route("/v1/tasks", get(list_tasks))
            .route("/v1/tasks/:id", get(get_task))
            // Health and metrics
            .route("/health", get(health_check))
            .route("/metrics", get(render_metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    provisioner: Arc<Provisioner>,
    tasks: Arc<TaskManager>,
    metrics: Option<Arc<ProvisionMetrics>>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Start creating a storage pool
async fn create_storage(
    State(state): State<AppState>,
    Path(cluster_id): Path<String>,
    body: Result<Json<AddStorageRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return ApiErrorResponse::reply(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                format!("Error parsing the request: {}", rejection.body_text()),
            );
        }
    };

    info!("Creating storage {} on cluster {}", request.name, cluster_id);

    match state.provisioner.create_storage(&cluster_id, request) {
        Ok(task_id) => (
            StatusCode::ACCEPTED,
            Json(TaskCreatedResponse {
                task_id,
                message: "Task Created".into(),
            }),
        )
            .into_response(),
        Err(e) if e.is_validation() => {
            info!(cluster_id = %cluster_id, "Storage request rejected: {}", e);
            e.into_response()
        }
        Err(e) => {
            error!(cluster_id = %cluster_id, "Storage creation failed to start: {}", e);
            e.into_response()
        }
    }
}

/// List storage entities of a cluster
async fn list_storage(
    State(state): State<AppState>,
    Path(cluster_id): Path<String>,
) -> Response {
    match state.provisioner.list_storage(&cluster_id).await {
        Ok(storage) => (StatusCode::OK, Json(storage)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a storage entity
async fn get_storage(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.provisioner.get_storage(&id).await {
        Ok(Some(storage)) => (StatusCode::OK, Json(storage)).into_response(),
        Ok(None) => Error::ResourceNotFound {
            kind: "Storage".into(),
            name: id,
        }
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// List tasks, oldest first
async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    let tasks: Vec<_> = state.tasks.list().iter().map(|t| t.snapshot()).collect();
    debug!("Listing {} tasks", tasks.len());
    (StatusCode::OK, Json(tasks))
}

/// Get task status
async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let task = Uuid::parse_str(&id)
        .ok()
        .and_then(|task_id| state.tasks.get(&task_id));

    match task {
        Some(task) => (StatusCode::OK, Json(task.snapshot())).into_response(),
        None => Error::ResourceNotFound {
            kind: "Task".into(),
            name: id,
        }
        .into_response(),
    }
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Prometheus metrics
async fn render_metrics(State(state): State<AppState>) -> Response {
    let Some(metrics) = state.metrics else {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    };

    match metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
