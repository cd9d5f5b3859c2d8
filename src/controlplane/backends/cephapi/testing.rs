//! Local stand-in for a cluster control API, used by tests

use axum::extract::{Json, Path, State};
use axum::http::{header::HOST, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Recorded pool creation call
#[derive(Debug, Clone)]
pub struct SubmittedPool {
    pub host: String,
    pub fsid: String,
    pub body: Value,
}

/// Scripted behaviour and call log of the fake control API
pub struct MockCluster {
    /// Status code answered to pool creation
    pub create_status: StatusCode,
    /// Raw body answered to pool creation
    pub create_body: String,
    /// States answered to successive status reads; the last one repeats
    pub states: Vec<String>,
    /// Status code answered to status reads
    pub status_code: StatusCode,
    /// Answer status reads with this raw body instead of a state
    pub status_body: Option<String>,
    pub submitted: Mutex<Vec<SubmittedPool>>,
    pub status_reads: AtomicUsize,
}

impl MockCluster {
    /// Accepts pool creation and completes after `running` status reads
    pub fn completing_after(running: usize) -> Self {
        let mut states = vec!["running".to_string(); running];
        states.push("complete".to_string());
        Self {
            create_status: StatusCode::ACCEPTED,
            create_body: json!({ "request_id": "req-1" }).to_string(),
            states,
            status_code: StatusCode::OK,
            status_body: None,
            submitted: Mutex::new(Vec::new()),
            status_reads: AtomicUsize::new(0),
        }
    }

    /// Accepts pool creation but never completes it
    pub fn never_completing() -> Self {
        Self {
            states: vec!["running".to_string()],
            ..Self::completing_after(0)
        }
    }

    pub fn submitted(&self) -> Vec<SubmittedPool> {
        self.submitted.lock().clone()
    }

    pub fn status_reads(&self) -> usize {
        self.status_reads.load(Ordering::SeqCst)
    }
}

async fn create_pool(
    State(mock): State<Arc<MockCluster>>,
    Path(fsid): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    mock.submitted.lock().push(SubmittedPool { host, fsid, body });
    (mock.create_status, mock.create_body.clone()).into_response()
}

async fn request_status(
    State(mock): State<Arc<MockCluster>>,
    Path(request_id): Path<String>,
) -> Response {
    let read = mock.status_reads.fetch_add(1, Ordering::SeqCst);
    if !mock.status_code.is_success() {
        return (mock.status_code, "status unavailable").into_response();
    }
    if let Some(body) = &mock.status_body {
        return (StatusCode::OK, body.clone()).into_response();
    }
    let state = mock
        .states
        .get(read)
        .or_else(|| mock.states.last())
        .cloned()
        .unwrap_or_else(|| "complete".to_string());
    Json(json!({ "id": request_id, "state": state })).into_response()
}

/// Serve `mock` on an ephemeral port reachable on every loopback address
pub async fn serve(mock: Arc<MockCluster>) -> SocketAddr {
    let app = Router::new()
        .route("/api/v2/cluster/:fsid/pool", post(create_pool))
        .route("/api/v2/request/:request_id", get(request_status))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
