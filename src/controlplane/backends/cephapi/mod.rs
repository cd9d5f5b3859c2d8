//! Ceph Control API Backend
//!
//! Drives a cluster through the REST control API exposed on its monitors.
//! Pool creation is asynchronous on the cluster side: the submit call
//! returns a request id which is then polled until the cluster reports the
//! request `complete`.

pub mod handler;
pub mod models;
pub mod routes;
#[cfg(test)]
pub(crate) mod testing;

pub use handler::HttpHandler;
pub use models::*;
pub use routes::*;

use crate::domain::ports::{
    ClusterBackend, CreatePoolParams, Mon, Osd, PollPolicy, TopologyRepositoryRef,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

// =============================================================================
// Configuration
// =============================================================================

/// Default port of the control API on monitors
pub const CEPH_API_PORT: u16 = 8002;

/// Default path prefix of the control API
pub const CEPH_API_DEFAULT_PREFIX: &str = "api";

/// Configuration for the control API client
#[derive(Debug, Clone)]
pub struct CephApiConfig {
    /// URL scheme, `http` or `https`
    pub scheme: String,
    /// Control API port on monitors
    pub port: u16,
    /// Path prefix before the version segment
    pub prefix: String,
    /// Timeout of a single HTTP request
    pub request_timeout: Duration,
}

impl Default for CephApiConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            port: CEPH_API_PORT,
            prefix: CEPH_API_DEFAULT_PREFIX.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Ceph API Backend
// =============================================================================

/// Cluster backend speaking the Ceph control API
pub struct CephApi {
    routes: RouteTable,
    http: HttpHandler,
    repository: TopologyRepositoryRef,
}

impl CephApi {
    /// Create a backend with the default route table
    pub fn new(config: CephApiConfig, repository: TopologyRepositoryRef) -> Result<Self> {
        Self::with_routes(config, RouteTable::default(), repository)
    }

    pub fn with_routes(
        config: CephApiConfig,
        routes: RouteTable,
        repository: TopologyRepositoryRef,
    ) -> Result<Self> {
        Ok(Self {
            routes,
            http: HttpHandler::new(&config)?,
            repository,
        })
    }

    /// Fsid used in routes for the target cluster.
    ///
    /// The cluster must exist and carry the name the caller expects.
    async fn cluster_fsid(&self, params: &CreatePoolParams) -> Result<String> {
        match self.repository.get_cluster(&params.cluster_id).await? {
            Some(cluster) if cluster.name == params.cluster_name => {
                Ok(cluster.cluster_id.to_string())
            }
            Some(cluster) => Err(Error::Validation(format!(
                "Cluster {} is named {}, not {}",
                cluster.cluster_id, cluster.name, params.cluster_name
            ))),
            None => Err(Error::ResourceNotFound {
                kind: "Cluster".into(),
                name: params.cluster_id.to_string(),
            }),
        }
    }

    /// Submit the pool creation and return the async request descriptor
    async fn submit_create_pool(&self, params: &CreatePoolParams) -> Result<CephAsyncRequest> {
        let fsid = self.cluster_fsid(params).await?;
        let route = self.routes.get(CREATE_POOL)?;
        let path = route.render(&[(CLUSTER_FSID_TOKEN, fsid.as_str())])?;

        let body = CephPoolRequest {
            name: params.name.clone(),
            size: params.replicas,
            min_size: 1,
            quota_max_objects: params.quota_max_objects,
            hashpspool: false,
            quota_max_bytes: params.quota_max_bytes,
            pg_num: params.pg_num,
            pgp_num: params.pg_num,
            crash_replay_interval: 0,
        };

        let response = self
            .http
            .send(&params.mon, route, &path, Some(&body))
            .await
            .map_err(|e| Error::RemoteSubmit {
                operation: CREATE_POOL.into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            return Err(Error::RemoteSubmit {
                operation: CREATE_POOL.into(),
                reason: format!("HTTP {}", status),
            });
        }

        decode(CREATE_POOL, response).await
    }

    /// Read the current status of an async request
    async fn request_status(&self, mon: &str, request_id: &str) -> Result<CephRequestStatus> {
        let route = self.routes.get(GET_REQUEST_STATUS)?;
        let path = route.render(&[(REQUEST_FSID_TOKEN, request_id)])?;

        let response = self
            .http
            .send::<()>(mon, route, &path, None)
            .await
            .map_err(|e| Error::RemotePoll {
                request_id: request_id.into(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Error::RemotePoll {
                request_id: request_id.into(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        decode(GET_REQUEST_STATUS, response).await
    }

    /// Poll an async request until it completes or `policy` runs out
    async fn wait_for_request(
        &self,
        mon: &str,
        request_id: &str,
        policy: &PollPolicy,
    ) -> Result<()> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            if !policy.allows(attempts, started.elapsed()) {
                return Err(Error::TimedOut {
                    request_id: request_id.into(),
                    attempts,
                    elapsed: started.elapsed(),
                });
            }

            tokio::time::sleep(policy.interval).await;
            attempts += 1;

            let status = self.request_status(mon, request_id).await?;
            debug!(
                "Request {} state after {} polls: {}",
                request_id, attempts, status.state
            );

            if status.is_complete() {
                if status.error {
                    warn!(
                        "Request {} completed with error flag set: {}",
                        request_id, status.error_message
                    );
                }
                return Ok(());
            }
        }
    }
}

/// Decode a JSON response body
async fn decode<T: DeserializeOwned>(operation: &str, response: reqwest::Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(|e| Error::RemoteDecode {
        operation: operation.into(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| Error::RemoteDecode {
        operation: operation.into(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ClusterBackend for CephApi {
    async fn create_cluster(&self, _cluster_name: &str, _fsid: Uuid, _mons: &[Mon]) -> Result<bool> {
        Ok(true)
    }

    async fn add_mon(&self, _cluster_name: &str, _mons: &[Mon]) -> Result<bool> {
        Ok(true)
    }

    async fn start_mon(&self, _nodes: &[String]) -> Result<bool> {
        Ok(true)
    }

    async fn add_osd(&self, _cluster_name: &str, _osd: &Osd) -> Result<bool> {
        Ok(true)
    }

    async fn create_pool(&self, params: &CreatePoolParams, policy: &PollPolicy) -> Result<()> {
        info!(
            "Creating pool {} on cluster {} via {} ({} PGs, {} replicas)",
            params.name, params.cluster_name, params.mon, params.pg_num, params.replicas
        );

        let request = self.submit_create_pool(params).await?;
        debug!("Pool {} submitted as request {}", params.name, request.request_id);

        self.wait_for_request(&params.mon, &request.request_id, policy)
            .await?;

        info!("Pool {} created on cluster {}", params.name, params.cluster_name);
        Ok(())
    }

    async fn list_pools(&self, _mon: &str, _cluster_name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn cluster_up(&self, _mon: &str, _cluster_name: &str) -> Result<bool> {
        Ok(true)
    }

    fn backend_name(&self) -> &str {
        "cephapi"
    }
}
