//! Domain Ports - Core trait definitions for the provisioner
//!
//! These traits define the boundaries between the provisioning logic and
//! external systems: the topology store, the cluster control API and the
//! task runner. Adapters implement these traits to provide concrete
//! functionality.

use crate::domain::models::{Cluster, Node, Storage, StorageLogicalUnit};
use crate::error::Result;
use crate::tasks::Task;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// Topology Repository Port
// =============================================================================

/// Port for the durable store of clusters, nodes, devices and storage entities
#[async_trait]
pub trait TopologyRepository: Send + Sync {
    /// Get a cluster by id
    async fn get_cluster(&self, cluster_id: &Uuid) -> Result<Option<Cluster>>;

    /// List all nodes of a cluster
    async fn list_nodes(&self, cluster_id: &Uuid) -> Result<Vec<Node>>;

    /// Get a node by id
    async fn get_node(&self, node_id: &Uuid) -> Result<Option<Node>>;

    /// List logical units of a given type in a cluster
    async fn list_logical_units(
        &self,
        cluster_id: &Uuid,
        unit_type: &str,
    ) -> Result<Vec<StorageLogicalUnit>>;

    /// Insert a new storage entity
    async fn insert_storage(&self, storage: Storage) -> Result<()>;

    /// Get a storage entity by id
    async fn get_storage(&self, storage_id: &Uuid) -> Result<Option<Storage>>;

    /// List storage entities of a cluster
    async fn list_storage(&self, cluster_id: &Uuid) -> Result<Vec<Storage>>;
}

// =============================================================================
// Cluster Backend Port
// =============================================================================

/// Monitor to bootstrap on a cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mon {
    pub node_name: String,
    pub public_ip: String,
}

/// OSD to add to a cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Osd {
    pub node_name: String,
    pub device: String,
    pub fs_type: String,
}

/// Parameters of a pool to create on a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePoolParams {
    pub name: String,
    /// Cluster the pool is created on; its id is the fsid used in routes
    pub cluster_id: Uuid,
    /// Hostname of the monitor addressed by the control API
    pub mon: String,
    pub cluster_name: String,
    pub pg_num: u32,
    pub replicas: u32,
    pub quota_max_objects: u64,
    pub quota_max_bytes: u64,
}

/// Bounds on how long an asynchronous cluster request is polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between status reads
    pub interval: Duration,
    /// Give up after this many status reads
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since submission
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    /// Poll until the request completes, however long that takes
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            deadline: None,
        }
    }

    /// Check whether the policy still allows another status read
    pub fn allows(&self, attempts: u32, elapsed: Duration) -> bool {
        let within_attempts = self.max_attempts.map_or(true, |max| attempts < max);
        let within_deadline = self.deadline.map_or(true, |deadline| elapsed < deadline);
        within_attempts && within_deadline
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: None,
            deadline: Some(Duration::from_secs(30 * 60)),
        }
    }
}

/// Port for operations executed by a cluster's control API
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Create a new cluster
    async fn create_cluster(&self, cluster_name: &str, fsid: Uuid, mons: &[Mon]) -> Result<bool>;

    /// Add monitors to a cluster
    async fn add_mon(&self, cluster_name: &str, mons: &[Mon]) -> Result<bool>;

    /// Start monitors on the given nodes
    async fn start_mon(&self, nodes: &[String]) -> Result<bool>;

    /// Add an OSD to a cluster
    async fn add_osd(&self, cluster_name: &str, osd: &Osd) -> Result<bool>;

    /// Create a pool and wait for the cluster to finish creating it
    async fn create_pool(&self, params: &CreatePoolParams, policy: &PollPolicy) -> Result<()>;

    /// List pool names of a cluster
    async fn list_pools(&self, mon: &str, cluster_name: &str) -> Result<Vec<String>>;

    /// Check whether a cluster is up
    async fn cluster_up(&self, mon: &str, cluster_name: &str) -> Result<bool>;

    /// Get backend name
    fn backend_name(&self) -> &str;
}

// =============================================================================
// Task Runner Port
// =============================================================================

/// A unit of work run against its task handle
pub type TaskWork = Box<dyn FnOnce(Arc<Task>) -> BoxFuture<'static, ()> + Send>;

/// Port for running named units of work out of band
pub trait TaskRunner: Send + Sync {
    /// Start the work and return its task id without waiting for it
    fn run(&self, name: &str, work: TaskWork) -> Result<Uuid>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type TopologyRepositoryRef = Arc<dyn TopologyRepository>;
pub type ClusterBackendRef = Arc<dyn ClusterBackend>;
pub type TaskRunnerRef = Arc<dyn TaskRunner>;
