//! Storage Pool Provisioner
//!
//! Control plane orchestrator creating replicated storage pools on Ceph
//! clusters. A creation request is validated up front, then handed to a task
//! which picks a monitor, sizes the pool's placement groups, drives the
//! cluster's asynchronous control API and records the resulting storage
//! entity.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          REST API (axum)                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                     Provisioner ──► Task Manager                 │
//! │   ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐   │
//! │   │ PG Calculator│  │ Monitor Selector │  │  Cluster Backend │   │
//! │   └──────┬───────┘  └────────┬─────────┘  │   (Ceph API)     │   │
//! │          │                   │            └────────┬─────────┘   │
//! │          └─────────┬─────────┘                     │             │
//! │           ┌────────┴──────────┐          submit + poll over HTTP │
//! │           │ Topology Store    │                                  │
//! │           └───────────────────┘                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controlplane`]: provisioner, PG sizing, monitor selection, backends, API
//! - [`domain`]: domain types and port traits
//! - [`store`]: in-memory topology store
//! - [`tasks`]: observable background tasks
//! - [`metrics`]: Prometheus metrics
//! - [`error`]: error types and handling

pub mod controlplane;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod store;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use controlplane::{
    ApiServer, ApiServerConfig, BackendConfig, BackendFactory, CephApi, CephApiConfig,
    PgCalculator, Provisioner, ProvisionerConfig, RestRouter,
};

pub use domain::models::{
    AddStorageRequest, Cluster, Node, Storage, StorageLogicalUnit, StorageStatus,
};

pub use domain::ports::{
    ClusterBackend, CreatePoolParams, PollPolicy, TaskRunner, TopologyRepository,
};

pub use error::{Error, Result};

pub use metrics::ProvisionMetrics;

pub use store::{MemoryTopologyStore, TopologySnapshot};

pub use tasks::{Task, TaskManager, TaskOutcome, TaskSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
