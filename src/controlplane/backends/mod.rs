//! Cluster Backend Adapters
//!
//! Provides adapters for cluster control APIs:
//! - CephApi: REST control API served by Ceph monitors

pub mod cephapi;

pub use cephapi::{CephApi, CephApiConfig};

use crate::domain::ports::{ClusterBackendRef, TopologyRepositoryRef};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Factory for creating cluster backend adapters
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend adapter by name
    pub fn create(
        name: &str,
        config: BackendConfig,
        repository: TopologyRepositoryRef,
    ) -> Result<ClusterBackendRef> {
        match name.to_lowercase().as_str() {
            "cephapi" | "ceph" => Ok(Arc::new(CephApi::new(config.cephapi, repository)?)),
            _ => Err(Error::Configuration(format!(
                "Unknown cluster backend: {}",
                name
            ))),
        }
    }
}

/// Combined backend configuration
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub cephapi: CephApiConfig,
}
