//! Domain Models - Topology records and storage entities
//!
//! Records read from the topology store (clusters, nodes, logical units),
//! the storage entity written after a successful provisioning, and the
//! inbound creation request with its validated options.

use crate::error::{Error, Result};
use crate::utils::parse_size;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use uuid::Uuid;

/// Node option key flagging a monitor
pub const MON_OPTION_KEY: &str = "mon";

/// Logical unit type tag for object storage devices
pub const OSD_UNIT_TYPE: &str = "osd";

/// Request option overriding the derived PG count
pub const OPTION_PG_NUM: &str = "pgnum";

/// Quota parameter holding the maximum object count
pub const QUOTA_MAX_OBJECTS: &str = "quota_max_objects";

/// Quota parameter holding the maximum byte count
pub const QUOTA_MAX_BYTES: &str = "quota_max_bytes";

// =============================================================================
// Topology Records
// =============================================================================

/// A storage cluster known to the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub cluster_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// A host participating in a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: Uuid,
    pub hostname: String,
    pub cluster_id: Uuid,
    /// Role options, e.g. `mon: Y`
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Node {
    /// Check whether the node carries the monitor role flag
    pub fn is_monitor(&self) -> bool {
        self.options
            .get(MON_OPTION_KEY)
            .map(|v| {
                matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "y" | "yes" | "true"
                )
            })
            .unwrap_or(false)
    }
}

/// A device contributing raw capacity to a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageLogicalUnit {
    pub slu_id: Uuid,
    pub cluster_id: Uuid,
    pub node_id: Uuid,
    /// Type tag, `osd` for object storage devices
    #[serde(rename = "type")]
    pub unit_type: String,
    /// Raw device size in bytes
    pub storage_device_size: u64,
}

// =============================================================================
// Storage Entity
// =============================================================================

/// Lifecycle status of a storage entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageStatus {
    Up,
    Down,
}

impl std::fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageStatus::Up => write!(f, "up"),
            StorageStatus::Down => write!(f, "down"),
        }
    }
}

/// Durable record of a pool created on a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    pub storage_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub storage_type: String,
    pub tags: Vec<String>,
    pub cluster_id: Uuid,
    pub size: String,
    pub status: StorageStatus,
    pub replicas: u32,
    pub profile: String,
    pub snapshots_enabled: bool,
    pub quota_enabled: bool,
    pub quota_params: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Storage {
    /// Build a fresh `up` record for a request that completed on the cluster
    pub fn from_request(cluster_id: Uuid, request: &AddStorageRequest) -> Self {
        Self {
            storage_id: Uuid::new_v4(),
            name: request.name.clone(),
            storage_type: request.storage_type.clone(),
            tags: request.tags.clone(),
            cluster_id,
            size: request.size.clone(),
            status: StorageStatus::Up,
            replicas: request.replicas,
            profile: request.profile.clone(),
            snapshots_enabled: request.snapshots_enabled,
            quota_enabled: request.quota_enabled,
            quota_params: request.quota_params.clone(),
            options: request.options.clone(),
            created_at: chrono::Utc::now(),
        }
    }
}

// =============================================================================
// Creation Request
// =============================================================================

/// Inbound request to create a storage pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStorageRequest {
    pub name: String,
    #[serde(rename = "type", default)]
    pub storage_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Human-readable capacity, e.g. "100GB"
    pub size: String,
    pub replicas: u32,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub snapshots_enabled: bool,
    #[serde(default)]
    pub quota_enabled: bool,
    #[serde(default)]
    pub quota_params: BTreeMap<String, String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Typed view of the tuning and quota parameters of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageOptions {
    /// Explicit PG count override
    pub pg_num: Option<NonZeroU32>,
    pub quota_max_objects: Option<u64>,
    pub quota_max_bytes: Option<u64>,
}

/// A creation request that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedStorageRequest {
    pub request: AddStorageRequest,
    pub size_bytes: u64,
    pub options: StorageOptions,
}

impl AddStorageRequest {
    /// Validate the request, decoding its stringly-typed maps.
    ///
    /// Quota parameters are only read when quota is enabled. An empty value
    /// counts as absent; anything else must parse.
    pub fn validate(self) -> Result<ValidatedStorageRequest> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("storage name must not be empty".into()));
        }
        if self.replicas == 0 {
            return Err(Error::Validation(
                "replica count must be at least 1".into(),
            ));
        }

        let size_bytes = parse_size(&self.size)?;

        let pg_num = match non_empty(&self.options, OPTION_PG_NUM) {
            Some(raw) => {
                let value = raw.parse::<NonZeroU32>().map_err(|_| {
                    Error::Validation(format!("Error parsing option {}: {}", OPTION_PG_NUM, raw))
                })?;
                Some(value)
            }
            None => None,
        };

        let (quota_max_objects, quota_max_bytes) = if self.quota_enabled {
            (
                parse_quota(&self.quota_params, QUOTA_MAX_OBJECTS)?,
                parse_quota(&self.quota_params, QUOTA_MAX_BYTES)?,
            )
        } else {
            (None, None)
        };

        Ok(ValidatedStorageRequest {
            request: self,
            size_bytes,
            options: StorageOptions {
                pg_num,
                quota_max_objects,
                quota_max_bytes,
            },
        })
    }
}

fn non_empty<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_quota(params: &BTreeMap<String, String>, key: &str) -> Result<Option<u64>> {
    match non_empty(params, key) {
        Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
            Error::Validation(format!("Error parsing quota config value for {}", key))
        }),
        None => Ok(None),
    }
}
