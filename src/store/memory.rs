//! In-Memory Topology Store
//!
//! DashMap-backed implementation of the topology repository, seeded from a
//! snapshot file or populated directly.

use crate::domain::models::{Cluster, Node, Storage, StorageLogicalUnit};
use crate::domain::ports::TopologyRepository;
use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// Topology Snapshot
// =============================================================================

/// Serialized contents of a topology store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologySnapshot {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub storage_logical_units: Vec<StorageLogicalUnit>,
    #[serde(default)]
    pub storage: Vec<Storage>,
}

impl TopologySnapshot {
    /// Load a snapshot from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&contents)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&contents)?),
            _ => Err(Error::Configuration(format!(
                "Unsupported topology file format: {}",
                path.display()
            ))),
        }
    }
}

// =============================================================================
// Memory Topology Store
// =============================================================================

/// Topology repository held in memory
#[derive(Default)]
pub struct MemoryTopologyStore {
    clusters: DashMap<Uuid, Cluster>,
    nodes: DashMap<Uuid, Node>,
    logical_units: DashMap<Uuid, StorageLogicalUnit>,
    storage: DashMap<Uuid, Storage>,
}

impl MemoryTopologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store populated from a snapshot
    pub fn from_snapshot(snapshot: TopologySnapshot) -> Self {
        let store = Self::new();
        for cluster in snapshot.clusters {
            store.add_cluster(cluster);
        }
        for node in snapshot.nodes {
            store.add_node(node);
        }
        for unit in snapshot.storage_logical_units {
            store.add_logical_unit(unit);
        }
        for storage in snapshot.storage {
            store.storage.insert(storage.storage_id, storage);
        }

        info!(
            "Topology store loaded: {} clusters, {} nodes, {} logical units, {} storage",
            store.clusters.len(),
            store.nodes.len(),
            store.logical_units.len(),
            store.storage.len()
        );
        store
    }

    pub fn add_cluster(&self, cluster: Cluster) {
        self.clusters.insert(cluster.cluster_id, cluster);
    }

    pub fn add_node(&self, node: Node) {
        self.nodes.insert(node.node_id, node);
    }

    pub fn add_logical_unit(&self, unit: StorageLogicalUnit) {
        self.logical_units.insert(unit.slu_id, unit);
    }

    /// Dump the current contents
    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot {
            clusters: self.clusters.iter().map(|e| e.value().clone()).collect(),
            nodes: self.nodes.iter().map(|e| e.value().clone()).collect(),
            storage_logical_units: self
                .logical_units
                .iter()
                .map(|e| e.value().clone())
                .collect(),
            storage: self.storage.iter().map(|e| e.value().clone()).collect(),
        }
    }
}

#[async_trait]
impl TopologyRepository for MemoryTopologyStore {
    async fn get_cluster(&self, cluster_id: &Uuid) -> Result<Option<Cluster>> {
        Ok(self.clusters.get(cluster_id).map(|c| c.value().clone()))
    }

    async fn list_nodes(&self, cluster_id: &Uuid) -> Result<Vec<Node>> {
        let mut nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| n.cluster_id == *cluster_id)
            .map(|n| n.value().clone())
            .collect();
        nodes.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        Ok(nodes)
    }

    async fn get_node(&self, node_id: &Uuid) -> Result<Option<Node>> {
        Ok(self.nodes.get(node_id).map(|n| n.value().clone()))
    }

    async fn list_logical_units(
        &self,
        cluster_id: &Uuid,
        unit_type: &str,
    ) -> Result<Vec<StorageLogicalUnit>> {
        Ok(self
            .logical_units
            .iter()
            .filter(|u| u.cluster_id == *cluster_id && u.unit_type == unit_type)
            .map(|u| u.value().clone())
            .collect())
    }

    async fn insert_storage(&self, storage: Storage) -> Result<()> {
        debug!("Inserting storage {} ({})", storage.name, storage.storage_id);
        match self.storage.entry(storage.storage_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::Persistence(format!(
                "duplicate storage id {}",
                storage.storage_id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(storage);
                Ok(())
            }
        }
    }

    async fn get_storage(&self, storage_id: &Uuid) -> Result<Option<Storage>> {
        Ok(self.storage.get(storage_id).map(|s| s.value().clone()))
    }

    async fn list_storage(&self, cluster_id: &Uuid) -> Result<Vec<Storage>> {
        let mut storage: Vec<Storage> = self
            .storage
            .iter()
            .filter(|s| s.cluster_id == *cluster_id)
            .map(|s| s.value().clone())
            .collect();
        storage.sort_by_key(|s| s.created_at);
        Ok(storage)
    }
}
