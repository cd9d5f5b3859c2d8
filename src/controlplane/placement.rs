//! Placement Group Calculator
//!
//! Derives the PG count of a new pool from the OSD inventory of its cluster.
//!
//! # Rules
//!
//! | OSDs        | PGs |
//! |-------------|-----|
//! | n <= 5      | 128 |
//! | 5 < n <= 10 | 512 |
//! | 10 < n <= 50| 4096|
//! | n > 50      | capacity weighted |
//!
//! Capacity weighted:
//!
//! ```text
//! max_alloc = avg_osd_size * n / replicas * 0.8
//! pgs       = 200 * n * (size / max_alloc) / replicas
//! ```
//!
//! rounded up to the next power of two.

use crate::domain::models::{StorageLogicalUnit, StorageOptions, OSD_UNIT_TYPE};
use crate::domain::ports::TopologyRepositoryRef;
use crate::utils::next_power_of_two;
use tracing::{debug, warn};
use uuid::Uuid;

/// PG count used for small clusters and whenever the inventory is unusable
pub const DEFAULT_PG_NUM: u32 = 128;

/// Desired average number of PGs per OSD
pub const TARGET_PGS_PER_OSD: u32 = 200;

/// Share of raw capacity a pool may grow into
pub const MAX_UTILIZATION_PCNT: u32 = 80;

/// Resolves PG counts against the topology store
pub struct PgCalculator {
    repository: TopologyRepositoryRef,
}

impl PgCalculator {
    pub fn new(repository: TopologyRepositoryRef) -> Self {
        Self { repository }
    }

    /// PG count for a request: the explicit override if given, else derived
    pub async fn resolve(
        &self,
        cluster_id: &Uuid,
        options: &StorageOptions,
        size_bytes: u64,
        replicas: u32,
    ) -> u32 {
        match options.pg_num {
            Some(pg_num) => pg_num.get(),
            None => self.derive_pg_num(cluster_id, size_bytes, replicas).await,
        }
    }

    /// Derive the PG count from the cluster's OSDs.
    ///
    /// A failing inventory lookup yields [`DEFAULT_PG_NUM`] instead of an error.
    pub async fn derive_pg_num(&self, cluster_id: &Uuid, size_bytes: u64, replicas: u32) -> u32 {
        let osds = match self
            .repository
            .list_logical_units(cluster_id, OSD_UNIT_TYPE)
            .await
        {
            Ok(osds) => osds,
            Err(e) => {
                warn!(
                    "Could not list OSDs of cluster {}, using default PG count: {}",
                    cluster_id, e
                );
                return DEFAULT_PG_NUM;
            }
        };

        let pg_num = pg_num_for_units(&osds, size_bytes, replicas);
        debug!(
            "Derived {} PGs for cluster {} ({} OSDs, {} bytes, {} replicas)",
            pg_num,
            cluster_id,
            osds.len(),
            size_bytes,
            replicas
        );
        pg_num
    }
}

/// Pure PG derivation over an OSD inventory
pub fn pg_num_for_units(osds: &[StorageLogicalUnit], size_bytes: u64, replicas: u32) -> u32 {
    let osd_count = osds.len();
    if osd_count <= 5 {
        return DEFAULT_PG_NUM;
    }
    if osd_count <= 10 {
        return 512;
    }
    if osd_count <= 50 {
        return 4096;
    }

    let total: u128 = osds.iter().map(|u| u.storage_device_size as u128).sum();
    let avg_osd_size = (total / osd_count as u128) as f64;
    capacity_weighted_pg_num(osd_count, avg_osd_size, size_bytes, replicas)
}

fn capacity_weighted_pg_num(
    osd_count: usize,
    avg_osd_size: f64,
    size_bytes: u64,
    replicas: u32,
) -> u32 {
    if replicas == 0 {
        warn!("Replica count of zero, using default PG count");
        return DEFAULT_PG_NUM;
    }

    let n = osd_count as f64;
    let replicas = replicas as f64;
    let utilization = MAX_UTILIZATION_PCNT as f64 / 100.0;

    let max_alloc_size = avg_osd_size * n / replicas * utilization;
    if max_alloc_size <= 0.0 {
        warn!("OSDs report no capacity, using default PG count");
        return DEFAULT_PG_NUM;
    }

    let data_fraction = size_bytes as f64 / max_alloc_size;
    let raw = TARGET_PGS_PER_OSD as f64 * n * data_fraction / replicas;
    next_power_of_two(raw)
}
