//! Monitor Selection
//!
//! Picks the monitor node that control API calls for a cluster are sent to.
//! Selection is random across eligible monitors and not sticky between calls.

use crate::domain::models::Node;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

/// Select a monitor of `cluster_id` from `nodes` using the thread RNG
pub fn select_monitor<'a>(cluster_id: &Uuid, nodes: &'a [Node]) -> Result<&'a Node> {
    select_monitor_with(&mut rand::thread_rng(), cluster_id, nodes)
}

/// Select a monitor of `cluster_id` from `nodes`.
///
/// Nodes of other clusters and nodes without the monitor flag are never
/// chosen. A single candidate is returned without consulting `rng`.
pub fn select_monitor_with<'a, R: Rng + ?Sized>(
    rng: &mut R,
    cluster_id: &Uuid,
    nodes: &'a [Node],
) -> Result<&'a Node> {
    let mons: Vec<&Node> = nodes
        .iter()
        .filter(|n| n.cluster_id == *cluster_id && n.is_monitor())
        .collect();

    match mons.as_slice() {
        [] => Err(Error::NoMonitorsAvailable {
            cluster_id: cluster_id.to_string(),
        }),
        [only] => Ok(*only),
        candidates => candidates
            .choose(rng)
            .copied()
            .ok_or_else(|| Error::Internal("monitor candidates vanished".into())),
    }
}
