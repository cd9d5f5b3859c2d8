//! Control API wire types

use serde::{Deserialize, Serialize};

/// State of an async request once the cluster has finished it
pub const REQUEST_STATE_COMPLETE: &str = "complete";

/// Body of a pool creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CephPoolRequest {
    pub name: String,
    pub size: u32,
    pub min_size: u32,
    pub quota_max_objects: u64,
    pub hashpspool: bool,
    pub quota_max_bytes: u64,
    pub pg_num: u32,
    pub pgp_num: u32,
    pub crash_replay_interval: u32,
}

/// Descriptor returned when the cluster accepts an async request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CephAsyncRequest {
    pub request_id: String,
}

/// Status of an async request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CephRequestStatus {
    pub state: String,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub error_message: String,
}

impl CephRequestStatus {
    pub fn is_complete(&self) -> bool {
        self.state == REQUEST_STATE_COMPLETE
    }
}
