//! Control Plane Module
//!
//! Coordinates storage pool provisioning: PG sizing, monitor selection,
//! the cluster control API backend and the REST API in front of it.

pub mod api;
pub mod backends;
pub mod monitor;
pub mod placement;
pub mod provisioner;

pub use api::*;
pub use backends::*;
pub use monitor::*;
pub use placement::*;
pub use provisioner::*;
