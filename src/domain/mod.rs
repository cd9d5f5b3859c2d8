//! Domain layer - Core records and port definitions
//!
//! This module defines the topology records and the core traits (ports)
//! that adapters implement, following hexagonal architecture principles.

pub mod models;
pub mod ports;

pub use models::*;
pub use ports::*;
