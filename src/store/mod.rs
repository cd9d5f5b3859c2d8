//! Topology Store Adapters
//!
//! Implementations of the topology repository port.

pub mod memory;

pub use memory::*;
