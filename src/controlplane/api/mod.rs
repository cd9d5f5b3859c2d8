//! API Module
//!
//! Provides the REST API for storage pool creation and task status.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
