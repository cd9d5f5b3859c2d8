//! Task Wrapper
//!
//! Fire-and-track execution of long-running operations: each unit of work
//! gets a [`Task`] whose status log and completion can be observed by id.

pub mod manager;
pub mod task;

pub use manager::*;
pub use task::*;
