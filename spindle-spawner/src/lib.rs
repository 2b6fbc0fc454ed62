//! Spindle Spawner
//!
//! Owns the running services of every job and lets callers add and remove
//! jobs at runtime.
//!
//! Architecture:
//! - Configuration: channel capacity, startup parallelism, duplicate policy
//! - Repository: persistence of job specifications (trait + in-memory store)
//! - Registry: single task owning the `JobId -> services` map, driven by
//!   commands over a channel
//! - Spawner: the public facade, cloneable and safe to call from any task

pub mod config;
pub mod error;
pub mod registry;
pub mod repository;
pub mod spawner;

#[cfg(test)]
mod testing;

pub use config::{DuplicatePolicy, SpawnerConfig};
pub use error::{Result, SpawnerError};
pub use repository::{InMemoryJobStore, JobStore};
pub use spawner::{Spawner, SpawnerState};
