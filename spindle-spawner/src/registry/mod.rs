//! Job registry
//!
//! The registry is the single owner of the `JobId -> services` map. It runs
//! as one tokio task and is reached exclusively through [`RegistryHandle`],
//! which turns every mutation into a [`RegistryCommand`] on a bounded
//! channel. Commands are applied one at a time, so a service's `start` and
//! `stop` are never invoked concurrently with any other registry mutation.

mod actor;
mod command;

pub use actor::{JobRegistry, RegistryState};
pub use command::{RegistryCommand, RegistryHandle};

use tokio::sync::{mpsc, watch};

use crate::config::DuplicatePolicy;

/// Creates a registry and the handle used to drive it.
///
/// The registry does nothing until [`JobRegistry::run`] is spawned; commands
/// sent before that are buffered up to `capacity`.
pub fn registry(capacity: usize, duplicate_policy: DuplicatePolicy) -> (RegistryHandle, JobRegistry) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (state_tx, state_rx) = watch::channel(RegistryState::Idle);
    (
        RegistryHandle::new(tx, state_rx),
        JobRegistry::new(rx, duplicate_policy, state_tx),
    )
}
