//! Registry commands and the handle that sends them

use spindle_core::{JobId, JobService};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;

use super::actor::RegistryState;
use crate::error::{Result, SpawnerError};

/// A mutation or query applied by the registry task
pub enum RegistryCommand {
    /// Start the services and register them under `job_id`
    Add {
        job_id: JobId,
        services: Vec<Arc<dyn JobService>>,
    },
    /// Stop and unregister the services of `job_id`
    Remove { job_id: JobId },
    /// Reply with the currently registered job ids
    Snapshot { reply: oneshot::Sender<Vec<JobId>> },
    /// Stop every registered service, then exit. `done` fires once teardown
    /// has completed.
    Stop { done: oneshot::Sender<()> },
}

impl fmt::Debug for RegistryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { job_id, services } => f
                .debug_struct("Add")
                .field("job_id", job_id)
                .field("services", &services.len())
                .finish(),
            Self::Remove { job_id } => f.debug_struct("Remove").field("job_id", job_id).finish(),
            Self::Snapshot { .. } => f.write_str("Snapshot"),
            Self::Stop { .. } => f.write_str("Stop"),
        }
    }
}

/// Cloneable sender side of the registry
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    commands: mpsc::Sender<RegistryCommand>,
    state: watch::Receiver<RegistryState>,
}

impl RegistryHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<RegistryCommand>,
        state: watch::Receiver<RegistryState>,
    ) -> Self {
        Self { commands, state }
    }

    /// Queues an Add. Returns once the command is enqueued, not when the
    /// services have started.
    pub async fn add(&self, job_id: JobId, services: Vec<Arc<dyn JobService>>) -> Result<()> {
        self.send(RegistryCommand::Add { job_id, services }).await
    }

    /// Queues a Remove
    pub async fn remove(&self, job_id: JobId) -> Result<()> {
        self.send(RegistryCommand::Remove { job_id }).await
    }

    /// Asks the registry for the ids it currently holds
    pub async fn snapshot(&self) -> Result<Vec<JobId>> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| SpawnerError::RegistryClosed)
    }

    /// Stops the registry and waits until every service has been stopped
    pub async fn stop(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.send(RegistryCommand::Stop { done }).await?;
        rx.await.map_err(|_| SpawnerError::RegistryClosed)
    }

    /// Current lifecycle state of the registry task
    pub fn state(&self) -> RegistryState {
        *self.state.borrow()
    }

    /// Waits until the registry has torn down every job.
    ///
    /// Also returns if the registry task went away without reaching
    /// `Stopped`, e.g. because a service panicked.
    pub async fn stopped(&self) {
        let mut state = self.state.clone();
        if state
            .wait_for(|s| *s == RegistryState::Stopped)
            .await
            .is_err()
        {
            warn!("Job registry exited without reporting teardown");
        }
    }

    /// Whether the registry task has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub(crate) async fn send(&self, command: RegistryCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SpawnerError::RegistryClosed)
    }
}
