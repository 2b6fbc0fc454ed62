//! Registry task
//!
//! Owns the job map and applies commands in the order they are received.

use spindle_core::{JobId, JobService};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::command::RegistryCommand;
use crate::config::DuplicatePolicy;
use crate::error::SpawnerError;

/// Lifecycle of the registry task, published to every handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Created, `run` not entered yet
    Idle,
    Running,
    /// Tearing down the registered jobs
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Start,
    Stop,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

/// Single owner of the running jobs
pub struct JobRegistry {
    jobs: HashMap<JobId, Vec<Arc<dyn JobService>>>,
    commands: mpsc::Receiver<RegistryCommand>,
    duplicate_policy: DuplicatePolicy,
    state: watch::Sender<RegistryState>,
}

impl JobRegistry {
    pub(crate) fn new(
        commands: mpsc::Receiver<RegistryCommand>,
        duplicate_policy: DuplicatePolicy,
        state: watch::Sender<RegistryState>,
    ) -> Self {
        Self {
            jobs: HashMap::new(),
            commands,
            duplicate_policy,
            state,
        }
    }

    /// Processes commands until a Stop arrives or every handle is dropped.
    ///
    /// Either way all registered services are stopped before returning.
    pub async fn run(mut self) {
        self.state.send_replace(RegistryState::Running);
        info!(
            "Job registry running (duplicate policy: {})",
            self.duplicate_policy
        );

        while let Some(command) = self.commands.recv().await {
            debug!("Registry command: {:?}", command);

            match command {
                RegistryCommand::Add { job_id, services } => self.add(job_id, services).await,
                RegistryCommand::Remove { job_id } => self.remove(job_id).await,
                RegistryCommand::Snapshot { reply } => {
                    let _ = reply.send(self.job_ids());
                }
                RegistryCommand::Stop { done } => {
                    self.shutdown().await;
                    let _ = done.send(());
                    return;
                }
            }
        }

        warn!("All registry handles dropped, stopping registered jobs");
        self.shutdown().await;
    }

    async fn add(&mut self, job_id: JobId, services: Vec<Arc<dyn JobService>>) {
        if let Some(existing) = self.jobs.get(&job_id) {
            match self.duplicate_policy {
                DuplicatePolicy::KeepExisting => {
                    error!("{}", SpawnerError::DuplicateJob(job_id));
                    return;
                }
                DuplicatePolicy::ReplaceExisting => {
                    warn!("Job {} is already running, replacing its services", job_id);
                    transition(job_id, existing, Transition::Stop).await;
                    self.jobs.remove(&job_id);
                }
            }
        }

        transition(job_id, &services, Transition::Start).await;
        info!("Job {} started with {} service(s)", job_id, services.len());
        self.jobs.insert(job_id, services);
    }

    async fn remove(&mut self, job_id: JobId) {
        let Some(services) = self.jobs.get(&job_id) else {
            debug!("{}", SpawnerError::MissingJob(job_id));
            return;
        };

        transition(job_id, services, Transition::Stop).await;
        self.jobs.remove(&job_id);
        info!("Job {} removed", job_id);
    }

    async fn shutdown(&mut self) {
        self.state.send_replace(RegistryState::Stopping);
        self.commands.close();
        info!("Stopping {} registered job(s)", self.jobs.len());

        for (job_id, services) in self.jobs.drain() {
            transition(job_id, &services, Transition::Stop).await;
        }

        self.drain_pending();

        self.state.send_replace(RegistryState::Stopped);
        info!("Job registry stopped");
    }

    /// Answers the commands that were queued behind the shutdown.
    ///
    /// Adds and removes are not applied: their services were never started.
    fn drain_pending(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                RegistryCommand::Add { job_id, services } => warn!(
                    "Discarding add of job {} ({} service(s)) received after stop",
                    job_id,
                    services.len()
                ),
                RegistryCommand::Remove { job_id } => {
                    warn!("Discarding remove of job {} received after stop", job_id)
                }
                RegistryCommand::Snapshot { reply } => {
                    let _ = reply.send(self.job_ids());
                }
                RegistryCommand::Stop { done } => {
                    let _ = done.send(());
                }
            }
        }
    }

    fn job_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Applies `step` to every service in order, continuing past failures
async fn transition(job_id: JobId, services: &[Arc<dyn JobService>], step: Transition) {
    let mut failed = 0;

    for (index, service) in services.iter().enumerate() {
        let result = match step {
            Transition::Start => service.start().await,
            Transition::Stop => service.stop().await,
        };

        if let Err(e) = result {
            failed += 1;
            error!(
                job_id = %job_id,
                service = service.name(),
                index,
                "Failed to {} service: {:#}",
                step,
                e
            );
        }
    }

    if failed > 0 {
        error!(
            "Job {}: {} of {} service(s) failed to {}",
            job_id,
            failed,
            services.len(),
            step
        );
    }
}
