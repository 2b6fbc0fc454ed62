//! Job spawner
//!
//! Public entry point for adding and removing jobs at runtime. Every
//! mutation is forwarded to the job registry task; the spawner itself keeps
//! no job state, so it can be cloned freely and called from any task.

use anyhow::Result as AnyResult;
use spindle_core::{FactoryRegistry, JobId, JobService, JobServiceFactory, JobSpec};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::SpawnerConfig;
use crate::error::{Result, SpawnerError};
use crate::registry::{self, JobRegistry, RegistryHandle, RegistryState};
use crate::repository::JobStore;

const NIL_ID_ERROR: &str = "Unable to add job - job has nil ID";

/// Externally visible lifecycle of a spawner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnerState {
    /// Created, registry task not spawned yet
    Idle,
    Running,
    /// `stop` was called and jobs are being torn down
    Stopping,
    Stopped,
}

enum Lifecycle {
    Idle(JobRegistry),
    Running(JoinHandle<()>),
    Stopping,
    Stopped,
}

struct Inner {
    config: SpawnerConfig,
    store: Arc<dyn JobStore>,
    factories: RwLock<FactoryRegistry>,
    registry: RegistryHandle,
    lifecycle: Mutex<Lifecycle>,
}

/// Cloneable handle to a job spawner
#[derive(Clone)]
pub struct Spawner {
    inner: Arc<Inner>,
}

impl Spawner {
    /// Creates a spawner
    ///
    /// # Arguments
    /// * `config` - Spawner configuration
    /// * `store` - Persistence layer holding the job specifications
    /// * `factories` - Job type factories, usually filled by the domain modules
    pub fn new(config: SpawnerConfig, store: Arc<dyn JobStore>, factories: FactoryRegistry) -> Self {
        let (handle, job_registry) =
            registry::registry(config.command_buffer, config.duplicate_policy);

        Self {
            inner: Arc::new(Inner {
                config,
                store,
                factories: RwLock::new(factories),
                registry: handle,
                lifecycle: Mutex::new(Lifecycle::Idle(job_registry)),
            }),
        }
    }

    /// Spawns the registry task and adds every persisted job.
    ///
    /// Persisted jobs are added concurrently, at most `max_parallel_loads`
    /// at a time, and this returns once all of them have been dispatched.
    /// Failures of individual jobs are logged; only a failure to enumerate
    /// the store is returned.
    pub async fn start(&self) -> Result<()> {
        self.spawn_registry()?;

        info!("Loading persisted jobs");

        let permits = Arc::new(Semaphore::new(self.inner.config.max_parallel_loads.max(1)));
        let mut loads = JoinSet::new();

        let enumerated = self
            .inner
            .store
            .for_each_job(&mut |spec| {
                let Some(spec) = spec else {
                    error!("Received nil job from the store, skipping");
                    return true;
                };

                let spawner = self.clone();
                let permits = Arc::clone(&permits);
                loads.spawn(async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return;
                    };
                    match spawner.add_job(spec.as_ref()).await {
                        Ok(()) => {}
                        Err(e) if e.is_caller_error() => {
                            warn!("Skipping persisted {} job: {}", spec.job_type(), e)
                        }
                        Err(e) => error!("Error adding {} job: {}", spec.job_type(), e),
                    }
                });
                true
            })
            .await;

        let mut dispatched = 0;
        while let Some(joined) = loads.join_next().await {
            match joined {
                Ok(()) => dispatched += 1,
                Err(e) => warn!("Job load task panicked: {}", e),
            }
        }

        info!("Dispatched {} persisted job(s)", dispatched);

        enumerated.map_err(SpawnerError::Store)
    }

    /// Stops every running job and waits for the teardown to complete.
    ///
    /// Concurrent callers all return once the teardown has finished. Does
    /// nothing, apart from a warning, if the spawner was never started or
    /// has already stopped.
    pub async fn stop(&self) {
        let task = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopping) {
                Lifecycle::Running(task) => Some(task),
                Lifecycle::Stopping => None,
                other => {
                    *lifecycle = other;
                    warn!("Spawner is not running: cannot stop");
                    return;
                }
            }
        };

        let Some(task) = task else {
            debug!("Spawner is already stopping, waiting for teardown");
            self.inner.registry.stopped().await;
            return;
        };

        info!("Stopping spawner");

        if let Err(e) = self.inner.registry.stop().await {
            error!("Job registry did not acknowledge stop: {}", e);
        }

        if let Err(e) = task.await {
            error!("Job registry task failed: {}", e);
        }

        *self.lifecycle() = Lifecycle::Stopped;
        info!("Spawner stopped");
    }

    /// Builds the services for `spec` and hands them to the registry.
    ///
    /// Returns as soon as the registry has accepted the job; its services
    /// are started asynchronously. A job type whose factory yields no
    /// services is accepted without registering anything.
    pub async fn add_job(&self, spec: &dyn JobSpec) -> Result<()> {
        let Some(job_id) = spec.job_id() else {
            error!("Spawner received {} job with nil ID", spec.job_type());
            if let Err(e) = self.inner.store.record_job_error(spec, NIL_ID_ERROR).await {
                warn!("Failed to record error for {} job: {:#}", spec.job_type(), e);
            }
            return Err(SpawnerError::InvalidSpec);
        };

        let factory = self
            .factory(spec.job_type())
            .ok_or_else(|| SpawnerError::UnknownJobType(spec.job_type().to_string()))?;

        let services = factory(spec).map_err(|source| SpawnerError::FactoryFailed {
            job_type: spec.job_type().to_string(),
            source,
        })?;

        if services.is_empty() {
            debug!("{} job {} has no services, nothing to run", spec.job_type(), job_id);
            return Ok(());
        }

        debug!(
            "Adding {} job {} with {} service(s)",
            spec.job_type(),
            job_id,
            services.len()
        );
        self.inner.registry.add(job_id, services).await
    }

    /// Stops and removes a running job. Unknown ids are ignored.
    pub async fn remove_job(&self, id: Option<JobId>) {
        let Some(job_id) = id else {
            warn!("nil job ID passed to Spawner::remove_job");
            return;
        };

        if let Err(e) = self.inner.registry.remove(job_id).await {
            warn!("Cannot remove job {}: {}", job_id, e);
        }
    }

    /// Registers or replaces the factory for `job_type`
    pub fn register_job_type<F>(&self, job_type: impl Into<String>, factory: F)
    where
        F: Fn(&dyn JobSpec) -> AnyResult<Vec<Arc<dyn JobService>>> + Send + Sync + 'static,
    {
        self.inner
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(job_type, factory);
    }

    /// Ids of the jobs currently held by the registry
    pub async fn active_jobs(&self) -> Result<Vec<JobId>> {
        if self.state() != SpawnerState::Running {
            return Err(SpawnerError::RegistryClosed);
        }
        self.inner.registry.snapshot().await
    }

    pub fn state(&self) -> SpawnerState {
        let registry_state = self.inner.registry.state();
        match &*self.lifecycle() {
            Lifecycle::Idle(_) => SpawnerState::Idle,
            Lifecycle::Running(_) => match registry_state {
                RegistryState::Idle | RegistryState::Running => SpawnerState::Running,
                RegistryState::Stopping => SpawnerState::Stopping,
                RegistryState::Stopped => SpawnerState::Stopped,
            },
            Lifecycle::Stopping if registry_state == RegistryState::Stopped => {
                SpawnerState::Stopped
            }
            Lifecycle::Stopping => SpawnerState::Stopping,
            Lifecycle::Stopped => SpawnerState::Stopped,
        }
    }

    fn spawn_registry(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(job_registry) => {
                *lifecycle = Lifecycle::Running(tokio::spawn(job_registry.run()));
                Ok(())
            }
            other => {
                *lifecycle = other;
                Err(SpawnerError::AlreadyStarted)
            }
        }
    }

    fn factory(&self, job_type: &str) -> Option<JobServiceFactory> {
        self.inner
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_type)
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
