//! Heartbeat job type
//!
//! Each replica runs a background task that logs a beat at a fixed
//! interval while the service is started.
//!
//! Parameters:
//! - `replicas` (optional, default: 1, 0 yields no services)
//! - `interval_ms` (optional, default: 1000)

use anyhow::{Result, bail};
use async_trait::async_trait;
use spindle_core::{JobId, JobService, JobSpec};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, info};

pub const JOB_TYPE: &str = "heartbeat";

const DEFAULT_REPLICAS: u64 = 1;
const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Service that emits periodic heartbeats
pub struct HeartbeatService {
    job_id: Option<JobId>,
    replica: u64,
    interval: Duration,
    beats: Arc<AtomicU64>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatService {
    pub fn new(job_id: Option<JobId>, replica: u64, interval: Duration) -> Self {
        Self {
            job_id,
            replica,
            interval,
            beats: Arc::new(AtomicU64::new(0)),
            ticker: Mutex::new(None),
        }
    }

    /// Number of beats emitted so far
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    /// Whether the background ticker is currently running
    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[async_trait]
impl JobService for HeartbeatService {
    async fn start(&self) -> Result<()> {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.is_some() {
            bail!("heartbeat replica {} is already running", self.replica);
        }

        let job_id = self.job_id;
        let replica = self.replica;
        let interval = self.interval;
        let beats = Arc::clone(&self.beats);

        *ticker = Some(tokio::spawn(async move {
            let mut timer = time::interval(interval);
            loop {
                timer.tick().await;
                let n = beats.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(job_id = ?job_id, replica, "heartbeat #{}", n);
            }
        }));

        info!(job_id = ?self.job_id, replica = self.replica, "Heartbeat started (interval: {:?})", self.interval);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let handle = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handle {
            Some(handle) => {
                handle.abort();
                info!(job_id = ?self.job_id, replica = self.replica, "Heartbeat stopped after {} beat(s)", self.beats());
                Ok(())
            }
            None => bail!("heartbeat replica {} is not running", self.replica),
        }
    }

    fn name(&self) -> &str {
        "heartbeat"
    }
}

/// Builds `replicas` heartbeat services
pub fn factory(spec: &dyn JobSpec) -> Result<Vec<Arc<dyn JobService>>> {
    let definition = super::as_definition(spec, JOB_TYPE)?;
    let replicas = definition
        .parameter_u64("replicas")
        .unwrap_or(DEFAULT_REPLICAS);
    let interval_ms = definition
        .parameter_u64("interval_ms")
        .unwrap_or(DEFAULT_INTERVAL_MS);

    if interval_ms == 0 {
        bail!("interval_ms must be greater than 0");
    }

    let interval = Duration::from_millis(interval_ms);
    Ok((0..replicas)
        .map(|replica| {
            Arc::new(HeartbeatService::new(definition.id, replica, interval)) as Arc<dyn JobService>
        })
        .collect())
}
