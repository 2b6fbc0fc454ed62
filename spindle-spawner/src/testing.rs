//! Test doubles shared by the registry and spawner tests

use anyhow::{Result, bail};
use async_trait::async_trait;
use spindle_core::{JobService, JobSpec};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered record of lifecycle calls, shared between services
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Service that records `start:<label>` / `stop:<label>` into an event log
pub struct RecordingService {
    label: String,
    log: EventLog,
    fail_start: bool,
    fail_stop: bool,
    stop_delay: Duration,
}

impl RecordingService {
    pub fn new(label: impl Into<String>, log: EventLog) -> Self {
        Self {
            label: label.into(),
            log,
            fail_start: false,
            fail_stop: false,
            stop_delay: Duration::ZERO,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }
}

#[async_trait]
impl JobService for RecordingService {
    async fn start(&self) -> Result<()> {
        self.log.push(format!("start:{}", self.label));
        if self.fail_start {
            bail!("{} refused to start", self.label);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.stop_delay.is_zero() {
            tokio::time::sleep(self.stop_delay).await;
        }
        self.log.push(format!("stop:{}", self.label));
        if self.fail_stop {
            bail!("{} refused to stop", self.label);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Factory producing `per_job` recording services labelled `<job id>#<n>`
pub fn recording_factory(
    log: EventLog,
    per_job: usize,
) -> impl Fn(&dyn JobSpec) -> Result<Vec<Arc<dyn JobService>>> + Send + Sync + 'static {
    move |spec: &dyn JobSpec| {
        let id = spec
            .job_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "nil".to_string());

        Ok((0..per_job)
            .map(|n| {
                Arc::new(RecordingService::new(format!("{}#{}", id, n), log.clone()))
                    as Arc<dyn JobService>
            })
            .collect())
    }
}

/// Factory producing services with a stop delay, for teardown timing tests
pub fn slow_stop_factory(
    log: EventLog,
    delay: Duration,
) -> impl Fn(&dyn JobSpec) -> Result<Vec<Arc<dyn JobService>>> + Send + Sync + 'static {
    move |spec: &dyn JobSpec| {
        let id = spec
            .job_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "nil".to_string());

        Ok(vec![Arc::new(
            RecordingService::new(format!("{}#0", id), log.clone()).with_stop_delay(delay),
        ) as Arc<dyn JobService>])
    }
}

/// Collects formatted log output of the current thread
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Routes this thread's tracing events into the capture until the guard
    /// is dropped. Tasks spawned on a current-thread runtime are included.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
