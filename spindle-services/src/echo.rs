//! Echo job type
//!
//! A single service that logs when it is started and stopped. Useful for
//! smoke testing a deployment.

use anyhow::Result;
use async_trait::async_trait;
use spindle_core::{JobId, JobService, JobSpec};
use std::sync::Arc;
use tracing::info;

pub const JOB_TYPE: &str = "echo";

const DEFAULT_MESSAGE: &str = "echo";

/// Service that echoes a message on lifecycle transitions
pub struct EchoService {
    job_id: Option<JobId>,
    message: String,
}

impl EchoService {
    pub fn new(job_id: Option<JobId>, message: impl Into<String>) -> Self {
        Self {
            job_id,
            message: message.into(),
        }
    }
}

#[async_trait]
impl JobService for EchoService {
    async fn start(&self) -> Result<()> {
        info!(job_id = ?self.job_id, "started: {}", self.message);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        info!(job_id = ?self.job_id, "stopped: {}", self.message);
        Ok(())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Builds one echo service; the `message` parameter is optional
pub fn factory(spec: &dyn JobSpec) -> Result<Vec<Arc<dyn JobService>>> {
    let definition = super::as_definition(spec, JOB_TYPE)?;
    let message = definition
        .parameter_str("message")
        .unwrap_or(DEFAULT_MESSAGE);

    Ok(vec![
        Arc::new(EchoService::new(definition.id, message)) as Arc<dyn JobService>,
    ])
}
