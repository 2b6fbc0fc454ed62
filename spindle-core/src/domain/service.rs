//! Job service capability

use anyhow::Result;
use async_trait::async_trait;

/// A long-lived unit of work belonging to a job.
///
/// The spawner never inspects a service beyond this capability set. Each
/// call is made from the registry task, so a service sees `start` and `stop`
/// strictly one after the other.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Starts the service
    async fn start(&self) -> Result<()>;

    /// Stops the service
    async fn stop(&self) -> Result<()>;

    /// Human readable name used in log lines
    fn name(&self) -> &str {
        "service"
    }
}
