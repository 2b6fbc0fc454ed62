//! Job domain types

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a job, used as the registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A job specification as seen by the spawner.
///
/// Only the identifier and the type tag are interpreted; everything else is
/// reserved for the factory registered under `job_type()`, which can reach
/// its concrete type through `as_any()`.
pub trait JobSpec: fmt::Debug + Send + Sync {
    /// Identifier of the job. `None` marks a specification that was persisted
    /// without one and cannot be scheduled.
    fn job_id(&self) -> Option<JobId>;

    /// Type tag used to select a factory
    fn job_type(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Generic, serializable job specification
///
/// Used by the in-memory store and by domain modules that only need a bag of
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: Option<JobId>,
    pub job_type: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl JobDefinition {
    /// Creates a definition with a fresh id and no parameters
    pub fn new(job_type: impl Into<String>) -> Self {
        Self {
            id: Some(JobId::new()),
            job_type: job_type.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: Option<JobId>) -> Self {
        self.id = id;
        self
    }

    /// Adds a parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Reads a parameter as an unsigned integer
    pub fn parameter_u64(&self, key: &str) -> Option<u64> {
        self.parameters.get(key).and_then(|v| v.as_u64())
    }

    /// Reads a parameter as a string
    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }
}

impl JobSpec for JobDefinition {
    fn job_id(&self) -> Option<JobId> {
        self.id
    }

    fn job_type(&self) -> &str {
        &self.job_type
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Error annotation persisted against a job specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobErrorRecord {
    pub job_id: Option<JobId>,
    pub job_type: String,
    pub description: String,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

impl JobErrorRecord {
    /// Creates a record for `spec`, timestamped now
    pub fn new(spec: &dyn JobSpec, description: impl Into<String>) -> Self {
        Self {
            job_id: spec.job_id(),
            job_type: spec.job_type().to_string(),
            description: description.into(),
            occurred_at: chrono::Utc::now(),
        }
    }
}
