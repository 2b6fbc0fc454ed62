//! Error types for the spawner

use spindle_core::JobId;
use thiserror::Error;

/// Result type alias for spawner operations
pub type Result<T> = std::result::Result<T, SpawnerError>;

/// Errors raised by the spawner and its registry
#[derive(Debug, Error)]
pub enum SpawnerError {
    /// Specification has no job id
    #[error("job specification has no id")]
    InvalidSpec,

    /// No factory is registered for the job type
    #[error("unknown job type '{0}'")]
    UnknownJobType(String),

    /// The factory rejected the specification
    #[error("factory for job type '{job_type}' failed: {source:#}")]
    FactoryFailed {
        job_type: String,
        #[source]
        source: anyhow::Error,
    },

    /// Add for a job that is already registered
    #[error("job '{0}' has already been added")]
    DuplicateJob(JobId),

    /// Remove for a job that is not registered
    #[error("job '{0}' is missing")]
    MissingJob(JobId),

    /// The registry task is not accepting commands anymore
    #[error("job registry is not running")]
    RegistryClosed,

    /// `start` was called more than once
    #[error("spawner has already been started")]
    AlreadyStarted,

    /// Enumerating persisted jobs failed
    #[error("failed to load persisted jobs: {0:#}")]
    Store(#[source] anyhow::Error),
}

impl SpawnerError {
    /// Check if this error was caused by the caller's input
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSpec
                | Self::UnknownJobType(_)
                | Self::FactoryFailed { .. }
                | Self::DuplicateJob(_)
        )
    }
}
