//! Spawner configuration
//!
//! Defines the tunables of the spawner: registry channel capacity, startup
//! parallelism and what to do when a job is added twice.

use std::fmt;
use std::str::FromStr;

/// What the registry does with an Add for a job that is already running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Log the duplicate and discard the new services (first writer wins)
    #[default]
    KeepExisting,
    /// Stop the running services, then start and register the new ones
    ReplaceExisting,
}

impl FromStr for DuplicatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep-existing" => Ok(Self::KeepExisting),
            "replace" | "replace-existing" => Ok(Self::ReplaceExisting),
            other => anyhow::bail!("unknown duplicate policy '{}'", other),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepExisting => write!(f, "keep-existing"),
            Self::ReplaceExisting => write!(f, "replace-existing"),
        }
    }
}

/// Spawner configuration
#[derive(Debug, Clone)]
pub struct SpawnerConfig {
    /// Capacity of the registry command channel. Senders wait when it is full.
    pub command_buffer: usize,

    /// Maximum number of jobs added concurrently while loading persisted jobs
    pub max_parallel_loads: usize,

    /// Policy for duplicate adds
    pub duplicate_policy: DuplicatePolicy,
}

impl SpawnerConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            command_buffer: 128,
            max_parallel_loads: 16,
            duplicate_policy: DuplicatePolicy::KeepExisting,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - SPINDLE_COMMAND_BUFFER (default: 128)
    /// - SPINDLE_MAX_PARALLEL_LOADS (default: 16)
    /// - SPINDLE_DUPLICATE_POLICY (`keep` or `replace`, default: keep)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::new();

        let command_buffer = match std::env::var("SPINDLE_COMMAND_BUFFER") {
            Ok(s) => s
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("invalid SPINDLE_COMMAND_BUFFER '{}': {}", s, e))?,
            Err(_) => defaults.command_buffer,
        };

        let max_parallel_loads = match std::env::var("SPINDLE_MAX_PARALLEL_LOADS") {
            Ok(s) => s.parse::<usize>().map_err(|e| {
                anyhow::anyhow!("invalid SPINDLE_MAX_PARALLEL_LOADS '{}': {}", s, e)
            })?,
            Err(_) => defaults.max_parallel_loads,
        };

        let duplicate_policy = match std::env::var("SPINDLE_DUPLICATE_POLICY") {
            Ok(s) => s.parse::<DuplicatePolicy>()?,
            Err(_) => defaults.duplicate_policy,
        };

        Ok(Self {
            command_buffer,
            max_parallel_loads,
            duplicate_policy,
        })
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_max_parallel_loads(mut self, max: usize) -> Self {
        self.max_parallel_loads = max;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.command_buffer == 0 {
            anyhow::bail!("command_buffer must be greater than 0");
        }

        if self.max_parallel_loads == 0 {
            anyhow::bail!("max_parallel_loads must be greater than 0");
        }

        Ok(())
    }
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self::new()
    }
}
