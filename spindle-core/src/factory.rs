//! Factory registry
//!
//! Maps a job type tag to the factory that expands a specification into its
//! services. Domain modules fill the registry once during setup and hand it
//! to the spawner.

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::domain::job::JobSpec;
use crate::domain::service::JobService;

/// Builds the services of a job from its specification.
///
/// Factories only construct objects; the spawner decides when the services
/// are started. An empty vector is a valid answer.
pub type JobServiceFactory =
    Arc<dyn Fn(&dyn JobSpec) -> Result<Vec<Arc<dyn JobService>>> + Send + Sync>;

/// Registry for job service factories
#[derive(Default, Clone)]
pub struct FactoryRegistry {
    factories: HashMap<String, JobServiceFactory>,
}

impl FactoryRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `job_type`.
    ///
    /// A previous registration for the same type is replaced.
    pub fn register<F>(&mut self, job_type: impl Into<String>, factory: F)
    where
        F: Fn(&dyn JobSpec) -> Result<Vec<Arc<dyn JobService>>> + Send + Sync + 'static,
    {
        let job_type = job_type.into();
        if self
            .factories
            .insert(job_type.clone(), Arc::new(factory))
            .is_some()
        {
            warn!("Factory for job type '{}' was registered twice, keeping the latest", job_type);
        }
    }

    /// Looks up the factory for `job_type`
    pub fn get(&self, job_type: &str) -> Option<JobServiceFactory> {
        self.factories.get(job_type).cloned()
    }

    /// Returns the registered job types, sorted
    pub fn job_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobDefinition;
    use async_trait::async_trait;

    struct NoopService;

    #[async_trait]
    impl JobService for NoopService {
        async fn start(&self) -> Result<()> {
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lookup_unknown_type() {
        let registry = FactoryRegistry::new();
        assert!(registry.get("echo").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_and_invoke() {
        let mut registry = FactoryRegistry::new();
        registry.register("echo", |_spec| {
            Ok(vec![Arc::new(NoopService) as Arc<dyn JobService>])
        });

        let factory = registry.get("echo").unwrap();
        let services = factory(&JobDefinition::new("echo")).unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name(), "service");
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = FactoryRegistry::new();
        registry.register("echo", |_spec| Ok(Vec::new()));
        registry.register("echo", |_spec| {
            Ok(vec![
                Arc::new(NoopService) as Arc<dyn JobService>,
                Arc::new(NoopService) as Arc<dyn JobService>,
            ])
        });

        assert_eq!(registry.len(), 1);
        let factory = registry.get("echo").unwrap();
        assert_eq!(factory(&JobDefinition::new("echo")).unwrap().len(), 2);
    }

    #[test]
    fn test_job_types_sorted() {
        let mut registry = FactoryRegistry::new();
        registry.register("heartbeat", |_spec| Ok(Vec::new()));
        registry.register("echo", |_spec| Ok(Vec::new()));
        assert_eq!(registry.job_types(), vec!["echo", "heartbeat"]);
    }
}
