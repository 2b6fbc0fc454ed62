//! Spindle Services
//!
//! Reference job types. Each module exposes a `JOB_TYPE` tag and a factory;
//! `register_job_types` installs all of them into a factory registry during
//! setup.

pub mod echo;
pub mod heartbeat;

use anyhow::{Result, anyhow};
use spindle_core::{FactoryRegistry, JobDefinition, JobSpec};

/// Registers every job type provided by this crate
pub fn register_job_types(registry: &mut FactoryRegistry) {
    registry.register(echo::JOB_TYPE, echo::factory);
    registry.register(heartbeat::JOB_TYPE, heartbeat::factory);
}

/// Downcasts a specification to the generic definition used by these job types
fn as_definition<'a>(spec: &'a dyn JobSpec, expected: &str) -> Result<&'a JobDefinition> {
    spec.as_any()
        .downcast_ref::<JobDefinition>()
        .ok_or_else(|| anyhow!("expected a JobDefinition for job type '{}', got {:?}", expected, spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ForeignSpec;

    impl JobSpec for ForeignSpec {
        fn job_id(&self) -> Option<spindle_core::JobId> {
            None
        }

        fn job_type(&self) -> &str {
            echo::JOB_TYPE
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_register_job_types() {
        let mut registry = FactoryRegistry::new();
        register_job_types(&mut registry);
        assert_eq!(registry.job_types(), vec!["echo", "heartbeat"]);
    }

    #[test]
    fn test_factories_reject_foreign_specs() {
        let mut registry = FactoryRegistry::new();
        register_job_types(&mut registry);

        for job_type in registry.job_types() {
            let factory = registry.get(&job_type).unwrap();
            assert!(factory(&ForeignSpec).is_err());
        }
    }
}
