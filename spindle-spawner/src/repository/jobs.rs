//! Jobs repository

use anyhow::Result;
use async_trait::async_trait;
use spindle_core::{JobErrorRecord, JobSpec};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Persistence operations the spawner depends on
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Invokes `visit` for every persisted specification, stopping early when
    /// it returns `false`.
    ///
    /// `None` is passed for a stored entry that could not be materialized;
    /// the caller decides how to treat it.
    async fn for_each_job(
        &self,
        visit: &mut (dyn FnMut(Option<Arc<dyn JobSpec>>) -> bool + Send),
    ) -> Result<()>;

    /// Records an error annotation against `spec`
    async fn record_job_error(&self, spec: &dyn JobSpec, description: &str) -> Result<()>;
}

/// In-memory implementation of JobStore
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<Vec<Option<Arc<dyn JobSpec>>>>,
    errors: Mutex<Vec<JobErrorRecord>>,
}

impl InMemoryJobStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists a specification
    pub fn insert(&self, spec: Arc<dyn JobSpec>) {
        self.insert_raw(Some(spec));
    }

    /// Persists a possibly missing entry, as a corrupted row would surface
    pub fn insert_raw(&self, spec: Option<Arc<dyn JobSpec>>) {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(spec);
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Error annotations recorded so far
    pub fn errors(&self) -> Vec<JobErrorRecord> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn for_each_job(
        &self,
        visit: &mut (dyn FnMut(Option<Arc<dyn JobSpec>>) -> bool + Send),
    ) -> Result<()> {
        let snapshot = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for spec in snapshot {
            if !visit(spec) {
                break;
            }
        }

        Ok(())
    }

    async fn record_job_error(&self, spec: &dyn JobSpec, description: &str) -> Result<()> {
        let record = JobErrorRecord::new(spec, description);
        debug!("Recording error for {} job {:?}: {}", record.job_type, record.job_id, description);
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_core::JobDefinition;

    #[tokio::test]
    async fn test_for_each_job_visits_in_insertion_order() {
        let store = InMemoryJobStore::new();
        let first = JobDefinition::new("echo");
        let second = JobDefinition::new("heartbeat");
        store.insert(Arc::new(first.clone()));
        store.insert_raw(None);
        store.insert(Arc::new(second.clone()));

        let mut seen = Vec::new();
        store
            .for_each_job(&mut |spec| {
                seen.push(spec.map(|s| s.job_type().to_string()));
                true
            })
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![Some("echo".to_string()), None, Some("heartbeat".to_string())]
        );
    }

    #[tokio::test]
    async fn test_for_each_job_stops_when_visitor_returns_false() {
        let store = InMemoryJobStore::new();
        for _ in 0..5 {
            store.insert(Arc::new(JobDefinition::new("echo")));
        }

        let mut visited = 0;
        store
            .for_each_job(&mut |_spec| {
                visited += 1;
                visited < 2
            })
            .await
            .unwrap();

        assert_eq!(visited, 2);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_record_job_error() {
        let store = InMemoryJobStore::new();
        let def = JobDefinition::new("echo").with_id(None);

        store.record_job_error(&def, "boom").await.unwrap();

        let errors = store.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].description, "boom");
        assert!(errors[0].job_id.is_none());
    }
}
