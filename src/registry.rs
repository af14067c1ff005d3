//! Job registry
//!
//! Process-wide store of research jobs. Owns job identity, status,
//! progress snapshot and terminal results. Jobs are kept for the
//! process lifetime; there is no eviction (bounded-deployment
//! assumption). The outer lock is held only for map lookup/insert,
//! so updates to different jobs never block each other; the per-job
//! lock makes each update atomic.

use crate::error::ResearchError;
use crate::models::{Job, JobStatus, Subject};
use crate::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Cooperative cancellation signal, checked at stage boundaries and
/// at each subtopic iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct JobEntry {
    job: Arc<RwLock<Job>>,
    cancel: CancelFlag,
}

/// Concurrent-safe job store, keyed by job id.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Arc<JobEntry>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job. The job is visible to `get` as soon as this
    /// returns.
    pub async fn create(&self, subject: Subject) -> Uuid {
        let job = Job::new(subject);
        let id = job.id;

        let entry = Arc::new(JobEntry {
            job: Arc::new(RwLock::new(job)),
            cancel: CancelFlag::new(),
        });

        let mut jobs = self.jobs.write().await;
        jobs.insert(id, entry);
        id
    }

    /// Snapshot of a job's current state.
    pub async fn get(&self, id: Uuid) -> Result<Job> {
        let entry = self.entry(id).await?;
        let job = entry.job.read().await;
        Ok(job.clone())
    }

    /// Apply an atomic in-place transformation to a stored job.
    ///
    /// Terminal jobs are left untouched so that late worker events can
    /// never resurrect a finished job or tear its snapshot.
    pub async fn update<F>(&self, id: Uuid, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut Job),
    {
        let entry = self.entry(id).await?;
        let mut job = entry.job.write().await;
        if job.is_terminal() {
            return Ok(());
        }
        mutator(&mut job);
        Ok(())
    }

    /// Move a job into a terminal state. Only the first terminal
    /// transition wins.
    pub async fn finish<F>(&self, id: Uuid, status: JobStatus, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut Job),
    {
        let entry = self.entry(id).await?;
        let mut job = entry.job.write().await;
        if job.is_terminal() {
            return Ok(());
        }
        mutator(&mut job);
        job.status = status;
        job.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Cancellation handle for a job's worker.
    pub async fn cancel_flag(&self, id: Uuid) -> Result<CancelFlag> {
        let entry = self.entry(id).await?;
        Ok(entry.cancel.clone())
    }

    /// Request cancellation of a running job.
    pub async fn request_cancel(&self, id: Uuid) -> Result<()> {
        let entry = self.entry(id).await?;
        entry.cancel.cancel();
        Ok(())
    }

    /// Diagnostic listing of all known jobs.
    pub async fn list(&self) -> Vec<Job> {
        let entries: Vec<Arc<JobEntry>> = {
            let jobs = self.jobs.read().await;
            jobs.values().cloned().collect()
        };

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(entry.job.read().await.clone());
        }
        out
    }

    async fn entry(&self, id: Uuid) -> Result<Arc<JobEntry>> {
        let jobs = self.jobs.read().await;
        jobs.get(&id)
            .cloned()
            .ok_or(ResearchError::JobNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobError, Progress};
    use std::collections::BTreeMap;

    fn subject(name: &str) -> Subject {
        Subject {
            name: name.to_string(),
            rank: None,
            facts: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let registry = JobRegistry::new();
        let id = registry.create(subject("Acme Industries")).await;

        let job = registry.get(id).await.unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.status, JobStatus::Created);
        assert_eq!(job.subject.name, "Acme Industries");
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let registry = JobRegistry::new();
        let err = registry.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ResearchError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_is_atomic_per_job() {
        let registry = JobRegistry::new();
        let id = registry.create(subject("Acme")).await;

        registry
            .update(id, |job| {
                job.status = JobStatus::Running;
                job.set_progress(Progress {
                    stage: "CollectingEvidence".into(),
                    step: 2,
                    total: 5,
                    message: "collecting".into(),
                    detail: None,
                });
            })
            .await
            .unwrap();

        let job = registry.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress.step, 2);
    }

    #[tokio::test]
    async fn test_terminal_state_is_absorbing() {
        let registry = JobRegistry::new();
        let id = registry.create(subject("Acme")).await;

        registry
            .finish(id, JobStatus::Error, |job| {
                job.error = Some(JobError {
                    message: "boom".into(),
                    detail: None,
                });
            })
            .await
            .unwrap();

        // A late update from the worker must be ignored.
        registry
            .update(id, |job| {
                job.status = JobStatus::Running;
                job.error = None;
            })
            .await
            .unwrap();

        let job = registry.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.is_some());
        assert!(job.result.is_none());
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_jobs_are_isolated() {
        let registry = JobRegistry::new();
        let a = registry.create(subject("Acme")).await;
        let b = registry.create(subject("Globex")).await;

        registry
            .update(a, |job| {
                job.set_progress(Progress {
                    stage: "CollectingEvidence".into(),
                    step: 2,
                    total: 5,
                    message: "acme progress".into(),
                    detail: None,
                });
            })
            .await
            .unwrap();

        let job_b = registry.get(b).await.unwrap();
        assert_eq!(job_b.progress.step, 0);
        assert_ne!(job_b.progress.message, "acme progress");
    }

    #[tokio::test]
    async fn test_cancel_flag_roundtrip() {
        let registry = JobRegistry::new();
        let id = registry.create(subject("Acme")).await;

        let flag = registry.cancel_flag(id).await.unwrap();
        assert!(!flag.is_cancelled());

        registry.request_cancel(id).await.unwrap();
        assert!(flag.is_cancelled());
    }
}
