//! Job runner
//!
//! Spawns one worker task per job, admitted through a bounded
//! semaphore so the number of concurrently running jobs never exceeds
//! the configured limit; excess jobs wait in the admission queue in
//! Created state. The runner also consumes the job's progress events
//! and folds them into the registry snapshot. Every fatal error is
//! caught at the worker boundary and becomes the job's terminal Error
//! state; the hosting process never crashes.

use crate::error::ResearchError;
use crate::models::{Job, JobError, JobStatus, Progress};
use crate::progress::{self, ProgressEvent};
use crate::registry::JobRegistry;
use crate::workflow::ResearchWorkflow;
use crate::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

#[derive(Clone)]
pub struct JobRunner {
    registry: JobRegistry,
    workflow: Arc<ResearchWorkflow>,
    admission: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(
        registry: JobRegistry,
        workflow: Arc<ResearchWorkflow>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            registry,
            workflow,
            admission: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Detach a worker for an already-registered job.
    pub async fn spawn(&self, job_id: Uuid) -> Result<()> {
        // Resolve everything up front so a bad id fails here, not
        // inside the detached task.
        let job = self.registry.get(job_id).await?;
        let cancel = self.registry.cancel_flag(job_id).await?;

        let (tx, mut rx) = progress::channel();

        // Progress consumer: owns snapshot updates for this job.
        let consumer_registry = self.registry.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let result = consumer_registry
                    .update(job_id, |job| apply_event(job, &event))
                    .await;
                if result.is_err() {
                    break;
                }
            }
        });

        let registry = self.registry.clone();
        let workflow = self.workflow.clone();
        let admission = self.admission.clone();
        let subject = job.subject.clone();

        tokio::spawn(async move {
            // Admission queue: job stays Created until a slot frees up.
            let _permit = match admission.acquire().await {
                Ok(permit) => permit,
                Err(_) => return, // semaphore closed, process shutting down
            };

            if cancel.is_cancelled() {
                let _ = registry
                    .finish(job_id, JobStatus::Cancelled, |_| {})
                    .await;
                return;
            }

            let _ = registry
                .update(job_id, |job| job.status = JobStatus::Running)
                .await;

            info!(job_id = %job_id, subject = %subject.name, "Worker started");

            match workflow.run(&subject, Some(&tx), &cancel).await {
                Ok(result) => {
                    let message = format!(
                        "Research completed successfully ({})",
                        result.verdict.recommendation
                    );
                    let _ = registry
                        .finish(job_id, JobStatus::Completed, |job| {
                            job.result = Some(result);
                            job.set_progress(Progress {
                                stage: "Completed".to_string(),
                                step: crate::workflow::STAGE_COUNT,
                                total: crate::workflow::STAGE_COUNT,
                                message,
                                detail: None,
                            });
                        })
                        .await;
                    info!(job_id = %job_id, "Worker finished");
                }
                Err(ResearchError::Cancelled) => {
                    let _ = registry
                        .finish(job_id, JobStatus::Cancelled, |job| {
                            let mut p = job.progress.clone();
                            p.stage = "Cancelled".to_string();
                            p.message = "Research cancelled by caller".to_string();
                            job.set_progress(p);
                        })
                        .await;
                    info!(job_id = %job_id, "Worker cancelled");
                }
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Worker failed");
                    let _ = registry
                        .finish(job_id, JobStatus::Error, |job| {
                            let mut p = job.progress.clone();
                            p.stage = "Error".to_string();
                            p.message = format!("Error: {}", e);
                            job.set_progress(p);
                            job.error = Some(JobError {
                                message: e.to_string(),
                                detail: Some(format!("{:?}", e)),
                            });
                        })
                        .await;
                }
            }
        });

        Ok(())
    }
}

/// Fold one progress event into the job's snapshot. Stage events
/// replace the snapshot; finer-grained events refresh message/detail
/// under the current stage.
fn apply_event(job: &mut Job, event: &ProgressEvent) {
    match event {
        ProgressEvent::Stage {
            stage,
            step,
            total,
            message,
        } => {
            job.set_progress(Progress {
                stage: stage.clone(),
                step: *step,
                total: *total,
                message: message.clone(),
                detail: None,
            });
        }
        other => {
            let mut progress = job.progress.clone();
            progress.message = other.message().to_string();
            progress.detail = serde_json::to_value(other).ok();
            job.set_progress(progress);
            if let ProgressEvent::SubtopicFailed { error, .. } = other {
                warn!(job_id = %job.id, error = %error, "Subtopic failure reported");
            }
        }
    }
}
