//! Research workflow orchestrator
//!
//! Linear five-stage state machine:
//! SelectingSubject → CollectingEvidence → Synthesizing → Validating → Persisting
//!
//! Each stage returns an explicit Result and the machine advances only
//! on success; any failure short-circuits into the job's terminal Error
//! state at the worker boundary. No stage is retried here.

use crate::collector::{sanitize_subject, EvidenceCollector};
use crate::error::ResearchError;
use crate::models::{JobResult, Recommendation, ResearchSummary, Subject};
use crate::progress::{emit, ProgressEvent, ProgressSender};
use crate::registry::CancelFlag;
use crate::report::save_report;
use crate::synthesis::Synthesizer;
use crate::taxonomy::{Category, TAXONOMY};
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Workflow stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SelectingSubject,
    CollectingEvidence,
    Synthesizing,
    Validating,
    Persisting,
}

pub const STAGE_COUNT: u32 = 5;

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::SelectingSubject => "SelectingSubject",
            Stage::CollectingEvidence => "CollectingEvidence",
            Stage::Synthesizing => "Synthesizing",
            Stage::Validating => "Validating",
            Stage::Persisting => "Persisting",
        }
    }

    pub fn step(&self) -> u32 {
        match self {
            Stage::SelectingSubject => 1,
            Stage::CollectingEvidence => 2,
            Stage::Synthesizing => 3,
            Stage::Validating => 4,
            Stage::Persisting => 5,
        }
    }

    fn message(&self, subject: &str) -> String {
        match self {
            Stage::SelectingSubject => format!("Selected: {}", subject),
            Stage::CollectingEvidence => "Gathering evidence from web sources...".to_string(),
            Stage::Synthesizing => "Generating analyst report from evidence...".to_string(),
            Stage::Validating => "Validating buy/avoid decision...".to_string(),
            Stage::Persisting => "Saving final report...".to_string(),
        }
    }
}

/// Drives one research job through all stages.
pub struct ResearchWorkflow {
    collector: EvidenceCollector,
    synthesizer: Arc<dyn Synthesizer>,
    taxonomy: Vec<Category>,
    reports_dir: PathBuf,
}

impl ResearchWorkflow {
    pub fn new(
        collector: EvidenceCollector,
        synthesizer: Arc<dyn Synthesizer>,
        reports_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            collector,
            synthesizer,
            taxonomy: TAXONOMY.clone(),
            reports_dir: reports_dir.into(),
        }
    }

    /// Replace the default taxonomy (tests, scoped runs).
    pub fn with_taxonomy(mut self, taxonomy: Vec<Category>) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    /// Run the full workflow for one subject.
    pub async fn run(
        &self,
        subject: &Subject,
        progress: Option<&ProgressSender>,
        cancel: &CancelFlag,
    ) -> Result<JobResult> {
        info!(subject = %subject.name, "Workflow starting");

        // === SelectingSubject ===
        self.enter(Stage::SelectingSubject, subject, progress, cancel)?;
        // Fail before any network work if the subject cannot produce
        // unambiguous artifact names.
        sanitize_subject(&subject.name)?;

        // === CollectingEvidence ===
        self.enter(Stage::CollectingEvidence, subject, progress, cancel)?;
        let summary = self
            .collector
            .collect(subject, &self.taxonomy, progress, cancel)
            .await?;

        // === Synthesizing ===
        self.enter(Stage::Synthesizing, subject, progress, cancel)?;
        let report = self.synthesize(subject, &summary).await?;

        // === Validating ===
        self.enter(Stage::Validating, subject, progress, cancel)?;
        let verdict = self.validate(subject, &summary, &report).await?;

        // === Persisting ===
        self.enter(Stage::Persisting, subject, progress, cancel)?;
        let report_path = save_report(&self.reports_dir, &subject.name, &report, &verdict)?;

        info!(
            subject = %subject.name,
            recommendation = %verdict.recommendation,
            report = %report_path.display(),
            "Workflow complete"
        );

        Ok(JobResult {
            report,
            verdict,
            report_path: report_path.display().to_string(),
        })
    }

    async fn synthesize(&self, subject: &Subject, summary: &ResearchSummary) -> Result<String> {
        if summary.is_empty() {
            return Err(ResearchError::MissingPrecondition(
                "no research data found to summarize".to_string(),
            ));
        }

        let report = self.synthesizer.synthesize(subject, summary).await?;
        if report.trim().is_empty() {
            return Err(ResearchError::SynthesisError(
                "synthesizer returned an empty report".to_string(),
            ));
        }

        debug!(chars = report.len(), "Report generated");
        Ok(report)
    }

    async fn validate(
        &self,
        subject: &Subject,
        summary: &ResearchSummary,
        report: &str,
    ) -> Result<crate::models::Verdict> {
        if report.trim().is_empty() {
            return Err(ResearchError::MissingPrecondition(
                "no report available to validate".to_string(),
            ));
        }

        let verdict = self.synthesizer.validate(subject, summary, report).await?;
        if verdict.recommendation == Recommendation::Error {
            return Err(ResearchError::ValidationError(format!(
                "validator reported failure: {}",
                if verdict.reasoning.is_empty() {
                    "unknown error"
                } else {
                    &verdict.reasoning
                }
            )));
        }

        debug!(recommendation = %verdict.recommendation, "Decision validated");
        Ok(verdict)
    }

    /// Announce a stage transition and honor pending cancellation.
    fn enter(
        &self,
        stage: Stage,
        subject: &Subject,
        progress: Option<&ProgressSender>,
        cancel: &CancelFlag,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ResearchError::Cancelled);
        }

        debug!(stage = stage.label(), step = stage.step(), "Entering stage");
        emit(
            progress,
            ProgressEvent::Stage {
                stage: stage.label().to_string(),
                step: stage.step(),
                total: STAGE_COUNT,
                message: stage.message(&subject.name),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{StubSearchProvider, FailingSearchProvider};
    use crate::synthesis::MockSynthesizer;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::tempdir;

    fn subject(name: &str) -> Subject {
        Subject {
            name: name.to_string(),
            rank: None,
            facts: BTreeMap::new(),
        }
    }

    fn small_taxonomy() -> Vec<Category> {
        vec![
            Category::new("alpha", &["first topic", "second topic"]),
            Category::new("beta", &["third topic", "fourth topic"]),
        ]
    }

    fn workflow(
        results_per_query: usize,
        recommendation: Recommendation,
        research_dir: &std::path::Path,
        reports_dir: &std::path::Path,
    ) -> ResearchWorkflow {
        let collector = EvidenceCollector::new(
            Arc::new(StubSearchProvider::new(results_per_query)),
            research_dir,
        )
        .with_category_pause(Duration::ZERO);

        ResearchWorkflow::new(
            collector,
            Arc::new(MockSynthesizer::new(recommendation)),
            reports_dir,
        )
        .with_taxonomy(small_taxonomy())
    }

    #[tokio::test]
    async fn test_happy_path_produces_result() {
        let research = tempdir().unwrap();
        let reports = tempdir().unwrap();
        let wf = workflow(3, Recommendation::Buy, research.path(), reports.path());

        let result = wf
            .run(&subject("Acme Industries"), None, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(result.verdict.recommendation, Recommendation::Buy);
        assert!(std::path::Path::new(&result.report_path).exists());
        assert!(result.report.contains("Acme Industries"));
    }

    #[tokio::test]
    async fn test_error_verdict_fails_before_persist_stage() {
        let research = tempdir().unwrap();
        let reports = tempdir().unwrap();
        let wf = workflow(3, Recommendation::Error, research.path(), reports.path());

        let err = wf
            .run(&subject("Acme"), None, &CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::ValidationError(_)));

        // Persist stage never ran: no report file was written.
        assert_eq!(std::fs::read_dir(reports.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_stage_events_have_increasing_steps() {
        let research = tempdir().unwrap();
        let reports = tempdir().unwrap();
        let wf = workflow(1, Recommendation::Avoid, research.path(), reports.path());

        let (tx, mut rx) = crate::progress::channel();
        wf.run(&subject("Acme"), Some(&tx), &CancelFlag::new())
            .await
            .unwrap();
        drop(tx);

        let mut steps = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::Stage { step, .. } = event {
                steps.push(step);
            }
        }
        assert_eq!(steps, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_failed_search_still_reaches_synthesis_with_bundles() {
        let research = tempdir().unwrap();
        let reports = tempdir().unwrap();

        let collector =
            EvidenceCollector::new(Arc::new(FailingSearchProvider), research.path())
                .with_category_pause(Duration::ZERO);
        let wf = ResearchWorkflow::new(
            collector,
            Arc::new(MockSynthesizer::new(Recommendation::Avoid)),
            reports.path(),
        )
        .with_taxonomy(small_taxonomy());

        // Empty evidence lists are still a non-empty summary: bundles
        // exist for every category, so synthesis runs.
        let result = wf
            .run(&subject("Acme"), None, &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(result.verdict.recommendation, Recommendation::Avoid);
    }

    #[tokio::test]
    async fn test_blank_subject_fails_fast() {
        let research = tempdir().unwrap();
        let reports = tempdir().unwrap();
        let wf = workflow(1, Recommendation::Buy, research.path(), reports.path());

        let err = wf
            .run(&subject("   "), None, &CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::InvalidSubject(_)));

        // Nothing was written anywhere.
        assert_eq!(std::fs::read_dir(research.path()).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(reports.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_yields_cancelled_error() {
        let research = tempdir().unwrap();
        let reports = tempdir().unwrap();
        let wf = workflow(1, Recommendation::Buy, research.path(), reports.path());

        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = wf.run(&subject("Acme"), None, &cancel).await.unwrap_err();
        assert!(matches!(err, ResearchError::Cancelled));
    }
}
