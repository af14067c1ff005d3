//! Evidence collector
//!
//! Walks the research taxonomy in declaration order, issues one search
//! per subtopic, normalizes hits into evidence records and persists one
//! bundle file per category plus a run summary. A failed search is
//! local to its subtopic: it is recorded and collection continues.

use crate::classifier::{extract_domain, SourceClassifier};
use crate::error::ResearchError;
use crate::models::{CategoryBundle, EvidenceItem, ResearchSummary, Subject, SubtopicEvidence};
use crate::progress::{emit, ProgressEvent, ProgressSender};
use crate::registry::CancelFlag;
use crate::search::SearchProvider;
use crate::taxonomy::Category;
use crate::Result;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Word budget for the human-readable excerpt of each evidence item.
const EXCERPT_MAX_WORDS: usize = 100;
/// Character cap on the raw snippet retained for synthesis.
const RAW_CONTENT_MAX_CHARS: usize = 2000;
/// Results requested per subtopic search.
const MAX_RESULTS_PER_QUERY: usize = 10;
/// Pause after each completed category, to respect provider rate limits.
const CATEGORY_PAUSE: Duration = Duration::from_secs(1);

#[derive(Serialize)]
struct RunSummaryFile<'a> {
    company_name: &'a str,
    research_date: &'a str,
    financial_data: &'a BTreeMap<String, String>,
    categories_completed: usize,
    category_files: &'a BTreeMap<String, String>,
    content_hash: String,
}

pub struct EvidenceCollector {
    provider: Arc<dyn SearchProvider>,
    output_dir: PathBuf,
    category_pause: Duration,
}

impl EvidenceCollector {
    pub fn new(provider: Arc<dyn SearchProvider>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            output_dir: output_dir.into(),
            category_pause: CATEGORY_PAUSE,
        }
    }

    /// Shorten the inter-category pause, for tests and dev runs.
    pub fn with_category_pause(mut self, pause: Duration) -> Self {
        self.category_pause = pause;
        self
    }

    /// Gather evidence for every category of the taxonomy, in order.
    ///
    /// Each completed category is persisted immediately, so work done
    /// before a fatal error is never lost. Returns the assembled
    /// summary for downstream synthesis.
    pub async fn collect(
        &self,
        subject: &Subject,
        taxonomy: &[Category],
        progress: Option<&ProgressSender>,
        cancel: &CancelFlag,
    ) -> Result<ResearchSummary> {
        let retrieval_date = Utc::now().format("%Y-%m-%d").to_string();

        info!(
            subject = %subject.name,
            categories = taxonomy.len(),
            "Starting evidence collection"
        );

        let mut summary = ResearchSummary::default();
        let mut category_files: BTreeMap<String, String> = BTreeMap::new();

        for (cat_idx, category) in taxonomy.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ResearchError::Cancelled);
            }

            emit(
                progress,
                ProgressEvent::CategoryStarted {
                    category: category.name.clone(),
                    category_number: cat_idx + 1,
                    total_categories: taxonomy.len(),
                    total_subtopics: category.subtopics.len(),
                    message: format!(
                        "Processing category {}/{}: {}",
                        cat_idx + 1,
                        taxonomy.len(),
                        display_name(&category.name)
                    ),
                },
            );

            let bundle = self
                .search_category(subject, category, &retrieval_date, progress, cancel)
                .await?;

            let path = self.save_bundle(&bundle)?;
            category_files.insert(category.name.clone(), path.display().to_string());
            summary.categories.push(bundle);

            tokio::time::sleep(self.category_pause).await;
        }

        let summary_path =
            self.save_run_summary(subject, &retrieval_date, &category_files)?;

        info!(
            subject = %subject.name,
            categories_completed = summary.categories.len(),
            summary_file = %summary_path.display(),
            "Evidence collection complete"
        );

        Ok(summary)
    }

    /// Search all subtopics of one category. Provider failures are
    /// recorded per subtopic and never abort the category.
    async fn search_category(
        &self,
        subject: &Subject,
        category: &Category,
        retrieval_date: &str,
        progress: Option<&ProgressSender>,
        cancel: &CancelFlag,
    ) -> Result<CategoryBundle> {
        let mut subtopics = Vec::with_capacity(category.subtopics.len());

        for (idx, subtopic) in category.subtopics.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ResearchError::Cancelled);
            }

            emit(
                progress,
                ProgressEvent::SubtopicStarted {
                    category: category.name.clone(),
                    subtopic: subtopic.clone(),
                    subtopic_number: idx + 1,
                    total_subtopics: category.subtopics.len(),
                    message: format!("Searching: {}", subtopic),
                },
            );

            // No query expansion beyond prefixing the subject name.
            let query = format!("{} {}", subject.name, subtopic);

            match self.provider.search(&query, MAX_RESULTS_PER_QUERY).await {
                Ok(results) => {
                    let evidence: Vec<EvidenceItem> = results
                        .into_iter()
                        .map(|r| EvidenceItem {
                            source_domain: extract_domain(&r.url),
                            confidence: SourceClassifier::classify(&r.url),
                            excerpt: truncate_excerpt(&r.content, EXCERPT_MAX_WORDS),
                            raw_content: r.content.chars().take(RAW_CONTENT_MAX_CHARS).collect(),
                            retrieval_date: retrieval_date.to_string(),
                            url: r.url,
                            title: r.title,
                        })
                        .collect();

                    emit(
                        progress,
                        ProgressEvent::SubtopicCompleted {
                            category: category.name.clone(),
                            subtopic: subtopic.clone(),
                            subtopic_number: idx + 1,
                            total_subtopics: category.subtopics.len(),
                            results_found: evidence.len(),
                            message: format!(
                                "Found {} results for: {}",
                                evidence.len(),
                                subtopic
                            ),
                        },
                    );

                    subtopics.push(SubtopicEvidence {
                        subtopic: subtopic.clone(),
                        query,
                        results_count: evidence.len(),
                        evidence,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(
                        category = %category.name,
                        subtopic = %subtopic,
                        error = %e,
                        "Subtopic search failed, continuing"
                    );

                    emit(
                        progress,
                        ProgressEvent::SubtopicFailed {
                            category: category.name.clone(),
                            subtopic: subtopic.clone(),
                            error: e.to_string(),
                            message: format!("Error searching {}: {}", subtopic, e),
                        },
                    );

                    subtopics.push(SubtopicEvidence {
                        subtopic: subtopic.clone(),
                        query,
                        results_count: 0,
                        evidence: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(CategoryBundle {
            category: category.name.clone(),
            company_name: subject.name.clone(),
            retrieval_date: retrieval_date.to_string(),
            financial_data_provided: subject.facts.clone(),
            subtopics,
        })
    }

    /// Persist one category bundle as JSON. Fails fast on a subject
    /// name that would produce an ambiguous file name.
    pub fn save_bundle(&self, bundle: &CategoryBundle) -> Result<PathBuf> {
        let safe_name = sanitize_subject(&bundle.company_name)?;

        std::fs::create_dir_all(&self.output_dir)?;
        let filename = format!(
            "{}_{}_{}.json",
            bundle.category, safe_name, bundle.retrieval_date
        );
        let path = self.output_dir.join(filename);

        std::fs::write(&path, serde_json::to_string_pretty(bundle)?)?;
        Ok(path)
    }

    /// Persist the run summary referencing all category files, with a
    /// content hash for integrity checks on reload.
    fn save_run_summary(
        &self,
        subject: &Subject,
        retrieval_date: &str,
        category_files: &BTreeMap<String, String>,
    ) -> Result<PathBuf> {
        let safe_name = sanitize_subject(&subject.name)?;

        let summary = RunSummaryFile {
            company_name: &subject.name,
            research_date: retrieval_date,
            financial_data: &subject.facts,
            categories_completed: category_files.len(),
            category_files,
            content_hash: content_hash(category_files),
        };

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("summary_{}_{}.json", safe_name, retrieval_date));

        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        Ok(path)
    }
}

/// Reduce a subject name to a deterministic file-name token: keep
/// alphanumerics, spaces, dashes and underscores, then replace spaces
/// with underscores. Re-running the same subject on the same day maps
/// to the same file names.
pub fn sanitize_subject(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(ResearchError::InvalidSubject(
            "subject name is empty, cannot derive file names".to_string(),
        ));
    }

    let safe: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_");

    if safe.is_empty() {
        return Err(ResearchError::InvalidSubject(format!(
            "subject name '{}' sanitizes to an empty token",
            name
        )));
    }

    Ok(safe)
}

/// Truncate to a word budget, appending an ellipsis marker if cut.
pub fn truncate_excerpt(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    format!("{}...", words[..max_words].join(" "))
}

fn content_hash(category_files: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (category, path) in category_files {
        hasher.update(category.as_bytes());
        hasher.update(b"\0");
        hasher.update(path.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

fn display_name(category: &str) -> String {
    category.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{FailingSearchProvider, StubSearchProvider};
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

    #[test]
    fn test_truncate_excerpt() {
        let short = "only four words here";
        assert_eq!(truncate_excerpt(short, 100), short);

        let long: String = vec!["word"; 150].join(" ");
        let truncated = truncate_excerpt(&long, 100);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.split_whitespace().count(), 100);
    }

    #[test]
    fn test_sanitize_subject() {
        assert_eq!(sanitize_subject("Acme Industries").unwrap(), "Acme_Industries");
        assert_eq!(sanitize_subject("A&B Corp.").unwrap(), "AB_Corp");
        assert!(sanitize_subject("").is_err());
        assert!(sanitize_subject("   ").is_err());
        assert!(sanitize_subject("!!!").is_err());
    }

    #[tokio::test]
    async fn test_collect_two_by_two_with_stub_provider() {
        let dir = tempdir().unwrap();
        let collector =
            EvidenceCollector::new(Arc::new(StubSearchProvider::new(3)), dir.path())
                .with_category_pause(Duration::ZERO);

        let summary = collector
            .collect(
                &subject("Acme Industries"),
                &small_taxonomy(),
                None,
                &CancelFlag::new(),
            )
            .await
            .unwrap();

        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].category, "alpha");
        assert_eq!(summary.categories[1].category, "beta");

        for bundle in &summary.categories {
            assert_eq!(bundle.subtopics.len(), 2);
            for sub in &bundle.subtopics {
                assert_eq!(sub.results_count, 3);
                assert_eq!(sub.evidence.len(), 3);
                assert!(sub.error.is_none());
                assert!(sub.query.starts_with("Acme Industries "));
            }
        }

        // Declared subtopic order is preserved.
        assert_eq!(summary.categories[0].subtopics[0].subtopic, "first topic");
        assert_eq!(summary.categories[0].subtopics[1].subtopic, "second topic");

        // One bundle file per category plus the run summary.
        let date = Utc::now().format("%Y-%m-%d").to_string();
        for name in ["alpha", "beta"] {
            let path = dir
                .path()
                .join(format!("{}_Acme_Industries_{}.json", name, date));
            assert!(path.exists(), "missing {}", path.display());
        }
        assert!(dir
            .path()
            .join(format!("summary_Acme_Industries_{}.json", date))
            .exists());
    }

    #[tokio::test]
    async fn test_provider_failure_is_local_and_bundle_still_persisted() {
        let dir = tempdir().unwrap();
        let collector = EvidenceCollector::new(Arc::new(FailingSearchProvider), dir.path())
            .with_category_pause(Duration::ZERO);

        let taxonomy = vec![Category::new("alpha", &["first topic", "second topic"])];
        let summary = collector
            .collect(&subject("Acme"), &taxonomy, None, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(summary.categories.len(), 1);
        for sub in &summary.categories[0].subtopics {
            assert_eq!(sub.results_count, 0);
            assert!(sub.evidence.is_empty());
            assert!(sub.error.is_some());
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        assert!(dir.path().join(format!("alpha_Acme_{}.json", date)).exists());
    }

    #[tokio::test]
    async fn test_blank_subject_fails_persistence_without_writing() {
        let dir = tempdir().unwrap();
        let collector = EvidenceCollector::new(Arc::new(StubSearchProvider::new(1)), dir.path())
            .with_category_pause(Duration::ZERO);

        let bundle = CategoryBundle {
            category: "alpha".into(),
            company_name: "   ".into(),
            retrieval_date: "2026-08-30".into(),
            financial_data_provided: BTreeMap::new(),
            subtopics: Vec::new(),
        };

        let err = collector.save_bundle(&bundle).unwrap_err();
        assert!(matches!(err, ResearchError::InvalidSubject(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_collection() {
        let dir = tempdir().unwrap();
        let collector = EvidenceCollector::new(Arc::new(StubSearchProvider::new(1)), dir.path())
            .with_category_pause(Duration::ZERO);

        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = collector
            .collect(&subject("Acme"), &small_taxonomy(), None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::Cancelled));
    }

    #[tokio::test]
    async fn test_progress_events_are_emitted_in_order() {
        let dir = tempdir().unwrap();
        let collector = EvidenceCollector::new(Arc::new(StubSearchProvider::new(2)), dir.path())
            .with_category_pause(Duration::ZERO);

        let (tx, mut rx) = crate::progress::channel();
        collector
            .collect(
                &subject("Acme"),
                &small_taxonomy(),
                Some(&tx),
                &CancelFlag::new(),
            )
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        // 2 categories × (1 start + 2 × (started + completed)) = 10 events.
        assert_eq!(events.len(), 10);
        assert!(matches!(events[0], ProgressEvent::CategoryStarted { .. }));
        assert!(matches!(events[1], ProgressEvent::SubtopicStarted { .. }));
        assert!(matches!(events[2], ProgressEvent::SubtopicCompleted { .. }));
    }
}
