//! Core data models for the research orchestrator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Running,
    Completed,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Avoid,
    Error,
}

//
// ================= Subject =================
//

/// The entity being researched: a company name plus the reference
/// financial facts supplied at job start. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub rank: Option<u32>,
    #[serde(default)]
    pub facts: BTreeMap<String, String>,
}

//
// ================= Job =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub subject: Subject,
    pub progress: Progress,
    pub error: Option<JobError>,
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Externally visible progress snapshot. Replaced as a whole on every
/// update; `step` never goes backwards within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub stage: String,
    pub step: u32,
    pub total: u32,
    pub message: String,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl Progress {
    pub fn initial() -> Self {
        Self {
            stage: "Created".to_string(),
            step: 0,
            total: 5,
            message: "Waiting to start".to_string(),
            detail: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub message: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub report: String,
    pub verdict: Verdict,
    pub report_path: String,
}

impl Job {
    pub fn new(subject: Subject) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Created,
            subject,
            progress: Progress::initial(),
            error: None,
            result: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Replace the progress snapshot, keeping `step` monotone.
    pub fn set_progress(&mut self, mut progress: Progress) {
        if progress.step < self.progress.step {
            progress.step = self.progress.step;
        }
        self.progress = progress;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }
}

//
// ================= Evidence =================
//

/// One normalized external search result. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub url: String,
    pub title: String,
    pub source_domain: String,
    pub retrieval_date: String,
    pub excerpt: String,
    pub confidence: Confidence,
    pub raw_content: String,
}

/// Everything gathered for one subtopic of one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtopicEvidence {
    pub subtopic: String,
    pub query: String,
    pub results_count: usize,
    pub evidence: Vec<EvidenceItem>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-category evidence bundle, persisted once per (job, category).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBundle {
    pub category: String,
    pub company_name: String,
    pub retrieval_date: String,
    pub financial_data_provided: BTreeMap<String, String>,
    pub subtopics: Vec<SubtopicEvidence>,
}

/// Full research output for one job, in taxonomy declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub categories: Vec<CategoryBundle>,
}

impl ResearchSummary {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&CategoryBundle> {
        self.categories.iter().find(|b| b.category == category)
    }

    /// Total evidence items across all categories and subtopics.
    pub fn evidence_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|b| b.subtopics.iter())
            .map(|s| s.evidence.len())
            .sum()
    }
}

//
// ================= Verdict =================
//

/// Structured buy/avoid decision from the validation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub recommendation: Recommendation,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub expected_return_3y: String,
    #[serde(default)]
    pub probability_40pct_return: String,
    #[serde(default)]
    pub key_drivers: Vec<String>,
    #[serde(default)]
    pub key_risks: Vec<String>,
    #[serde(default)]
    pub red_flags_found: Vec<String>,
    #[serde(default)]
    pub financial_concerns: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

//
// ================= Display =================
//

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Created => "created",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recommendation::Buy => "BUY",
            Recommendation::Avoid => "AVOID",
            Recommendation::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}
