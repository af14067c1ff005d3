//! Reference facts provider
//!
//! Resolves a subject name (or rank) to the flat map of financial
//! facts carried through the research run. The ranked-company dataset
//! pipeline lives outside this crate; here we expose the narrow
//! contract plus a file/inline-backed implementation.

use crate::error::ResearchError;
use crate::models::Subject;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[async_trait]
pub trait FactsProvider: Send + Sync {
    /// Resolve a subject. Matching on name is case-insensitive; a rank,
    /// when given, takes precedence.
    async fn resolve(&self, name: &str, rank: Option<u32>) -> Result<Subject>;
}

#[derive(Debug, Clone, Deserialize)]
struct FactsRecord {
    name: String,
    rank: Option<u32>,
    #[serde(default)]
    facts: BTreeMap<String, String>,
}

/// Facts provider backed by a static in-memory table, optionally
/// loaded from a JSON file of `[{name, rank, facts}]` records.
pub struct StaticFactsProvider {
    records: Vec<FactsRecord>,
}

impl StaticFactsProvider {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<FactsRecord> = serde_json::from_str(&raw)?;
        info!(
            count = records.len(),
            file = %path.as_ref().display(),
            "Loaded reference facts"
        );
        Ok(Self { records })
    }
}

impl Default for StaticFactsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactsProvider for StaticFactsProvider {
    async fn resolve(&self, name: &str, rank: Option<u32>) -> Result<Subject> {
        if let Some(rank) = rank {
            if let Some(record) = self.records.iter().find(|r| r.rank == Some(rank)) {
                return Ok(Subject {
                    name: record.name.clone(),
                    rank: record.rank,
                    facts: record.facts.clone(),
                });
            }
        }

        let lowered = name.to_lowercase();
        let record = self
            .records
            .iter()
            .find(|r| r.name.to_lowercase() == lowered)
            .or_else(|| {
                self.records
                    .iter()
                    .find(|r| r.name.to_lowercase().contains(&lowered) && !lowered.is_empty())
            });

        match record {
            Some(r) => Ok(Subject {
                name: r.name.clone(),
                rank: r.rank,
                facts: r.facts.clone(),
            }),
            // Unknown subjects are still researchable; they just carry
            // no reference facts into synthesis.
            None if !name.trim().is_empty() => Ok(Subject {
                name: name.trim().to_string(),
                rank,
                facts: BTreeMap::new(),
            }),
            None => Err(ResearchError::InvalidSubject(
                "subject name is empty".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> StaticFactsProvider {
        let records = serde_json::json!([
            {"name": "Acme Industries", "rank": 1, "facts": {"pe_ratio": "18.2", "roce": "22.5"}},
            {"name": "Globex Corp", "rank": 2, "facts": {"pe_ratio": "31.0"}}
        ]);
        StaticFactsProvider {
            records: serde_json::from_value(records).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_resolve_by_rank() {
        let subject = provider().resolve("", Some(2)).await.unwrap();
        assert_eq!(subject.name, "Globex Corp");
    }

    #[tokio::test]
    async fn test_resolve_by_name_case_insensitive() {
        let subject = provider().resolve("acme industries", None).await.unwrap();
        assert_eq!(subject.rank, Some(1));
        assert_eq!(subject.facts.get("roce").unwrap(), "22.5");
    }

    #[tokio::test]
    async fn test_unknown_name_yields_bare_subject() {
        let subject = provider().resolve("Initech", None).await.unwrap();
        assert_eq!(subject.name, "Initech");
        assert!(subject.facts.is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let err = provider().resolve("   ", None).await.unwrap_err();
        assert!(matches!(err, ResearchError::InvalidSubject(_)));
    }
}
