//! Stock Research Orchestrator
//!
//! A long-running research engine for company deep-dives that:
//! - Registers jobs in an in-memory registry, polled over HTTP
//! - Walks a fixed taxonomy of research categories against web search
//! - Classifies every source by confidence before it enters the record
//! - Synthesizes and validates an analyst report via an LLM
//! - Persists evidence bundles, run summaries, and the final report
//!
//! JOB PIPELINE:
//! START → SELECT SUBJECT → COLLECT EVIDENCE → SYNTHESIZE → VALIDATE → PERSIST
//!
//! Jobs run on a bounded worker pool; callers poll status and fetch
//! results (or cancel) through the REST surface in `api`.

pub mod api;
pub mod classifier;
pub mod collector;
pub mod error;
pub mod facts;
pub mod models;
pub mod progress;
pub mod registry;
pub mod report;
pub mod runner;
pub mod search;
pub mod synthesis;
pub mod taxonomy;
pub mod workflow;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classifier::SourceClassifier;
