//! Error types for the research orchestrator

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, ResearchError>;

#[derive(Error, Debug)]
pub enum ResearchError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
