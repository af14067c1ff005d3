//! Progress event channel
//!
//! Workers publish fine-grained progress events on a per-job channel;
//! the runner consumes them and updates the externally visible job
//! snapshot in the registry. Emission is best-effort: a missing or
//! closed sink never affects collection correctness.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

pub fn channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// One fine-grained progress event emitted by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Workflow stage transition.
    Stage {
        stage: String,
        step: u32,
        total: u32,
        message: String,
    },
    /// A category is about to be processed.
    CategoryStarted {
        category: String,
        category_number: usize,
        total_categories: usize,
        total_subtopics: usize,
        message: String,
    },
    /// A subtopic search is about to run.
    SubtopicStarted {
        category: String,
        subtopic: String,
        subtopic_number: usize,
        total_subtopics: usize,
        message: String,
    },
    /// A subtopic search finished.
    SubtopicCompleted {
        category: String,
        subtopic: String,
        subtopic_number: usize,
        total_subtopics: usize,
        results_found: usize,
        message: String,
    },
    /// A subtopic search failed (recorded, non-fatal).
    SubtopicFailed {
        category: String,
        subtopic: String,
        error: String,
        message: String,
    },
}

impl ProgressEvent {
    pub fn message(&self) -> &str {
        match self {
            ProgressEvent::Stage { message, .. }
            | ProgressEvent::CategoryStarted { message, .. }
            | ProgressEvent::SubtopicStarted { message, .. }
            | ProgressEvent::SubtopicCompleted { message, .. }
            | ProgressEvent::SubtopicFailed { message, .. } => message,
        }
    }
}

/// Send an event if a sink is attached, ignoring a closed channel.
pub fn emit(sink: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = sink {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_with_no_sink_is_a_noop() {
        emit(
            None,
            ProgressEvent::Stage {
                stage: "CollectingEvidence".into(),
                step: 2,
                total: 5,
                message: "collecting".into(),
            },
        );
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut rx) = channel();
        for i in 1..=3 {
            emit(
                Some(&tx),
                ProgressEvent::SubtopicStarted {
                    category: "cat".into(),
                    subtopic: format!("sub {}", i),
                    subtopic_number: i,
                    total_subtopics: 3,
                    message: format!("Searching: sub {}", i),
                },
            );
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ProgressEvent::SubtopicStarted { subtopic_number, .. } = event {
                seen.push(subtopic_number);
            }
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
