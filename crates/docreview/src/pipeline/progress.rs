use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::checklist::JobStatus;

/// Phase of a review run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPhase {
    Loading,
    Validating,
    Extracting,
    Reconciling,
    Persisting,
    Completed,
    Failed,
}

impl std::fmt::Display for ReviewPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewPhase::Loading => write!(f, "Loading job"),
            ReviewPhase::Validating => write!(f, "Validating checklist"),
            ReviewPhase::Extracting => write!(f, "Extracting fields"),
            ReviewPhase::Reconciling => write!(f, "Reconciling review"),
            ReviewPhase::Persisting => write!(f, "Saving review"),
            ReviewPhase::Completed => write!(f, "Completed"),
            ReviewPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Events emitted by the pipeline during a run.
pub enum ProgressEvent {
    Phase { phase: ReviewPhase, message: String },
    Completed { status: JobStatus },
    Failed { error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Broadcast payload for subscribers following a review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewProgressEvent {
    pub job_id: String,
    pub phase: ReviewPhase,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Job status after the review was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReviewProgressEvent {
    pub fn new(job_id: &str, phase: ReviewPhase, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            phase,
            message: message.to_string(),
            timestamp: Utc::now(),
            status: None,
            error: None,
        }
    }
}

/// Forwards pipeline events to a broadcast channel.
pub struct BroadcastProgress {
    job_id: String,
    sender: Arc<broadcast::Sender<ReviewProgressEvent>>,
}

impl BroadcastProgress {
    pub fn new(job_id: &str, sender: Arc<broadcast::Sender<ReviewProgressEvent>>) -> Self {
        Self {
            job_id: job_id.to_string(),
            sender,
        }
    }

    fn send(&self, event: ReviewProgressEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                self.send(ReviewProgressEvent::new(&self.job_id, phase, &message));
            }
            ProgressEvent::Completed { status } => {
                let mut event = ReviewProgressEvent::new(
                    &self.job_id,
                    ReviewPhase::Completed,
                    &format!("Review saved, job is {}", status.as_str()),
                );
                event.status = Some(status);
                self.send(event);
            }
            ProgressEvent::Failed { error } => {
                let mut event =
                    ReviewProgressEvent::new(&self.job_id, ReviewPhase::Failed, "Review failed");
                event.error = Some(error);
                self.send(event);
            }
        }
    }
}
