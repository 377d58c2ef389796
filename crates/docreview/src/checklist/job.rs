use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Checklist;
use crate::review::Review;

/// Informational compliance tag on a job.
///
/// Only recomputed when a review is written; checklist edits leave it as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "Not Compliant")]
    NotCompliant,
    #[serde(rename = "Compliant")]
    Compliant,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotCompliant => "Not Compliant",
            JobStatus::Compliant => "Compliant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Not Compliant" => Some(JobStatus::NotCompliant),
            "Compliant" => Some(JobStatus::Compliant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub agency_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub checklist: Checklist,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a job with an empty checklist and no review.
    pub fn new(agency_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agency_id: agency_id.into(),
            title: title.into(),
            description: None,
            status: JobStatus::default(),
            checklist: Checklist::new(),
            review: None,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
        }
    }

    /// Replaces the review wholesale and derives the status from it.
    pub fn apply_review(&mut self, review: Review, at: DateTime<Utc>) {
        self.status = review.compliance_status();
        self.review = Some(review);
        self.reviewed_at = Some(at);
        self.updated_at = at;
    }
}
