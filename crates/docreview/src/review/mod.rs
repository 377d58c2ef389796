//! The reconciled review record attached to a job.

mod reconciler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checklist::JobStatus;
use crate::validator::ReviewOutcome;

pub use reconciler::{derive_total, reconcile};

/// Flat review record. Replaced wholesale by the pipeline; fields that are
/// not automated yet stay `None` until edited by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    // Identifiers
    pub market_bu: Option<String>,
    pub agency_invoice_number: Option<String>,
    pub po_number: Option<String>,
    pub period_month: Option<String>,

    // Timeline
    pub date_invoice_sent_to_reviewer: Option<DateTime<Utc>>,
    pub date_reviewer_shared_feedback: Option<DateTime<Utc>>,
    pub date_agency_responded_to_feedback: Option<DateTime<Utc>>,
    pub date_reviewer_approved_invoice: Option<DateTime<Utc>>,

    // Campaign
    pub medium: Option<String>,
    pub campaign_name: Option<String>,

    // Financials
    pub net_media_cost: Option<f64>,
    pub agency_fee: Option<f64>,
    pub taxes: Option<f64>,
    pub other_third_party_cost: Option<f64>,
    pub agency_invoice_total_amount: Option<f64>,
    pub media_plan_total_amount: Option<f64>,
    pub po_amount_with_af: Option<f64>,

    // Narrative
    pub initial_review_outcome: Option<String>,
    pub agency_feedback_action: Option<String>,
    pub final_review_outcome: Option<ReviewOutcome>,
    pub status_of_received_invoices: Option<String>,

    pub month_reviewer_received_invoice: Option<String>,

    // Durations in days
    pub days_reviewer_to_share_feedback: Option<i64>,
    pub days_agency_to_revert: Option<i64>,
    pub days_reviewer_to_approve_after_revision: Option<i64>,

    // Verbatim extractor outputs, kept for audit
    pub raw_invoice_output: Option<Value>,
    pub raw_po_output: Option<Value>,
    pub raw_media_plan_output: Option<Value>,
}

impl Review {
    /// Job status implied by this review's final outcome.
    pub fn compliance_status(&self) -> JobStatus {
        match self.final_review_outcome {
            Some(outcome) => outcome.job_status(),
            None => JobStatus::NotCompliant,
        }
    }
}
