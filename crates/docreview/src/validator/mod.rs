//! Rule-based checklist compliance.
//!
//! `validate` is a pure function of the checklist snapshot. Missing items are
//! always emitted in rule order: agency invoice, approved quotation, job order,
//! performance proof.

pub mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checklist::{Checklist, JobStatus};

pub use rules::MissingItem;

/// Initial review outcome written when nothing is missing.
pub const COMPLIANT_OUTCOME: &str = "All required documents are present and compliant.";

type Rule = fn(&Checklist) -> Vec<MissingItem>;

/// Rules in user-visible order.
const RULES: &[(&str, Rule)] = &[
    ("agency_invoice", rules::agency_invoice),
    ("approved_quotation", rules::approved_quotation),
    ("job_order", rules::job_order),
    ("timesheet", rules::always_satisfied),
    ("third_party", rules::always_satisfied),
    ("performance_proof", rules::performance_proof),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewOutcome {
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Not Approved")]
    NotApproved,
}

impl ReviewOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewOutcome::Approved => "Approved",
            ReviewOutcome::NotApproved => "Not Approved",
        }
    }

    pub fn job_status(&self) -> JobStatus {
        match self {
            ReviewOutcome::Approved => JobStatus::Compliant,
            ReviewOutcome::NotApproved => JobStatus::NotCompliant,
        }
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_compliant: bool,
    pub missing_items: Vec<String>,
    pub initial_review_outcome: String,
    pub final_review_outcome: ReviewOutcome,
}

/// Checks the checklist against the fixed cardinality rules.
pub fn validate(checklist: &Checklist) -> ValidationResult {
    let missing: Vec<MissingItem> = RULES
        .iter()
        .flat_map(|(name, rule)| {
            let items = rule(checklist);
            if !items.is_empty() {
                tracing::debug!(rule = *name, missing = items.len(), "Checklist rule not met");
            }
            items
        })
        .collect();

    let missing_items: Vec<String> = missing.iter().map(ToString::to_string).collect();
    let is_compliant = missing_items.is_empty();

    let (initial_review_outcome, final_review_outcome) = if is_compliant {
        (COMPLIANT_OUTCOME.to_string(), ReviewOutcome::Approved)
    } else {
        (missing_items.join("; "), ReviewOutcome::NotApproved)
    };

    ValidationResult {
        is_compliant,
        missing_items,
        initial_review_outcome,
        final_review_outcome,
    }
}
