//! Job checklist: the fixed set of document categories uploaded against a job.

pub mod document;
pub mod job;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use document::Document;
pub use job::{Job, JobStatus};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown checklist category '{0}'")]
pub struct InvalidCategory(pub String);

/// Closed set of checklist categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AgencyInvoice,
    ApprovedQuotation,
    JobOrder,
    Timesheet,
    ThirdParty,
    PerformanceProof,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::AgencyInvoice,
        Category::ApprovedQuotation,
        Category::JobOrder,
        Category::Timesheet,
        Category::ThirdParty,
        Category::PerformanceProof,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AgencyInvoice => "agency_invoice",
            Category::ApprovedQuotation => "approved_quotation",
            Category::JobOrder => "job_order",
            Category::Timesheet => "timesheet",
            Category::ThirdParty => "third_party",
            Category::PerformanceProof => "performance_proof",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = InvalidCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| InvalidCategory(s.to_string()))
    }
}

/// Documents uploaded per category, in upload order.
///
/// One field per category so a missing key cannot exist. Stored payloads that
/// omit a category deserialize it as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    #[serde(default)]
    pub agency_invoice: Vec<Document>,
    #[serde(default)]
    pub approved_quotation: Vec<Document>,
    #[serde(default)]
    pub job_order: Vec<Document>,
    #[serde(default)]
    pub timesheet: Vec<Document>,
    #[serde(default)]
    pub third_party: Vec<Document>,
    #[serde(default)]
    pub performance_proof: Vec<Document>,
}

impl Checklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self, category: Category) -> &[Document] {
        match category {
            Category::AgencyInvoice => &self.agency_invoice,
            Category::ApprovedQuotation => &self.approved_quotation,
            Category::JobOrder => &self.job_order,
            Category::Timesheet => &self.timesheet,
            Category::ThirdParty => &self.third_party,
            Category::PerformanceProof => &self.performance_proof,
        }
    }

    fn documents_mut(&mut self, category: Category) -> &mut Vec<Document> {
        match category {
            Category::AgencyInvoice => &mut self.agency_invoice,
            Category::ApprovedQuotation => &mut self.approved_quotation,
            Category::JobOrder => &mut self.job_order,
            Category::Timesheet => &mut self.timesheet,
            Category::ThirdParty => &mut self.third_party,
            Category::PerformanceProof => &mut self.performance_proof,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.documents(category).len()
    }

    /// Appends a document to the end of its category.
    pub fn add(&mut self, category: Category, document: Document) {
        self.documents_mut(category).push(document);
    }

    /// Removes the document at `index`, shifting later uploads down.
    pub fn remove(&mut self, category: Category, index: usize) -> Option<Document> {
        let docs = self.documents_mut(category);
        if index < docs.len() {
            Some(docs.remove(index))
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.documents(*c).is_empty())
    }
}
