//! Cardinality rules for the checklist categories.

use std::fmt;

use crate::checklist::{Category, Checklist};

/// A missing or incorrect checklist item.
///
/// Codes are fixed labels per rule outcome, not a running counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingItem {
    InvoiceTwentyPercent,
    InvoiceThirtyPercent,
    InvoiceFiftyPercent,
    QuotationMissing,
    QuotationIncomplete,
    JobOrderMissing,
    JobOrderDuplicated,
    PerformanceProofMissing,
}

impl MissingItem {
    pub fn code(&self) -> u8 {
        match self {
            MissingItem::InvoiceTwentyPercent => 1,
            MissingItem::InvoiceThirtyPercent => 2,
            MissingItem::InvoiceFiftyPercent => 3,
            MissingItem::QuotationMissing => 4,
            MissingItem::QuotationIncomplete => 5,
            MissingItem::JobOrderMissing => 6,
            MissingItem::JobOrderDuplicated => 7,
            MissingItem::PerformanceProofMissing => 8,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            MissingItem::InvoiceTwentyPercent => "Agency invoice for the 20% milestone is missing",
            MissingItem::InvoiceThirtyPercent => "Agency invoice for the 30% milestone is missing",
            MissingItem::InvoiceFiftyPercent => "Agency invoice for the 50% milestone is missing",
            MissingItem::QuotationMissing => {
                "Approved quotation and media plan are missing (2 documents required)"
            }
            MissingItem::QuotationIncomplete => {
                "Approved quotation is incomplete (2 documents required, 1 uploaded)"
            }
            MissingItem::JobOrderMissing => "Job order is missing",
            MissingItem::JobOrderDuplicated => {
                "More than one job order uploaded (exactly 1 required)"
            }
            MissingItem::PerformanceProofMissing => {
                "Performance proof is missing (at least 1 required)"
            }
        }
    }
}

impl fmt::Display for MissingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}- {}", self.code(), self.message())
    }
}

/// Expects three invoices, one per 20/30/50% tier. More than three passes.
pub(super) fn agency_invoice(checklist: &Checklist) -> Vec<MissingItem> {
    const TIERS: [MissingItem; 3] = [
        MissingItem::InvoiceTwentyPercent,
        MissingItem::InvoiceThirtyPercent,
        MissingItem::InvoiceFiftyPercent,
    ];

    let uploaded = checklist.count(Category::AgencyInvoice).min(TIERS.len());
    TIERS[uploaded..].to_vec()
}

/// Expects two documents: the quotation and its media plan.
pub(super) fn approved_quotation(checklist: &Checklist) -> Vec<MissingItem> {
    match checklist.count(Category::ApprovedQuotation) {
        0 => vec![MissingItem::QuotationMissing],
        1 => vec![MissingItem::QuotationIncomplete],
        _ => vec![],
    }
}

pub(super) fn job_order(checklist: &Checklist) -> Vec<MissingItem> {
    match checklist.count(Category::JobOrder) {
        0 => vec![MissingItem::JobOrderMissing],
        1 => vec![],
        _ => vec![MissingItem::JobOrderDuplicated],
    }
}

pub(super) fn performance_proof(checklist: &Checklist) -> Vec<MissingItem> {
    if checklist.count(Category::PerformanceProof) == 0 {
        vec![MissingItem::PerformanceProofMissing]
    } else {
        vec![]
    }
}

/// Timesheets and third-party documents are accepted whatever was uploaded.
/// Pending product sign-off before this is hardened.
pub(super) fn always_satisfied(_checklist: &Checklist) -> Vec<MissingItem> {
    vec![]
}
