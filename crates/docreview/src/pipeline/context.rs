use crate::checklist::Job;
use crate::extraction::{InvoiceExtraction, MediaPlanExtraction, PoExtraction};
use crate::review::Review;
use crate::validator::ValidationResult;

pub struct PipelineContext {
    // Input
    pub job: Job,

    // Step 2 result
    pub validation: Option<ValidationResult>,

    // Step 3 results, one per category
    pub invoices: Option<InvoiceExtraction>,
    pub job_order: Option<PoExtraction>,
    pub media_plan: Option<MediaPlanExtraction>,

    // Step 4 result
    pub review: Option<Review>,
}

impl PipelineContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            validation: None,
            invoices: None,
            job_order: None,
            media_plan: None,
            review: None,
        }
    }
}
