use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::checklist::Job;
use crate::extraction::{
    BoundedExtractor, ExtractionError, FieldExtractor, HttpExtractionClient, InvoiceExtraction,
    MediaPlanExtraction, PoExtraction,
};
use crate::processor::DocumentContentExtractor;
use crate::review;
use crate::storage::FileBlobStore;
use crate::store::JobStore;
use crate::validator;

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter, ReviewPhase};

/// Runs validation, extraction and reconciliation for one job and saves the
/// resulting review.
pub struct ReviewPipeline {
    store: Arc<dyn JobStore>,
    fields: FieldExtractor,
}

impl ReviewPipeline {
    /// Production constructor: HTTP gateway client and upload-directory blobs.
    pub fn from_config(
        config: &PipelineConfig,
        store: Arc<dyn JobStore>,
    ) -> Result<Self, ExtractionError> {
        let client = HttpExtractionClient::new(
            &config.extraction_endpoint,
            &config.extraction_model,
            config.api_key.clone(),
            config.extraction_timeout,
        )?;
        let extractor = BoundedExtractor::new(Arc::new(client), config.extraction_timeout);
        let fields = FieldExtractor::new(
            extractor,
            Arc::new(FileBlobStore::new(&config.upload_directory)),
            Arc::new(DocumentContentExtractor::new()),
        )
        .with_max_prompt_chars(config.max_prompt_chars);

        Ok(Self::new(store, fields))
    }

    pub fn new(store: Arc<dyn JobStore>, fields: FieldExtractor) -> Self {
        Self { store, fields }
    }

    /// Runs the review for `job_id` and returns the updated job.
    ///
    /// Only a missing job or a store failure is an error. Extraction problems
    /// are recorded inside the review.
    pub async fn run(
        &self,
        job_id: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Job, PipelineError> {
        let span = info_span!("review_pipeline", job_id = %job_id);
        let result = self.run_steps(job_id, progress).instrument(span).await;
        if let Err(ref e) = result {
            progress.report(ProgressEvent::Failed {
                error: e.to_string(),
            });
        }
        result
    }

    async fn run_steps(
        &self,
        job_id: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Job, PipelineError> {
        // Step 1: Load job
        progress.report(ProgressEvent::Phase {
            phase: ReviewPhase::Loading,
            message: "Loading job...".to_string(),
        });
        let job = self.store.get(job_id).await?;
        let mut ctx = PipelineContext::new(job);

        // Step 2: Validate checklist
        {
            let _step = info_span!("validate").entered();
            progress.report(ProgressEvent::Phase {
                phase: ReviewPhase::Validating,
                message: "Checking checklist completeness...".to_string(),
            });
            self.step_validate(&mut ctx);
        }

        // Step 3: Extract fields per category
        progress.report(ProgressEvent::Phase {
            phase: ReviewPhase::Extracting,
            message: "Extracting invoice, job order and media plan fields...".to_string(),
        });
        self.step_extract(&mut ctx)
            .instrument(info_span!("extract"))
            .await;

        // Step 4: Reconcile
        {
            let _step = info_span!("reconcile").entered();
            progress.report(ProgressEvent::Phase {
                phase: ReviewPhase::Reconciling,
                message: "Building review...".to_string(),
            });
            self.step_reconcile(&mut ctx);
        }

        // Step 5: Persist
        progress.report(ProgressEvent::Phase {
            phase: ReviewPhase::Persisting,
            message: "Saving review...".to_string(),
        });
        let review = ctx.review.take().unwrap_or_default();
        let updated = self
            .store
            .replace_review(&ctx.job.id, review)
            .instrument(info_span!("persist"))
            .await?;

        info!(status = updated.status.as_str(), "Review saved");
        progress.report(ProgressEvent::Completed {
            status: updated.status,
        });
        Ok(updated)
    }

    fn step_validate(&self, ctx: &mut PipelineContext) {
        let result = validator::validate(&ctx.job.checklist);
        info!(
            compliant = result.is_compliant,
            missing = result.missing_items.len(),
            "Checklist validated"
        );
        ctx.validation = Some(result);
    }

    /// Fans the three categories out to separate tasks. A task that dies
    /// leaves a failure marker for its category only.
    async fn step_extract(&self, ctx: &mut PipelineContext) {
        let checklist = &ctx.job.checklist;

        let fields = self.fields.clone();
        let docs = checklist.agency_invoice.clone();
        let invoices =
            tokio::spawn(async move { fields.extract_invoices(&docs).await }.in_current_span());

        let fields = self.fields.clone();
        let docs = checklist.job_order.clone();
        let job_order =
            tokio::spawn(async move { fields.extract_job_order(&docs).await }.in_current_span());

        let fields = self.fields.clone();
        let docs = checklist.approved_quotation.clone();
        let media_plan =
            tokio::spawn(async move { fields.extract_media_plan(&docs).await }.in_current_span());

        let (invoices, job_order, media_plan) = tokio::join!(invoices, job_order, media_plan);

        ctx.invoices = Some(invoices.unwrap_or_else(|e| {
            warn!(error = %e, "Invoice extraction task failed");
            InvoiceExtraction::task_failed(format!("Invoice extraction task failed: {}", e))
        }));
        ctx.job_order = Some(job_order.unwrap_or_else(|e| {
            warn!(error = %e, "Job order extraction task failed");
            PoExtraction::failed(format!("Job order extraction task failed: {}", e))
        }));
        ctx.media_plan = Some(media_plan.unwrap_or_else(|e| {
            warn!(error = %e, "Media plan extraction task failed");
            MediaPlanExtraction::failed(format!("Media plan extraction task failed: {}", e))
        }));
    }

    fn step_reconcile(&self, ctx: &mut PipelineContext) {
        let validation = ctx
            .validation
            .take()
            .unwrap_or_else(|| validator::validate(&ctx.job.checklist));
        let invoices = ctx.invoices.take().unwrap_or_else(InvoiceExtraction::fallback);
        let job_order = ctx.job_order.take().unwrap_or_default();
        let media_plan = ctx.media_plan.take().unwrap_or_default();

        ctx.review = Some(review::reconcile(
            &validation,
            &invoices,
            &job_order,
            &media_plan,
        ));
    }
}
