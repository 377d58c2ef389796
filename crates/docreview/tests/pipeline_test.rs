//! End-to-end review runs over in-memory and SQLite job stores.

mod common;

use std::sync::Arc;

use tokio::sync::broadcast;

use common::{field_extractor, media_plan_workbook, ScriptedGateway};
use docreview::checklist::{Category, Document, Job, JobStatus};
use docreview::db::Database;
use docreview::pipeline::{BroadcastProgress, NoopProgress, ReviewPhase, ReviewPipeline};
use docreview::storage::{FileBlobStore, MemoryBlobStore};
use docreview::store::{JobStore, MemoryJobStore, SqliteJobStore};
use docreview::validator::ReviewOutcome;
use docreview::PipelineError;

/// Three tiered invoices, a plain quotation plus a media plan workbook, one
/// job order and a screenshot as performance proof.
fn complete_job(blobs: &MemoryBlobStore) -> Job {
    let mut job = Job::new("AG-7", "Spring Launch");
    let checklist = &mut job.checklist;

    for (n, (tier, amount)) in [("20%", 100), ("30%", 200), ("50%", 300)]
        .iter()
        .enumerate()
    {
        let reference = format!("jobs/inv-{}.txt", n + 1);
        blobs.insert(
            reference.clone(),
            format!("Agency invoice INV=INV-00{} AMOUNT={}", n + 1, amount),
        );
        checklist.add(
            Category::AgencyInvoice,
            Document::new(reference, format!("Invoice {}.txt", tier)),
        );
    }

    checklist.add(
        Category::ApprovedQuotation,
        Document::new("jobs/quote.pdf", "Signed Quotation.pdf"),
    );
    blobs.insert("jobs/mp.xlsx", media_plan_workbook(500.0, 50.0, 25.0));
    checklist.add(
        Category::ApprovedQuotation,
        Document::new("jobs/mp.xlsx", "Media Plan Actual.xlsx"),
    );

    blobs.insert("jobs/jo.txt", "Job order PO=PO-1 PO_AMOUNT=600");
    checklist.add(Category::JobOrder, Document::new("jobs/jo.txt", "JO.txt"));

    checklist.add(
        Category::PerformanceProof,
        Document::new("jobs/proof.png", "screenshot.png"),
    );

    job
}

#[tokio::test]
async fn test_complete_job_is_approved_with_invoice_total() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = Arc::new(MemoryJobStore::new());
    let job = complete_job(&blobs);
    let id = job.id.clone();
    store.insert(job).unwrap();

    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = ReviewPipeline::new(
        Arc::clone(&store) as Arc<dyn JobStore>,
        field_extractor(Arc::clone(&gateway), blobs),
    );

    let updated = pipeline.run(&id, &NoopProgress).await.unwrap();
    assert_eq!(updated.status, JobStatus::Compliant);
    assert!(updated.reviewed_at.is_some());

    let review = updated.review.clone().unwrap();
    assert_eq!(review.final_review_outcome, Some(ReviewOutcome::Approved));
    assert_eq!(
        review.initial_review_outcome.as_deref(),
        Some(docreview::validator::COMPLIANT_OUTCOME)
    );

    // Invoice total wins over the media plan components (500 + 50 + 25).
    assert_eq!(review.agency_invoice_total_amount, Some(600.0));
    assert_eq!(
        review.agency_invoice_number.as_deref(),
        Some("INV-001 - 20%, INV-002 - 30%, INV-003 - 50%")
    );
    assert_eq!(review.campaign_name.as_deref(), Some("Spring Launch"));

    assert_eq!(review.po_number.as_deref(), Some("PO-1"));
    assert_eq!(review.po_amount_with_af, Some(600.0));

    assert_eq!(review.net_media_cost, Some(500.0));
    assert_eq!(review.agency_fee, Some(50.0));
    assert_eq!(review.taxes, Some(25.0));
    assert_eq!(review.other_third_party_cost, Some(0.0));
    assert_eq!(review.market_bu.as_deref(), Some("MEA"));

    let raw_invoices = review.raw_invoice_output.unwrap();
    assert_eq!(raw_invoices["status"], "success");
    assert_eq!(raw_invoices["summary"]["total_amount"], 600.0);
    let raw_plan = review.raw_media_plan_output.unwrap();
    assert_eq!(raw_plan["selected_file"], "Media Plan Actual.xlsx");
    assert_eq!(raw_plan["selection"]["method"], "single");

    // A single media plan candidate never consults the classifier.
    assert_eq!(gateway.calls("media_plan_selection"), 0);
    assert_eq!(gateway.calls("agency_invoice"), 3);

    assert_eq!(store.get(&id).await.unwrap(), updated);
}

#[tokio::test]
async fn test_missing_job_is_reported_without_extraction() {
    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = ReviewPipeline::new(
        Arc::new(MemoryJobStore::new()),
        field_extractor(Arc::clone(&gateway), Arc::new(MemoryBlobStore::new())),
    );

    let (tx, mut rx) = broadcast::channel(16);
    let progress = BroadcastProgress::new("ghost", Arc::new(tx));
    let result = pipeline.run("ghost", &progress).await;

    assert!(matches!(result, Err(PipelineError::JobNotFound(_))));
    assert_eq!(gateway.calls("agency_invoice"), 0);
    assert_eq!(gateway.calls("job_order"), 0);

    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        phases.push(event.phase);
    }
    assert_eq!(phases, vec![ReviewPhase::Loading, ReviewPhase::Failed]);
}

#[tokio::test]
async fn test_progress_phases_in_order() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = Arc::new(MemoryJobStore::new());
    let job = complete_job(&blobs);
    let id = job.id.clone();
    store.insert(job).unwrap();

    let pipeline = ReviewPipeline::new(
        store,
        field_extractor(Arc::new(ScriptedGateway::new()), blobs),
    );
    let (tx, mut rx) = broadcast::channel(32);
    let progress = BroadcastProgress::new(&id, Arc::new(tx));
    pipeline.run(&id, &progress).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let phases: Vec<ReviewPhase> = events.iter().map(|e| e.phase).collect();
    assert_eq!(
        phases,
        vec![
            ReviewPhase::Loading,
            ReviewPhase::Validating,
            ReviewPhase::Extracting,
            ReviewPhase::Reconciling,
            ReviewPhase::Persisting,
            ReviewPhase::Completed,
        ]
    );
    assert_eq!(
        events.last().unwrap().status,
        Some(JobStatus::Compliant)
    );
}

#[tokio::test]
async fn test_panicking_category_does_not_sink_the_others() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = Arc::new(MemoryJobStore::new());
    let job = complete_job(&blobs);
    let id = job.id.clone();
    store.insert(job).unwrap();

    let pipeline = ReviewPipeline::new(
        store,
        field_extractor(Arc::new(ScriptedGateway::panicking_on("job_order")), blobs),
    );
    let updated = pipeline.run(&id, &NoopProgress).await.unwrap();
    let review = updated.review.unwrap();

    assert!(review.po_number.is_none());
    let raw_po = review.raw_po_output.unwrap();
    assert!(raw_po["error"]
        .as_str()
        .unwrap()
        .starts_with("Job order extraction task failed"));

    assert_eq!(review.agency_invoice_total_amount, Some(600.0));
    assert_eq!(review.net_media_cost, Some(500.0));
    // Checklist-only verdict is unaffected by extraction trouble.
    assert_eq!(updated.status, JobStatus::Compliant);
}

#[tokio::test]
async fn test_two_invoices_fall_back_and_total_is_derived() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = Arc::new(MemoryJobStore::new());
    let mut job = complete_job(&blobs);
    job.checklist.remove(Category::AgencyInvoice, 2);
    let id = job.id.clone();
    store.insert(job).unwrap();

    let gateway = Arc::new(ScriptedGateway::new());
    let pipeline = ReviewPipeline::new(store, field_extractor(Arc::clone(&gateway), blobs));
    let updated = pipeline.run(&id, &NoopProgress).await.unwrap();
    let review = updated.review.unwrap();

    assert_eq!(updated.status, JobStatus::NotCompliant);
    assert!(review
        .initial_review_outcome
        .as_deref()
        .unwrap()
        .starts_with("3- "));
    assert_eq!(review.raw_invoice_output.unwrap()["status"], "fallback");
    assert_eq!(gateway.calls("agency_invoice"), 0);

    // 500 + 50 + 25 + 0
    assert_eq!(review.agency_invoice_total_amount, Some(575.0));
    assert!(review.agency_invoice_number.is_none());
}

#[tokio::test]
async fn test_out_of_range_classification_picks_last_media_plan() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = Arc::new(MemoryJobStore::new());
    let mut job = complete_job(&blobs);
    blobs.insert("jobs/mp-final.xlsx", media_plan_workbook(800.0, 80.0, 40.0));
    job.checklist.add(
        Category::ApprovedQuotation,
        Document::new("jobs/mp-final.xlsx", "media-plan_final.xlsx"),
    );
    let id = job.id.clone();
    store.insert(job).unwrap();

    let gateway = Arc::new(ScriptedGateway::selecting(7));
    let pipeline = ReviewPipeline::new(store, field_extractor(Arc::clone(&gateway), blobs));
    let review = pipeline
        .run(&id, &NoopProgress)
        .await
        .unwrap()
        .review
        .unwrap();

    assert_eq!(gateway.calls("media_plan_selection"), 1);
    assert_eq!(review.net_media_cost, Some(800.0));
    let raw_plan = review.raw_media_plan_output.unwrap();
    assert_eq!(raw_plan["selected_file"], "media-plan_final.xlsx");
    assert_eq!(raw_plan["selection"]["method"], "fallback");
}

#[tokio::test]
async fn test_review_persisted_through_sqlite_and_files() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = FileBlobStore::new(dir.path().join("uploads"));

    let staging = MemoryBlobStore::new();
    let job = complete_job(&staging);
    for category in Category::ALL {
        for doc in job.checklist.documents(category) {
            if let Ok(bytes) = docreview::storage::BlobStore::read(&staging, &doc.storage_ref).await
            {
                uploads.save(&doc.storage_ref, &bytes).await.unwrap();
            }
        }
    }

    let db = Database::open(&dir.path().join("review.db")).unwrap();
    let store = Arc::new(SqliteJobStore::new(db.clone()));
    store.insert(&job).await.unwrap();

    let pipeline = ReviewPipeline::new(
        Arc::clone(&store) as Arc<dyn JobStore>,
        field_extractor(Arc::new(ScriptedGateway::new()), Arc::new(uploads)),
    );
    pipeline.run(&job.id, &NoopProgress).await.unwrap();

    let reopened = SqliteJobStore::new(Database::open(&dir.path().join("review.db")).unwrap());
    let stored = reopened.get(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Compliant);
    let review = stored.review.unwrap();
    assert_eq!(review.agency_invoice_total_amount, Some(600.0));
    assert_eq!(review.po_number.as_deref(), Some("PO-1"));
    assert_eq!(stored.checklist, job.checklist);
}
