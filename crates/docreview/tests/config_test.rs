//! Config file to running pipeline.

use std::io::Write;
use std::sync::Arc;

use secrecy::ExposeSecret;

use docreview::checklist::{Category, Document, Job, JobStatus};
use docreview::db::Database;
use docreview::pipeline::{NoopProgress, PipelineConfig, ReviewPipeline};
use docreview::store::SqliteJobStore;
use docreview::{load_config, ConfigError};

fn write_config(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("docreview.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn test_api_key_file_flows_into_pipeline_config() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("api.key");
    std::fs::write(&key_path, "sk-test-123\n").unwrap();

    let body = format!(
        r#"{{
            "version": "1.0",
            "upload_directory": "{uploads}",
            "extraction": {{
                "endpoint": "http://127.0.0.1:9/extract",
                "model": "doc-extract-v2",
                "api_key_file": "{key}",
                "timeout_secs": 2
            }}
        }}"#,
        uploads = dir.path().join("uploads").display(),
        key = key_path.display(),
    );
    let config = load_config(write_config(dir.path(), &body)).unwrap();
    let settings = PipelineConfig::from_config(&config).unwrap();

    assert_eq!(
        settings.api_key.as_ref().map(|k| k.expose_secret().to_string()),
        Some("sk-test-123".to_string())
    );
    assert_eq!(settings.extraction_timeout.as_secs(), 2);
    assert_eq!(settings.max_prompt_chars, 20_000);
    assert_eq!(settings.upload_directory, dir.path().join("uploads"));
}

#[test]
fn test_missing_key_file_fails_config_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let body = r#"{
        "version": "1.0",
        "upload_directory": "/srv/uploads",
        "extraction": {
            "endpoint": "https://gateway.internal/extract",
            "model": "doc-extract-v2",
            "api_key_file": "/nonexistent/docreview/api.key"
        }
    }"#;
    let config = load_config(write_config(dir.path(), body)).unwrap();

    let result = PipelineConfig::from_config(&config);
    assert!(matches!(result, Err(ConfigError::Secret(_))));
}

#[test]
fn test_unknown_top_level_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let body = r#"{
        "version": "1.0",
        "upload_directory": "/srv/uploads",
        "extraction": { "endpoint": "https://x/extract", "model": "m" },
        "reports": { "csv": true }
    }"#;
    let result = load_config(write_config(dir.path(), body));
    assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
}

#[tokio::test]
async fn test_unreachable_gateway_is_recorded_in_review() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    std::fs::create_dir_all(uploads.join("jobs")).unwrap();
    std::fs::write(uploads.join("jobs/jo.txt"), "PO Number: PO-77 Total 1200").unwrap();

    let body = format!(
        r#"{{
            "version": "1.0",
            "upload_directory": "{}",
            "extraction": {{
                "endpoint": "http://127.0.0.1:9/extract",
                "model": "doc-extract-v2",
                "timeout_secs": 2
            }}
        }}"#,
        uploads.display()
    );
    let config = load_config(write_config(dir.path(), &body)).unwrap();
    let settings = PipelineConfig::from_config(&config).unwrap();

    let store = Arc::new(SqliteJobStore::new(Database::open_in_memory().unwrap()));
    let mut job = Job::new("AG-3", "Autumn");
    job.checklist
        .add(Category::JobOrder, Document::new("jobs/jo.txt", "JO.txt"));
    store.insert(&job).await.unwrap();

    let pipeline = ReviewPipeline::from_config(&settings, store).unwrap();
    let updated = pipeline.run(&job.id, &NoopProgress).await.unwrap();

    assert_eq!(updated.status, JobStatus::NotCompliant);
    let review = updated.review.unwrap();
    assert!(review.po_number.is_none());
    assert!(review.raw_po_output.unwrap()["error"]
        .as_str()
        .unwrap()
        .starts_with("Extraction failed for JO.txt"));
}
