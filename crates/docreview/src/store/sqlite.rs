use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{JobStore, StoreError};
use crate::checklist::{Category, Checklist, Document, Job, JobStatus};
use crate::db::job_repo::{self, JobRow};
use crate::db::Database;
use crate::review::Review;

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_timestamp(s: &str, job_id: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: job_id.to_string(),
            reason: format!("bad timestamp '{}': {}", s, e),
        })
}

fn parse_status(s: &str, job_id: &str) -> JobStatus {
    JobStatus::parse(s).unwrap_or_else(|| {
        log::warn!(
            "Unknown job status '{}' for job {}, defaulting to Not Compliant",
            s,
            job_id
        );
        JobStatus::NotCompliant
    })
}

fn row_to_job(row: JobRow) -> Result<Job, StoreError> {
    let checklist: Checklist =
        serde_json::from_str(&row.checklist).map_err(|e| StoreError::Corrupt {
            id: row.id.clone(),
            reason: format!("checklist: {}", e),
        })?;
    let review: Option<Review> = row
        .review
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| StoreError::Corrupt {
            id: row.id.clone(),
            reason: format!("review: {}", e),
        })?;
    let reviewed_at = row
        .reviewed_at
        .as_deref()
        .map(|s| parse_timestamp(s, &row.id))
        .transpose()?;

    Ok(Job {
        status: parse_status(&row.status, &row.id),
        created_at: parse_timestamp(&row.created_at, &row.id)?,
        updated_at: parse_timestamp(&row.updated_at, &row.id)?,
        reviewed_at,
        checklist,
        review,
        id: row.id,
        agency_id: row.agency_id,
        title: row.title,
        description: row.description,
    })
}

fn job_to_row(job: &Job) -> Result<JobRow, StoreError> {
    Ok(JobRow {
        id: job.id.clone(),
        agency_id: job.agency_id.clone(),
        title: job.title.clone(),
        description: job.description.clone(),
        status: job.status.as_str().to_string(),
        checklist: serde_json::to_string(&job.checklist)?,
        review: job.review.as_ref().map(serde_json::to_string).transpose()?,
        created_at: format_timestamp(job.created_at),
        updated_at: format_timestamp(job.updated_at),
        reviewed_at: job.reviewed_at.map(format_timestamp),
    })
}

/// Job store over the SQLite `jobs` table.
///
/// Checklist edits and review writes each run as one transaction, so
/// concurrent uploads to the same job never overwrite each other.
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Runs a blocking database operation off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let row = job_to_row(job)?;
        self.blocking(move |db| {
            db.with_conn(|conn| match job_repo::insert(conn, &row) {
                Err(e) if e.is_unique_violation() => Err(StoreError::AlreadyExists(row.id.clone())),
                other => Ok(other?),
            })
        })
        .await
    }

    pub async fn list_by_agency(&self, agency_id: &str) -> Result<Vec<Job>, StoreError> {
        let agency_id = agency_id.to_string();
        self.blocking(move |db| {
            db.with_conn(|conn| {
                job_repo::list_by_agency(conn, &agency_id)?
                    .into_iter()
                    .map(row_to_job)
                    .collect()
            })
        })
        .await
    }

    /// Appends a document to a category. The job status is left untouched.
    pub async fn add_document(
        &self,
        job_id: &str,
        category: Category,
        document: Document,
    ) -> Result<Job, StoreError> {
        let ((), job) = self
            .update_checklist(job_id, move |checklist| {
                checklist.add(category, document);
                Ok(())
            })
            .await?;
        Ok(job)
    }

    /// Removes the document at `index` within a category and returns it
    /// together with the updated job.
    pub async fn remove_document(
        &self,
        job_id: &str,
        category: Category,
        index: usize,
    ) -> Result<(Document, Job), StoreError> {
        self.update_checklist(job_id, move |checklist| {
            checklist
                .remove(category, index)
                .ok_or(StoreError::DocumentIndex { category, index })
        })
        .await
    }

    pub async fn delete(&self, job_id: &str) -> Result<(), StoreError> {
        let id = job_id.to_string();
        self.blocking(move |db| {
            db.with_conn(|conn| {
                if job_repo::delete(conn, &id)? {
                    Ok(())
                } else {
                    Err(StoreError::NotFound(id.clone()))
                }
            })
        })
        .await
    }

    /// Loads the checklist, applies `edit` and writes it back in a single
    /// transaction. An error from `edit` rolls the whole cycle back.
    async fn update_checklist<F, T>(&self, job_id: &str, edit: F) -> Result<(T, Job), StoreError>
    where
        F: FnOnce(&mut Checklist) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let id = job_id.to_string();
        self.blocking(move |db| {
            db.transaction(|tx| {
                let row = job_repo::find_by_id(tx, &id)?
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                let mut job = row_to_job(row)?;
                let outcome = edit(&mut job.checklist)?;
                job.updated_at = Utc::now();

                let checklist = serde_json::to_string(&job.checklist)?;
                job_repo::update_checklist(tx, &id, &checklist, &format_timestamp(job.updated_at))?;
                Ok((outcome, job))
            })
        })
        .await
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn get(&self, job_id: &str) -> Result<Job, StoreError> {
        let id = job_id.to_string();
        self.blocking(move |db| {
            db.with_conn(|conn| match job_repo::find_by_id(conn, &id)? {
                Some(row) => row_to_job(row),
                None => Err(StoreError::NotFound(id.clone())),
            })
        })
        .await
    }

    async fn replace_review(&self, job_id: &str, review: Review) -> Result<Job, StoreError> {
        let id = job_id.to_string();
        let status = review.compliance_status();
        let review_json = serde_json::to_string(&review)?;
        let reviewed_at = format_timestamp(Utc::now());

        self.blocking(move |db| {
            db.transaction(|tx| {
                let changed =
                    job_repo::update_review(tx, &id, &review_json, status.as_str(), &reviewed_at)?;
                if changed == 0 {
                    return Err(StoreError::NotFound(id.clone()));
                }
                match job_repo::find_by_id(tx, &id)? {
                    Some(row) => row_to_job(row),
                    None => Err(StoreError::NotFound(id.clone())),
                }
            })
        })
        .await
    }
}
