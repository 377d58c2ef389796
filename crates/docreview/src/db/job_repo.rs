//! Row-level access to the `jobs` table.
//!
//! Functions take a plain connection so callers decide whether they run
//! inside [`super::Database::transaction`].

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;

/// A raw job row. Checklist and review are JSON text.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub agency_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub checklist: String,
    pub review: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub reviewed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            agency_id: row.get("agency_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            checklist: row.get("checklist")?,
            review: row.get("review")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            reviewed_at: row.get("reviewed_at")?,
        })
    }
}

const SELECT_JOB: &str = "SELECT id, agency_id, title, description, status, checklist, review,
    created_at, updated_at, reviewed_at FROM jobs";

pub fn insert(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (id, agency_id, title, description, status, checklist, review,
         created_at, updated_at, reviewed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            job.id,
            job.agency_id,
            job.title,
            job.description,
            job.status,
            job.checklist,
            job.review,
            job.created_at,
            job.updated_at,
            job.reviewed_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_JOB),
            params![id],
            JobRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Jobs for one agency, newest first.
pub fn list_by_agency(conn: &Connection, agency_id: &str) -> Result<Vec<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE agency_id = ?1 ORDER BY created_at DESC",
        SELECT_JOB
    ))?;
    let rows = stmt
        .query_map(params![agency_id], JobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overwrites the checklist. Returns the number of rows touched.
pub fn update_checklist(
    conn: &Connection,
    id: &str,
    checklist: &str,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET checklist = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, checklist, updated_at],
    )?;
    Ok(changed)
}

/// Writes review, status and review timestamp in one statement. Returns the
/// number of rows touched.
pub fn update_review(
    conn: &Connection,
    id: &str,
    review: &str,
    status: &str,
    reviewed_at: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET review = ?2, status = ?3, reviewed_at = ?4, updated_at = ?4
         WHERE id = ?1",
        params![id, review, status, reviewed_at],
    )?;
    Ok(changed)
}

pub fn delete(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}
