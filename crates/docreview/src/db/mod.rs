//! SQLite handle for the job store.
//!
//! One connection behind a mutex. Every access holds the lock for the whole
//! closure, and [`Database::transaction`] additionally wraps it in an
//! immediate transaction so read-modify-write cycles cannot interleave.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

pub mod error;
pub mod job_repo;
pub mod migrations;

pub use error::DatabaseError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates a file database in WAL mode and migrates it.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DatabaseError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| DatabaseError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let db = Self::prepare(conn)?;
        log::info!("Job database ready at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(mut conn: Connection) -> Result<Self, DatabaseError> {
        let version = migrations::migrate(&mut conn)?;
        log::debug!("Job database at schema version {}", version);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Runs `f` with the connection locked.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside an immediate transaction. The transaction commits when
    /// `f` succeeds and rolls back when it returns an error.
    pub fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DatabaseError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok(value)
    }
}

/// `~/.docreview/data/docreview.db`, when a home directory is known.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".docreview").join("data").join("docreview.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_jobs(db: &Database) -> u32 {
        db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))
                .map_err(DatabaseError::from)
        })
        .unwrap()
    }

    fn insert_stub(conn: &Connection, id: &str) -> Result<usize, DatabaseError> {
        Ok(conn.execute(
            "INSERT INTO jobs (id, agency_id, title, created_at, updated_at)
             VALUES (?1, 'AG-1', 'Launch', '2026-01-01', '2026-01-01')",
            [id],
        )?)
    }

    #[test]
    fn test_file_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("review.db");
        let db = Database::open(&path).unwrap();
        let mode: String = db
            .with_conn(|conn| {
                conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))
                    .map_err(DatabaseError::from)
            })
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert!(path.exists());
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|tx| insert_stub(tx, "j1")).unwrap();
        assert_eq!(count_jobs(&db), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<(), DatabaseError> = db.transaction(|tx| {
            insert_stub(tx, "j1")?;
            insert_stub(tx, "j1")?;
            Ok(())
        });
        assert!(result.unwrap_err().is_unique_violation());
        assert_eq!(count_jobs(&db), 0);
    }

    #[test]
    fn test_clones_share_connection() {
        let db = Database::open_in_memory().unwrap();
        db.clone().with_conn(|conn| insert_stub(conn, "j1")).unwrap();
        assert_eq!(count_jobs(&db), 1);
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path().unwrap();
        assert!(path.ends_with(".docreview/data/docreview.db"));
    }
}
