//! SQLite storage implementation - the Relational Store
//!
//! Connections come from an r2d2 pool. Nothing is opened until the first
//! operation, so an unreachable database only surfaces as an error on use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, params};
use serde::Serialize;

use super::schema;
use crate::submission::SubmissionRecord;
use crate::{Error, Result};

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub path: PathBuf,
    pub max_connections: usize,
    /// How long to wait for a usable connection before giving up. Also used
    /// as the SQLite busy timeout.
    pub connect_timeout: Duration,
}

impl PoolConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// SQLite-backed storage for form submissions
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
    connect_timeout: Duration,
}

impl SqliteStore {
    /// Create a store over a lazily connected pool
    pub fn open(config: PoolConfig) -> Self {
        // r2d2 rejects a zero timeout or pool size
        let timeout = config.connect_timeout.max(Duration::from_millis(1));
        let max_size = u32::try_from(config.max_connections).unwrap_or(u32::MAX).max(1);

        let manager = SqliteConnectionManager::file(&config.path)
            .with_init(move |conn| conn.busy_timeout(timeout));
        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(0))
            .connection_timeout(timeout)
            .build_unchecked(manager);

        Self {
            pool,
            path: config.path,
            connect_timeout: timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on a pooled connection off the async runtime
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let timeout = self.connect_timeout;
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| Error::PoolTimeout(timeout, e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Backend(e.to_string()))?
    }

    /// Create the submissions table and its indexes if absent
    pub async fn ensure_schema(&self) -> Result<()> {
        self.run(initialize_schema).await
    }

    /// Insert one submission and return the row id the database assigned.
    ///
    /// `created_at` is left to the column default.
    pub async fn insert_submission(&self, record: &SubmissionRecord) -> Result<i64> {
        let record = record.clone();
        self.run(move |conn| {
            conn.execute(
                r#"
                INSERT INTO form_submissions
                    (form_type, first_name, last_name, email, phone, programme, city,
                     enroll_timeline, enquiry_type, page_url, consent, ip_address, user_agent)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    record.form_type.as_str(),
                    record.first_name,
                    record.last_name,
                    record.email,
                    record.phone,
                    record.programme,
                    record.city,
                    record.enroll_timeline,
                    record.enquiry_type,
                    record.page_url,
                    i64::from(record.consent),
                    record.ip_address,
                    record.user_agent,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Most recent submissions first
    pub async fn recent_submissions(&self, limit: usize) -> Result<Vec<StoredSubmission>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, form_type, first_name, last_name, email, phone, programme, city,
                        enroll_timeline, enquiry_type, page_url, consent, ip_address,
                        user_agent, created_at
                 FROM form_submissions
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], row_to_submission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(rows)
        })
        .await
    }

    /// Count all stored submissions
    pub async fn count_submissions(&self) -> Result<usize> {
        self.run(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM form_submissions", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    for stmt in schema::all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    Ok(())
}

fn row_to_submission(row: &rusqlite::Row) -> rusqlite::Result<StoredSubmission> {
    Ok(StoredSubmission {
        id: row.get(0)?,
        form_type: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        programme: row.get(6)?,
        city: row.get(7)?,
        enroll_timeline: row.get(8)?,
        enquiry_type: row.get(9)?,
        page_url: row.get(10)?,
        consent: row.get(11)?,
        ip_address: row.get(12)?,
        user_agent: row.get(13)?,
        created_at: row.get(14)?,
    })
}

/// A row of the submissions table, as returned to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSubmission {
    pub id: i64,
    pub form_type: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub programme: Option<String>,
    pub city: Option<String>,
    pub enroll_timeline: Option<String>,
    pub enquiry_type: Option<String>,
    pub page_url: Option<String>,
    pub consent: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}


#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A store whose database directory does not exist, with a short timeout
    pub(crate) fn unreachable_store(dir: &Path) -> SqliteStore {
        SqliteStore::open(
            PoolConfig::new(dir.join("missing").join("leads.db"))
                .with_connect_timeout(Duration::from_millis(200)),
        )
    }
}
