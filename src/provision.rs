//! Table provisioning
//!
//! Ensures the submissions table exists. Runs once per process, after the
//! listener is bound, and never takes the process down: if the database is
//! unreachable the Relational Store simply fails on use and submissions fall
//! back to the file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::storage::SqliteStore;
use crate::Result;

#[derive(Clone)]
pub struct Provisioner {
    store: Option<SqliteStore>,
    started: Arc<AtomicBool>,
}

impl Provisioner {
    pub fn new(store: Option<SqliteStore>) -> Self {
        Self {
            store,
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create the table and indexes if absent. Safe to repeat.
    pub async fn ensure_schema(&self) -> Result<()> {
        let Some(store) = &self.store else {
            tracing::warn!("No database configured - skipping schema provisioning");
            return Ok(());
        };

        store.ensure_schema().await?;
        tracing::info!(
            "Database connected & form_submissions table ready ({})",
            store.path().display()
        );
        Ok(())
    }

    /// Run [`Self::ensure_schema`] in the background, logging failure.
    ///
    /// Only the first call on a provisioner (or any of its clones) starts a
    /// task; later calls return `None`.
    pub fn spawn(&self) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Provisioner already started");
            return None;
        }

        let this = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = this.ensure_schema().await {
                tracing::error!("Database provisioning failed: {}", e);
                tracing::warn!("Server will continue without the database");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::test_support::unreachable_store;
    use crate::storage::PoolConfig;

    #[tokio::test]
    async fn test_provisioning_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(PoolConfig::new(dir.path().join("leads.db")));
        let provisioner = Provisioner::new(Some(store.clone()));

        provisioner.ensure_schema().await.unwrap();
        provisioner.ensure_schema().await.unwrap();
        assert_eq!(store.count_submissions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawn_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(PoolConfig::new(dir.path().join("leads.db")));
        let provisioner = Provisioner::new(Some(store.clone()));

        let handle = provisioner.spawn().expect("first spawn starts a task");
        assert!(provisioner.clone().spawn().is_none());
        handle.await.unwrap();

        assert_eq!(store.count_submissions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = unreachable_store(dir.path());
        let provisioner = Provisioner::new(Some(store));

        assert!(provisioner.ensure_schema().await.is_err());
        provisioner.spawn().unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_without_database() {
        let provisioner = Provisioner::new(None);
        provisioner.ensure_schema().await.unwrap();
    }
}
