//! Persistence backends and the fallback chain
//!
//! A submission is offered to each backend in order until one accepts it.
//! `Discard` always accepts, so the chain as a whole cannot fail.

use super::{FileStore, SqliteStore};
use crate::submission::SubmissionRecord;
use crate::Result;

/// Where a submission can be persisted
#[derive(Clone)]
pub enum Backend {
    /// The submissions table
    Relational(SqliteStore),
    /// The JSON array file beside the application
    File(FileStore),
    /// Accepts and drops the record
    Discard,
}

/// Which backend committed a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Committed {
    Relational { id: i64 },
    File,
    Discarded,
}

impl Committed {
    /// Row id assigned by the Relational Store, if it was used
    pub fn id(&self) -> Option<i64> {
        match self {
            Committed::Relational { id } => Some(*id),
            _ => None,
        }
    }

    /// True when the record landed in the File Store instead of the table
    pub fn is_fallback(&self) -> bool {
        matches!(self, Committed::File)
    }
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Relational(_) => "relational",
            Backend::File(_) => "file",
            Backend::Discard => "discard",
        }
    }

    /// Attempt to persist once. No retries.
    pub async fn persist(&self, record: &SubmissionRecord) -> Result<Committed> {
        match self {
            Backend::Relational(store) => {
                let id = store.insert_submission(record).await?;
                Ok(Committed::Relational { id })
            }
            Backend::File(store) => {
                store.append(record).await?;
                Ok(Committed::File)
            }
            Backend::Discard => Ok(Committed::Discarded),
        }
    }
}

/// Ordered list of backends, tried until the first success
#[derive(Clone)]
pub struct FallbackChain {
    backends: Vec<Backend>,
}

impl FallbackChain {
    /// Build a chain from `backends`. A trailing `Discard` is appended when
    /// missing and anything after the first `Discard` is dropped.
    pub fn new(backends: Vec<Backend>) -> Self {
        let mut chain = Vec::with_capacity(backends.len() + 1);
        for backend in backends {
            let terminal = matches!(backend, Backend::Discard);
            chain.push(backend);
            if terminal {
                return Self { backends: chain };
            }
        }
        chain.push(Backend::Discard);
        Self { backends: chain }
    }

    /// Relational Store first, then the File Store
    pub fn standard(relational: Option<SqliteStore>, file: FileStore) -> Self {
        let mut backends = Vec::with_capacity(3);
        if let Some(store) = relational {
            backends.push(Backend::Relational(store));
        }
        backends.push(Backend::File(file));
        Self::new(backends)
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// The relational store at the head of the chain, if configured
    pub fn relational(&self) -> Option<&SqliteStore> {
        self.backends.iter().find_map(|b| match b {
            Backend::Relational(store) => Some(store),
            _ => None,
        })
    }

    /// Persist `record` with the first backend that accepts it
    pub async fn persist(&self, record: &SubmissionRecord) -> Committed {
        for backend in &self.backends {
            match backend.persist(record).await {
                Ok(Committed::Discarded) => {
                    tracing::error!(
                        form_type = %record.form_type,
                        "All stores unavailable, submission discarded"
                    );
                    return Committed::Discarded;
                }
                Ok(committed) => {
                    tracing::debug!(backend = backend.name(), "Submission stored");
                    return committed;
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), "Store failed, falling back: {}", e);
                }
            }
        }
        Committed::Discarded
    }
}
