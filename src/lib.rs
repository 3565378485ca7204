//! # Leadline - lead capture backend
//!
//! Accepts enquiry, popup and brochure form submissions from a marketing site
//! and stores them with graceful degradation.
//!
//! Leadline provides:
//! - A canonical submission record with a single validation rule (email or phone)
//! - A fallback chain of stores: SQLite table, then a JSON file, then discard
//! - Idempotent provisioning of the submissions table at startup
//! - An axum HTTP surface for the site's forms and operator tooling

pub mod submission;
pub mod storage;
pub mod provision;
pub mod ingest;
pub mod server;
pub mod config;
pub mod ui;

use std::time::Duration;

// Re-exports for convenient access
pub use submission::{FormType, RawSubmission, RequestContext, SubmissionRecord};
pub use storage::{Backend, Committed, FallbackChain, FileStore, SqliteStore};
pub use ingest::{Acknowledgment, IngestService};
pub use provision::Provisioner;

/// Result type alias for Leadline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Leadline operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither an email address nor a phone number was supplied.
    #[error("Email or phone is required.")]
    MissingContact,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No database connection within {0:?}: {1}")]
    PoolTimeout(Duration, String),

    #[error("Backend task failed: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the one error that is reported back to the submitter.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingContact)
    }
}
