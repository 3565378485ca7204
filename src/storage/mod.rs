//! Storage Layer - where submissions end up
//!
//! Three backends, tried in order:
//! - SQLite table `form_submissions(id, form_type, names, contact, programme, ..., created_at)`
//! - JSON array file of submission objects
//! - Discard

pub mod schema;
pub mod sqlite;
pub mod file;
pub mod backend;

pub use sqlite::{PoolConfig, SqliteStore, StoredSubmission};
pub use file::FileStore;
pub use backend::{Backend, Committed, FallbackChain};
