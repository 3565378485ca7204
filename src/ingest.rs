//! Submission ingestion
//!
//! Validates a raw submission, hands it to the fallback chain and builds the
//! acknowledgment sent back to the visitor. Once validation passes the visitor
//! is always told the submission succeeded, whichever backend took it, even
//! when it was discarded.

use serde::Serialize;

use crate::storage::{Committed, FallbackChain};
use crate::submission::{RawSubmission, RequestContext, SubmissionRecord};
use crate::Result;

pub const SUCCESS_MESSAGE: &str = "Form submitted successfully!";

/// Response body for an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgment {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

impl Acknowledgment {
    pub fn from_committed(committed: Committed) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            id: committed.id(),
            fallback: committed.is_fallback().then_some(true),
        }
    }
}

#[derive(Clone)]
pub struct IngestService {
    chain: FallbackChain,
}

impl IngestService {
    pub fn new(chain: FallbackChain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// Validate and store one submission.
    ///
    /// The only error is [`crate::Error::MissingContact`], returned before any
    /// backend is touched.
    pub async fn submit(&self, raw: RawSubmission, ctx: RequestContext) -> Result<Acknowledgment> {
        let record = SubmissionRecord::from_raw(raw, ctx)?;
        let committed = self.chain.persist(&record).await;

        tracing::info!(
            form_type = %record.form_type,
            id = ?committed.id(),
            fallback = committed.is_fallback(),
            "Form submission received"
        );

        Ok(Acknowledgment::from_committed(committed))
    }
}
