//! Shared types for the search index client and batch indexer.

use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;

/// Errors returned while interacting with the remote search index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid search endpoint URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The index responded with an unexpected status code.
    #[error("Unexpected search index response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the index.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Per-record result of a merge-or-upload call.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResult {
    /// Key of the record the result refers to.
    pub key: String,
    /// Whether the index accepted the record.
    #[serde(rename = "status")]
    pub succeeded: bool,
    /// Error detail supplied by the index for rejected records.
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct IndexBatchResponse {
    pub(crate) value: Vec<UploadResult>,
}

/// Outcome of one uploaded batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Zero-based position of the batch within the run.
    pub batch_index: usize,
    /// Record ids the index accepted.
    pub succeeded_ids: BTreeSet<String>,
    /// Record id mapped to the failure reason for every rejected record.
    pub failed: BTreeMap<String, String>,
}

impl BatchOutcome {
    pub(crate) fn new(batch_index: usize) -> Self {
        Self {
            batch_index,
            ..Self::default()
        }
    }
}

/// Tri-state outcome of a full indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every record was accepted.
    Success,
    /// Some records failed; the failures are itemized in the outcomes.
    PartialSuccess,
}

/// Aggregate accounting for a full indexing run.
///
/// Invariant: `success_count + error_count` equals the number of records
/// submitted to the run.
#[derive(Debug, Clone, Default)]
pub struct IndexingReport {
    /// Records accepted across all batches.
    pub success_count: usize,
    /// Records rejected, lost to transport failures, or gated out by
    /// validation across all batches.
    pub error_count: usize,
    /// Per-batch outcomes in upload order.
    pub outcomes: Vec<BatchOutcome>,
    /// Records withheld from upload by the index-record validator, mapped to
    /// their defect summary.
    pub invalid: BTreeMap<String, String>,
}

impl IndexingReport {
    /// Overall run status derived from the error count.
    pub fn status(&self) -> RunStatus {
        if self.error_count == 0 {
            RunStatus::Success
        } else {
            RunStatus::PartialSuccess
        }
    }

    /// Union of accepted record ids across all batches.
    pub fn succeeded_ids(&self) -> BTreeSet<String> {
        self.outcomes
            .iter()
            .flat_map(|outcome| outcome.succeeded_ids.iter().cloned())
            .collect()
    }
}

/// Tunable parameters for the batch indexer.
#[derive(Debug, Clone)]
pub struct BatchParams {
    /// Number of records per upload batch.
    pub batch_size: usize,
    /// Fixed pause between consecutive batches.
    pub batch_delay: Duration,
    /// Expected embedding dimension enforced by the index-record gate.
    pub vector_dimension: usize,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_delay: Duration::from_millis(500),
            vector_dimension: 3072,
        }
    }
}
