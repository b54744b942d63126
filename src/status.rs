//! Status reporting sink for per-document lifecycle updates.

use crate::model::DocumentStatus;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by status store implementations.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The status store rejected or failed the update.
    #[error("Failed to update document status: {0}")]
    UpdateFailed(String),
}

/// Sink that persists the status of a set of documents.
///
/// The pipeline treats status writes as best effort: callers log reporter
/// failures at warn level and never fail an indexing run because of them.
/// External stores (a relational database, a workflow tracker) implement
/// this trait; the core only computes the target status and error text.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Set the status, and optionally an error message, for each document id.
    async fn set_status(
        &self,
        document_ids: &[String],
        status: DocumentStatus,
        error: Option<&str>,
    ) -> Result<(), StatusError>;
}

/// Reporter that records transitions in the log stream only.
///
/// Default sink for deployments without a status store and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusReporter;

#[async_trait]
impl StatusReporter for TracingStatusReporter {
    async fn set_status(
        &self,
        document_ids: &[String],
        status: DocumentStatus,
        error: Option<&str>,
    ) -> Result<(), StatusError> {
        if document_ids.is_empty() {
            tracing::debug!(status = %status, "Skipping status update with no document ids");
            return Ok(());
        }
        tracing::info!(
            documents = document_ids.len(),
            status = %status,
            error,
            "Document status updated"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Reporter capturing every update for assertions.
    #[derive(Default)]
    pub struct RecordingReporter {
        /// Recorded `(document_ids, status, error)` updates in call order.
        pub updates: Mutex<Vec<(Vec<String>, DocumentStatus, Option<String>)>>,
    }

    #[async_trait]
    impl StatusReporter for RecordingReporter {
        async fn set_status(
            &self,
            document_ids: &[String],
            status: DocumentStatus,
            error: Option<&str>,
        ) -> Result<(), StatusError> {
            self.updates.lock().expect("reporter lock").push((
                document_ids.to_vec(),
                status,
                error.map(str::to_string),
            ));
            Ok(())
        }
    }

    /// Reporter that always fails, for exercising the best-effort path.
    pub struct FailingReporter;

    #[async_trait]
    impl StatusReporter for FailingReporter {
        async fn set_status(
            &self,
            _document_ids: &[String],
            _status: DocumentStatus,
            _error: Option<&str>,
        ) -> Result<(), StatusError> {
            Err(StatusError::UpdateFailed("status store offline".into()))
        }
    }
}
