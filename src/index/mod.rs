//! Remote search index integration: HTTP client and batch indexer.

mod batch;
mod client;
mod types;

pub use batch::BatchIndexer;
pub use client::{IndexWriter, SearchIndexClient};
pub use types::{BatchOutcome, BatchParams, IndexError, IndexingReport, RunStatus, UploadResult};
