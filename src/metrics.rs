use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_processed: AtomicU64,
    chunks_produced: AtomicU64,
    records_indexed: AtomicU64,
    records_failed: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed document with its chunk and upload counts.
    pub fn record_document(&self, chunks: u64, indexed: u64, failed: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_produced.fetch_add(chunks, Ordering::Relaxed);
        self.records_indexed.fetch_add(indexed, Ordering::Relaxed);
        self.records_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            chunks_produced: self.chunks_produced.load(Ordering::Relaxed),
            records_indexed: self.records_indexed.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents run through the pipeline since startup.
    pub documents_processed: u64,
    /// Total chunks produced across all documents.
    pub chunks_produced: u64,
    /// Total records accepted by the index.
    pub records_indexed: u64,
    /// Total records that failed validation or upload.
    pub records_failed: u64,
}
