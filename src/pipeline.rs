//! End-to-end ingestion pipeline: chunk, embed, validate, and index one
//! parsed document.

use crate::chunking::{ChunkParams, ChunkStrategy, ChunkingError, chunk_document};
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::index::{BatchIndexer, BatchParams, IndexWriter, RunStatus};
use crate::metrics::IngestMetrics;
use crate::model::{Chunk, DocumentStatus, IndexRecord, ParsedDocument, TenantScope};
use crate::status::StatusReporter;
use crate::tokenizer::Tokenizer;
use crate::validate::{
    ChunkTokenBounds, validate_chunks, validate_embeddings, validate_parsed_document,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort an ingestion run before any upload happens.
///
/// Upload-stage failures never surface here; the batch indexer absorbs them
/// into its per-record accounting instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Chunking could not make progress with the configured parameters.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// The embedding provider failed outright.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// The embedding provider returned the wrong number of vectors.
    #[error("embedding provider returned {actual} vectors for {expected} chunks")]
    EmbeddingCountMismatch {
        /// Number of chunks submitted for embedding.
        expected: usize,
        /// Number of vectors the provider returned.
        actual: usize,
    },
    /// Chunk metadata could not be serialized onto the index record.
    #[error("failed to serialize chunk metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Tunable parameters for one pipeline instance.
#[derive(Debug, Clone, Default)]
pub struct PipelineParams {
    /// Chunking strategy parameters.
    pub chunk: ChunkParams,
    /// Token bounds applied by the chunk-set validator.
    pub bounds: ChunkTokenBounds,
    /// Batch sizing, pacing, and the expected embedding dimension.
    pub batch: BatchParams,
}

/// Summary of one completed ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Identifier of the ingested document.
    pub document_id: String,
    /// Number of chunks produced from the document text.
    pub chunk_count: usize,
    /// Number of records submitted to the batch indexer.
    pub records_submitted: usize,
    /// Records the index accepted.
    pub success_count: usize,
    /// Records that failed validation or upload.
    pub error_count: usize,
    /// Overall run status.
    pub status: RunStatus,
}

/// Orchestrates the full ingestion of parsed documents.
///
/// Owns the tokenizer and the three collaborator seams. Stage transitions are
/// reported through the status sink as the run progresses; a fatal error in a
/// pre-upload stage writes a best-effort `failed` status before propagating.
pub struct IngestService {
    tokenizer: Tokenizer,
    embedding_client: Box<dyn EmbeddingClient>,
    index_writer: Box<dyn IndexWriter>,
    status_reporter: Box<dyn StatusReporter>,
    metrics: Arc<IngestMetrics>,
    params: PipelineParams,
}

impl IngestService {
    /// Build a pipeline over the given collaborators.
    pub fn new(
        tokenizer: Tokenizer,
        embedding_client: Box<dyn EmbeddingClient>,
        index_writer: Box<dyn IndexWriter>,
        status_reporter: Box<dyn StatusReporter>,
        params: PipelineParams,
    ) -> Self {
        Self {
            tokenizer,
            embedding_client,
            index_writer,
            status_reporter,
            metrics: Arc::new(IngestMetrics::new()),
            params,
        }
    }

    /// Shared metrics accumulator for this pipeline.
    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Ingest one parsed document end to end.
    ///
    /// Runs chunking with the selected strategy, embeds every chunk, and
    /// hands the assembled records to the batch indexer. Validator verdicts
    /// for the parse, chunk, and embedding stages are logged; only the
    /// index-record gate inside the indexer withholds data. A document that
    /// chunks to nothing completes successfully with zero records.
    pub async fn ingest_document(
        &self,
        document: &ParsedDocument,
        strategy: ChunkStrategy,
        scope: &TenantScope,
    ) -> Result<IngestOutcome, PipelineError> {
        let document_ids = [document.document_id.clone()];
        tracing::info!(
            document_id = %document.document_id,
            document_name = %document.document_name,
            strategy = strategy.as_str(),
            "Starting document ingestion"
        );

        validate_parsed_document(document).log_if_failed("parsed_document");

        self.report(&document_ids, DocumentStatus::Chunking, None)
            .await;
        let layout = document.layout();
        let chunks = match chunk_document(
            &document.full_text,
            Some(&layout),
            strategy,
            &self.params.chunk,
            &self.tokenizer,
        ) {
            Ok(chunks) => chunks,
            Err(error) => {
                self.report(
                    &document_ids,
                    DocumentStatus::Failed,
                    Some(&error.to_string()),
                )
                .await;
                return Err(error.into());
            }
        };
        self.report(&document_ids, DocumentStatus::Chunked, None)
            .await;

        if chunks.is_empty() {
            tracing::warn!(
                document_id = %document.document_id,
                "Document produced no chunks; nothing to index"
            );
            self.metrics.record_document(0, 0, 0);
            return Ok(IngestOutcome {
                document_id: document.document_id.clone(),
                chunk_count: 0,
                records_submitted: 0,
                success_count: 0,
                error_count: 0,
                status: RunStatus::Success,
            });
        }

        validate_chunks(&chunks, &self.params.bounds, &self.tokenizer).log_if_failed("chunks");

        self.report(&document_ids, DocumentStatus::Embedding, None)
            .await;
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = match self.embedding_client.generate_embeddings(texts).await {
            Ok(embeddings) => embeddings,
            Err(error) => {
                self.report(
                    &document_ids,
                    DocumentStatus::Failed,
                    Some(&error.to_string()),
                )
                .await;
                return Err(error.into());
            }
        };
        if embeddings.len() != chunks.len() {
            let error = PipelineError::EmbeddingCountMismatch {
                expected: chunks.len(),
                actual: embeddings.len(),
            };
            self.report(
                &document_ids,
                DocumentStatus::Failed,
                Some(&error.to_string()),
            )
            .await;
            return Err(error);
        }
        validate_embeddings(&embeddings, self.params.batch.vector_dimension)
            .log_if_failed("embeddings");
        self.report(&document_ids, DocumentStatus::Embedded, None)
            .await;

        let records = assemble_records(document, &chunks, embeddings, scope)?;

        self.report(&document_ids, DocumentStatus::Indexing, None)
            .await;
        let indexer = BatchIndexer::new(
            self.index_writer.as_ref(),
            self.status_reporter.as_ref(),
            self.params.batch.clone(),
        );
        let report = indexer.index_records(&records).await;

        self.metrics.record_document(
            chunks.len() as u64,
            report.success_count as u64,
            report.error_count as u64,
        );

        Ok(IngestOutcome {
            document_id: document.document_id.clone(),
            chunk_count: chunks.len(),
            records_submitted: records.len(),
            success_count: report.success_count,
            error_count: report.error_count,
            status: report.status(),
        })
    }

    /// Best-effort status write; reporter failures are logged, never raised.
    async fn report(&self, document_ids: &[String], status: DocumentStatus, error: Option<&str>) {
        if let Err(err) = self
            .status_reporter
            .set_status(document_ids, status, error)
            .await
        {
            tracing::warn!(
                error = %err,
                status = %status,
                "Best-effort status update failed"
            );
        }
    }
}

/// Pair each chunk with its embedding and stamp on document and tenant fields.
fn assemble_records(
    document: &ParsedDocument,
    chunks: &[Chunk],
    embeddings: Vec<Vec<f32>>,
    scope: &TenantScope,
) -> Result<Vec<IndexRecord>, PipelineError> {
    chunks
        .iter()
        .zip(embeddings)
        .map(|(chunk, content_vector)| {
            Ok(IndexRecord {
                id: format!("{}_chunk_{}", document.document_id, chunk.chunk_index),
                content: chunk.content.clone(),
                content_vector,
                document_id: document.document_id.clone(),
                document_name: document.document_name.clone(),
                document_url: document.document_url.clone(),
                page_number: chunk.page_number.unwrap_or(0),
                chunk_index: chunk.chunk_index,
                metadata: serde_json::to_string(&chunk.metadata)?,
                organization_id: scope.organization_id.clone(),
                folder_id: scope.folder_id.clone(),
            })
        })
        .collect()
}
