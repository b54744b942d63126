#![deny(missing_docs)]

//! Document ingestion core for retrieval-augmented search.
//!
//! Turns parsed documents into validated, embedded, tenant-scoped records and
//! uploads them to a remote search index in paced batches, tracking each
//! document's lifecycle status along the way.

/// Chunking strategies for parsed document text.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Search index client and batch indexer.
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Core data types shared across the pipeline.
pub mod model;
/// End-to-end ingestion orchestration.
pub mod pipeline;
/// Document status reporting sink.
pub mod status;
/// Shared token encoding built on `cl100k_base`.
pub mod tokenizer;
/// Quality-gate validators for pipeline hand-offs.
pub mod validate;
