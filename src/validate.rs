//! Quality-gate validators for each pipeline transition.
//!
//! One validator per hand-off: parsed document, chunk set, embedding set, and
//! index-ready record. Validators are pure and never mutate their input; they
//! return a verdict plus human-readable defects. Parse, chunk, and embedding
//! verdicts are diagnostic signals logged for operators, while the
//! index-record verdict gates what is persisted (see the batch indexer).

use crate::model::{Chunk, IndexRecord, ParsedDocument};
use crate::tokenizer::Tokenizer;

/// Number of defects included verbatim when a verdict is logged.
const LOGGED_DEFECT_SAMPLE: usize = 10;

/// Pass/fail verdict with diagnostic defect descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateVerdict {
    /// Whether the validated input passed every check.
    pub passed: bool,
    /// Human-readable description of each defect found, in input order.
    pub defects: Vec<String>,
}

impl GateVerdict {
    fn from_defects(defects: Vec<String>) -> Self {
        Self {
            passed: defects.is_empty(),
            defects,
        }
    }

    /// Log a failing verdict at warn level with a bounded defect sample.
    pub fn log_if_failed(&self, stage: &str) {
        if self.passed {
            return;
        }
        tracing::warn!(
            stage,
            defects = self.defects.len(),
            sample = ?&self.defects[..self.defects.len().min(LOGGED_DEFECT_SAMPLE)],
            "Validation issues found"
        );
    }
}

/// Token-count bounds applied by the chunk-set validator.
#[derive(Debug, Clone)]
pub struct ChunkTokenBounds {
    /// Chunks below this token count are reported as suspiciously small.
    pub min_tokens: usize,
    /// Chunks above this token count are reported as oversized.
    pub max_tokens: usize,
}

impl Default for ChunkTokenBounds {
    fn default() -> Self {
        Self {
            min_tokens: 10,
            max_tokens: 600,
        }
    }
}

/// Validate a parsed document handed over by the upstream parsing stage.
pub fn validate_parsed_document(document: &ParsedDocument) -> GateVerdict {
    let mut defects = Vec::new();

    if document.full_text.is_empty() {
        defects.push("content is empty".to_string());
    }
    if document.document_id.is_empty() {
        defects.push("document_id is missing".to_string());
    }
    if document.document_name.is_empty() {
        defects.push("document_name is missing".to_string());
    }
    if document.page_count == 0 {
        defects.push("page_count must be > 0".to_string());
    } else if document.page_count != document.pages.len() {
        defects.push(format!(
            "page_count is {} but {} pages are present",
            document.page_count,
            document.pages.len()
        ));
    }

    GateVerdict::from_defects(defects)
}

/// Validate a chunk set produced by one chunking invocation.
///
/// Out-of-bounds token counts are reported but the chunks are never
/// discarded; the bounds flag likely extraction or configuration problems.
pub fn validate_chunks(
    chunks: &[Chunk],
    bounds: &ChunkTokenBounds,
    tokenizer: &Tokenizer,
) -> GateVerdict {
    let mut defects = Vec::new();

    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.content.is_empty() {
            defects.push(format!("chunk {i}: content is empty"));
            continue;
        }

        let token_count = tokenizer.count(&chunk.content);
        if token_count < bounds.min_tokens {
            defects.push(format!(
                "chunk {i}: only {token_count} tokens (min {})",
                bounds.min_tokens
            ));
        }
        if token_count > bounds.max_tokens {
            defects.push(format!(
                "chunk {i}: {token_count} tokens exceeds max {}",
                bounds.max_tokens
            ));
        }

        if chunk.metadata.strategy.is_empty() {
            defects.push(format!("chunk {i}: metadata is missing a strategy tag"));
        }
    }

    GateVerdict::from_defects(defects)
}

/// Validate embedding vectors supplied by the upstream embedding stage.
pub fn validate_embeddings(embeddings: &[Vec<f32>], expected_dim: usize) -> GateVerdict {
    let mut defects = Vec::new();

    for (i, embedding) in embeddings.iter().enumerate() {
        if embedding.len() != expected_dim {
            defects.push(format!(
                "embedding {i}: got {} dims, expected {expected_dim}",
                embedding.len()
            ));
        }
        if embedding.iter().all(|&value| value == 0.0) {
            defects.push(format!("embedding {i}: all zeros (failed generation)"));
        }
        if embedding.iter().any(|value| !value.is_finite()) {
            defects.push(format!("embedding {i}: contains NaN or Inf"));
        }
    }

    GateVerdict::from_defects(defects)
}

/// Validate a record assembled for upload to the search index.
///
/// `page_number` and `chunk_index` are integers by construction in this
/// crate, so only the field-presence and dimension checks apply.
pub fn validate_index_record(record: &IndexRecord, expected_dim: usize) -> GateVerdict {
    let mut defects = Vec::new();

    if record.id.is_empty() {
        defects.push("'id' is missing or empty".to_string());
    }
    if record.content.is_empty() {
        defects.push("'content' is missing or empty".to_string());
    }
    if record.content_vector.is_empty() {
        defects.push("'content_vector' is missing or empty".to_string());
    } else if record.content_vector.len() != expected_dim {
        defects.push(format!(
            "content_vector has {} dims, expected {expected_dim}",
            record.content_vector.len()
        ));
    }
    if record.document_id.is_empty() {
        defects.push("'document_id' is missing or empty".to_string());
    }
    if record.document_name.is_empty() {
        defects.push("'document_name' is missing or empty".to_string());
    }

    GateVerdict::from_defects(defects)
}
