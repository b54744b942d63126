//! Chunking strategies for parsed document text.
//!
//! Three interchangeable strategies turn one document's text (plus optional
//! layout) into an ordered chunk sequence:
//!
//! - [`ChunkStrategy::Semantic`] accumulates whole sentences up to a token
//!   budget and seeds each new chunk with trailing overlap sentences.
//! - [`ChunkStrategy::StructureAware`] groups paragraphs into sections at
//!   heading boundaries and falls back to semantic splitting inside oversized
//!   sections.
//! - [`ChunkStrategy::SlidingWindow`] slides a fixed token window over the
//!   raw token stream.
//!
//! All strategies are deterministic, assign `chunk_index` densely from 0, and
//! map empty or whitespace-only input to an empty sequence.

pub mod semantic;
pub mod structure;
pub mod window;

use crate::model::{Chunk, ChunkMetadata, LayoutElement, compute_content_hash};
use crate::tokenizer::{Tokenizer, TokenizerError};
use thiserror::Error;

/// Errors produced while turning document text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The configured token budget makes progress impossible.
    #[error("chunk token budget must be greater than zero")]
    InvalidBudget,
    /// The shared encoding failed while decoding a token window.
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}

/// Strategy selector for one chunking invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Sentence-boundary accumulation with trailing overlap.
    Semantic,
    /// Section grouping driven by layout headings.
    StructureAware,
    /// Fixed token windows over the raw token stream.
    SlidingWindow,
}

impl ChunkStrategy {
    /// Tag recorded in chunk metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::StructureAware => "structure_aware",
            Self::SlidingWindow => "sliding_window",
        }
    }
}

/// Tunable parameters shared by the chunking strategies.
#[derive(Debug, Clone)]
pub struct ChunkParams {
    /// Token budget per chunk for the semantic and structure-aware strategies.
    pub max_tokens: usize,
    /// Token budget for the overlap seeded into each new semantic chunk.
    pub overlap_tokens: usize,
    /// Window length in tokens for the sliding-window strategy.
    pub window_size: usize,
    /// Overlap in tokens between consecutive windows.
    pub window_overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            overlap_tokens: 50,
            window_size: 512,
            window_overlap: 50,
        }
    }
}

/// Chunk one document's text with the selected strategy.
///
/// `layout` is only consulted by [`ChunkStrategy::StructureAware`]; the other
/// strategies ignore it. Identical input and parameters always produce an
/// identical chunk sequence, which keeps re-ingestion idempotent.
pub fn chunk_document(
    text: &str,
    layout: Option<&[LayoutElement]>,
    strategy: ChunkStrategy,
    params: &ChunkParams,
    tokenizer: &Tokenizer,
) -> Result<Vec<Chunk>, ChunkingError> {
    let chunks = match strategy {
        ChunkStrategy::Semantic => {
            if params.max_tokens == 0 {
                return Err(ChunkingError::InvalidBudget);
            }
            semantic::chunk(text, params.max_tokens, params.overlap_tokens, None, tokenizer)
        }
        ChunkStrategy::StructureAware => {
            if params.max_tokens == 0 {
                return Err(ChunkingError::InvalidBudget);
            }
            structure::chunk(
                text,
                layout.unwrap_or(&[]),
                params.max_tokens,
                params.overlap_tokens,
                tokenizer,
            )
        }
        ChunkStrategy::SlidingWindow => {
            if params.window_size == 0 {
                return Err(ChunkingError::InvalidBudget);
            }
            window::chunk(
                text,
                params.window_size,
                params.window_overlap,
                None,
                tokenizer,
            )?
        }
    };

    debug_assert!(
        chunks
            .iter()
            .enumerate()
            .all(|(position, chunk)| chunk.chunk_index == position),
        "chunk_index must be dense and strictly increasing"
    );

    tracing::debug!(
        strategy = strategy.as_str(),
        chunks = chunks.len(),
        "Chunked document text"
    );

    Ok(chunks)
}

pub(crate) fn make_chunk(
    content: String,
    chunk_index: usize,
    page_number: Option<u32>,
    strategy: ChunkStrategy,
    token_count: usize,
    section_title: Option<String>,
) -> Chunk {
    let content_hash = compute_content_hash(&content);
    Chunk {
        content,
        chunk_index,
        page_number,
        metadata: ChunkMetadata {
            strategy: strategy.as_str().to_string(),
            token_count,
            content_hash,
            section_title,
        },
    }
}
