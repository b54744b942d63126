//! Token counting and encoding over one fixed sub-word vocabulary.
//!
//! Every chunking strategy and every token-based validator threshold in this
//! crate goes through [`Tokenizer`], so size bounds mean the same thing at
//! every pipeline stage. The encoding is pinned to `cl100k_base`; counting is
//! pure and deterministic, and the handle is cheap to clone and safe to share
//! across concurrent workers.

use anyhow::Error as EncodingError;
use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::{CoreBPE, cl100k_base};

/// Errors raised while loading or using the shared encoding.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// The encoding tables could not be initialized.
    #[error("failed to load the '{encoding}' encoding: {source}")]
    Load {
        /// Name of the encoding we attempted to load.
        encoding: &'static str,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: EncodingError,
    },
    /// A token window could not be decoded back to text.
    #[error("failed to decode token window: {source}")]
    Decode {
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: EncodingError,
    },
}

/// Shared token counter and codec for the ingestion pipeline.
#[derive(Clone)]
pub struct Tokenizer {
    bpe: Arc<CoreBPE>,
}

impl Tokenizer {
    /// Name of the pinned encoding.
    pub const ENCODING: &'static str = "cl100k_base";

    /// Load the pinned `cl100k_base` encoding.
    pub fn cl100k() -> Result<Self, TokenizerError> {
        let bpe = cl100k_base().map_err(|source| TokenizerError::Load {
            encoding: Self::ENCODING,
            source,
        })?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Count the tokens in a text span.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Encode text into the token stream used by the sliding-window strategy.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    /// Decode a token slice back into text.
    pub fn decode(&self, tokens: Vec<u32>) -> Result<String, TokenizerError> {
        self.bpe
            .decode(tokens)
            .map_err(|source| TokenizerError::Decode { source })
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("encoding", &Self::ENCODING)
            .finish()
    }
}
