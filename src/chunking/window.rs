//! Fixed-size sliding-window chunking over the token stream.

use super::{ChunkStrategy, ChunkingError, make_chunk};
use crate::model::Chunk;
use crate::tokenizer::Tokenizer;

/// Chunk text by sliding a fixed token window with a configurable overlap.
///
/// The stride is `window_size - overlap`, clamped to at least 1 so progress is
/// guaranteed even when the overlap meets or exceeds the window. Each window
/// is decoded back to text; the final partial window is emitted exactly once
/// and the loop stops at the end of the token stream.
pub(crate) fn chunk(
    text: &str,
    window_size: usize,
    overlap: usize,
    page_number: Option<u32>,
    tokenizer: &Tokenizer,
) -> Result<Vec<Chunk>, ChunkingError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let tokens = tokenizer.encode(text);
    let stride = window_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < tokens.len() {
        let end = (start + window_size).min(tokens.len());
        let content = tokenizer.decode(tokens[start..end].to_vec())?;
        chunks.push(make_chunk(
            content,
            chunks.len(),
            page_number,
            ChunkStrategy::SlidingWindow,
            end - start,
            None,
        ));

        if end >= tokens.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::cl100k().expect("encoding loads")
    }

    const TEXT: &str = "Sliding windows cover the whole token stream without gaps, \
                        and the final partial window is emitted exactly once before \
                        the loop terminates for good.";

    #[test]
    fn windows_cover_every_token_and_end_at_the_final_token() {
        let tokenizer = tokenizer();
        let total = tokenizer.count(TEXT);
        let window_size = 10;
        let overlap = 3;
        let chunks = chunk(TEXT, window_size, overlap, None, &tokenizer).unwrap();

        let stride = window_size - overlap;
        let mut covered = vec![false; total];
        for (position, chunk) in chunks.iter().enumerate() {
            let start = position * stride;
            let end = (start + window_size).min(total);
            assert_eq!(chunk.metadata.token_count, end - start);
            for slot in covered.iter_mut().take(end).skip(start) {
                *slot = true;
            }
        }
        assert!(covered.iter().all(|&seen| seen), "uncovered token positions");

        let last = chunks.last().unwrap();
        let last_start = (chunks.len() - 1) * stride;
        assert_eq!(last_start + last.metadata.token_count, total);
    }

    #[test]
    fn final_partial_window_is_emitted_once() {
        let tokenizer = tokenizer();
        let total = tokenizer.count(TEXT);
        let window_size = 8;
        let overlap = 0;
        let chunks = chunk(TEXT, window_size, overlap, None, &tokenizer).unwrap();

        let expected = total.div_ceil(window_size);
        assert_eq!(chunks.len(), expected);
    }

    #[test]
    fn stride_is_clamped_when_overlap_meets_window_size() {
        let tokenizer = tokenizer();
        let chunks = chunk("tiny sample text for striding", 4, 4, None, &tokenizer).unwrap();
        // Overlap >= window would otherwise loop forever; stride clamps to 1.
        assert!(!chunks.is_empty());
        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, position);
        }
    }

    #[test]
    fn short_text_becomes_a_single_window() {
        let tokenizer = tokenizer();
        let chunks = chunk("short text", 512, 50, Some(7), &tokenizer).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "short text");
        assert_eq!(chunks[0].page_number, Some(7));
        assert_eq!(chunks[0].metadata.strategy, "sliding_window");
    }

    #[test]
    fn empty_text_yields_no_windows() {
        let chunks = chunk("  ", 8, 2, None, &tokenizer()).unwrap();
        assert!(chunks.is_empty());
    }
}
