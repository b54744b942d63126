//! Sentence-boundary chunking with trailing overlap.

use super::{ChunkStrategy, make_chunk};
use crate::model::Chunk;
use crate::tokenizer::Tokenizer;

/// Chunk text by accumulating whole sentences up to `max_tokens`.
///
/// When appending the next sentence would push a non-empty buffer past the
/// budget, the buffer is emitted and the next buffer is seeded with trailing
/// sentences whose combined token count stays within `overlap_tokens`. A
/// single sentence longer than the budget is still emitted whole; sentences
/// are never split.
pub(crate) fn chunk(
    text: &str,
    max_tokens: usize,
    overlap_tokens: usize,
    page_number: Option<u32>,
    tokenizer: &Tokenizer,
) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let sentences = split_sentences(text);
    let mut chunks = Vec::new();
    let mut buffer: Vec<String> = Vec::new();
    let mut buffer_tokens = 0usize;

    for sentence in sentences {
        let sentence_tokens = tokenizer.count(&sentence);

        if buffer_tokens + sentence_tokens > max_tokens && !buffer.is_empty() {
            let content = buffer.join(" ");
            chunks.push(make_chunk(
                content,
                chunks.len(),
                page_number,
                ChunkStrategy::Semantic,
                buffer_tokens,
                None,
            ));

            let (seed, seed_tokens) = trailing_overlap(&buffer, overlap_tokens, tokenizer);
            buffer = seed;
            buffer_tokens = seed_tokens;
        }

        buffer.push(sentence);
        buffer_tokens += sentence_tokens;
    }

    if !buffer.is_empty() {
        let content = buffer.join(" ");
        let token_count = tokenizer.count(&content);
        chunks.push(make_chunk(
            content,
            chunks.len(),
            page_number,
            ChunkStrategy::Semantic,
            token_count,
            None,
        ));
    }

    chunks
}

/// Walk backward through the emitted buffer, keeping whole sentences while
/// their combined token count stays within `overlap_tokens`.
fn trailing_overlap(
    buffer: &[String],
    overlap_tokens: usize,
    tokenizer: &Tokenizer,
) -> (Vec<String>, usize) {
    let mut seed: Vec<String> = Vec::new();
    let mut seed_tokens = 0usize;

    for sentence in buffer.iter().rev() {
        let sentence_tokens = tokenizer.count(sentence);
        if seed_tokens + sentence_tokens > overlap_tokens {
            break;
        }
        seed.insert(0, sentence.clone());
        seed_tokens += sentence_tokens;
    }

    (seed, seed_tokens)
}

/// Split text into sentences at terminal punctuation followed by whitespace
/// and an uppercase letter.
///
/// Hand-rolled scanner rather than a regex: the boundary needs lookbehind and
/// lookahead, which the `regex` crate does not support.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (_, c) = chars[i];
        if matches!(c, '.' | '!' | '?') {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            if j > i + 1 && j < chars.len() && chars[j].1.is_uppercase() {
                let boundary = chars[i + 1].0;
                let sentence = text[start..boundary].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = chars[j].0;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}
