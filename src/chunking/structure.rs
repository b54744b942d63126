//! Structure-aware chunking driven by layout headings.

use super::{ChunkStrategy, make_chunk, semantic};
use crate::model::{Chunk, LayoutElement};
use crate::tokenizer::Tokenizer;

struct Section {
    title: Option<String>,
    paragraphs: Vec<String>,
}

/// Chunk text by grouping consecutive paragraphs into heading-delimited
/// sections.
///
/// A section that fits within `max_tokens` becomes one chunk tagged with its
/// title. An oversized section is re-chunked with the semantic strategy; the
/// resulting sub-chunks inherit the section title and carry the
/// `structure_aware` tag. Without layout data the strategy degrades to plain
/// semantic chunking over the raw text.
pub(crate) fn chunk(
    text: &str,
    layout: &[LayoutElement],
    max_tokens: usize,
    overlap_tokens: usize,
    tokenizer: &Tokenizer,
) -> Vec<Chunk> {
    if layout.is_empty() {
        return semantic::chunk(text, max_tokens, overlap_tokens, None, tokenizer);
    }

    let mut chunks = Vec::new();
    for section in group_sections(layout) {
        let body = section.paragraphs.join("\n");
        let body_tokens = tokenizer.count(&body);

        if body_tokens <= max_tokens {
            chunks.push(make_chunk(
                body,
                chunks.len(),
                None,
                ChunkStrategy::StructureAware,
                body_tokens,
                section.title.clone(),
            ));
            continue;
        }

        // Oversized section: split semantically, renumber across the whole
        // document, and overwrite the strategy tag.
        for sub in semantic::chunk(&body, max_tokens, overlap_tokens, None, tokenizer) {
            let mut sub = sub;
            sub.chunk_index = chunks.len();
            sub.metadata.strategy = ChunkStrategy::StructureAware.as_str().to_string();
            sub.metadata.section_title = section.title.clone();
            chunks.push(sub);
        }
    }

    chunks
}

/// Group paragraphs into sections, starting a new section at every heading.
///
/// Heading text becomes the next section's title and is not part of any
/// section body. Whitespace-only paragraphs are skipped.
fn group_sections(layout: &[LayoutElement]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        title: None,
        paragraphs: Vec::new(),
    };

    for element in layout {
        let content = element.content.trim();
        if content.is_empty() {
            continue;
        }

        if element.is_section_heading() {
            if !current.paragraphs.is_empty() {
                sections.push(current);
            }
            current = Section {
                title: Some(content.to_string()),
                paragraphs: Vec::new(),
            };
        } else {
            current.paragraphs.push(content.to_string());
        }
    }

    if !current.paragraphs.is_empty() {
        sections.push(current);
    }

    sections
}
