//! Core data types shared across the ingestion pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A document parsed by the upstream extraction stage.
///
/// Parsed documents are read-only inputs to this crate: the chunking engine
/// consumes `full_text` (and optionally the per-page layout) and never
/// mutates the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Stable identifier derived deterministically from the source name.
    pub document_id: String,
    /// Original file name of the source document.
    pub document_name: String,
    /// URL where the source document can be retrieved.
    pub document_url: String,
    /// Flattened text content across all pages.
    pub full_text: String,
    /// Ordered pages as reported by the parser.
    pub pages: Vec<Page>,
    /// Number of pages; must equal `pages.len()`.
    pub page_count: usize,
}

impl ParsedDocument {
    /// Derive the stable document identifier for a source name.
    ///
    /// Uses a v5 UUID in the URL namespace so that re-ingesting the same
    /// source always maps to the same identifier.
    pub fn id_for_name(name: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
    }

    /// Collect the layout elements of every page in document order.
    pub fn layout(&self) -> Vec<LayoutElement> {
        self.pages
            .iter()
            .flat_map(|page| page.layout.iter().cloned())
            .collect()
    }
}

/// One page of a parsed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub page_number: u32,
    /// Text content of the page.
    pub content: String,
    /// Layout elements detected on the page.
    #[serde(default)]
    pub layout: Vec<LayoutElement>,
}

/// A paragraph-level layout element with an optional role annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutElement {
    /// Text content of the element.
    pub content: String,
    /// Role tag assigned by the parser, e.g. `sectionHeading`.
    #[serde(default)]
    pub role: Option<String>,
    /// Page numbers this element spans.
    #[serde(default)]
    pub page_refs: Vec<u32>,
}

impl LayoutElement {
    /// Whether this element starts a new section.
    pub fn is_section_heading(&self) -> bool {
        self.role.as_deref() == Some("sectionHeading")
    }
}

/// A bounded span of document text prepared for embedding and retrieval.
///
/// Chunks are immutable once produced; `chunk_index` is dense and strictly
/// increasing within one chunking invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text content.
    pub content: String,
    /// Dense position of the chunk within its document, starting at 0.
    pub chunk_index: usize,
    /// Page the chunk originated from, when known.
    pub page_number: Option<u32>,
    /// Strategy and sizing metadata recorded at chunking time.
    pub metadata: ChunkMetadata,
}

/// Metadata attached to every chunk by the chunking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Name of the strategy that produced the chunk.
    pub strategy: String,
    /// Token count of the chunk content under the shared encoding.
    pub token_count: usize,
    /// SHA-256 hex digest of the chunk content, stamped at chunking time so
    /// failed records can be traced back to their exact text.
    pub content_hash: String,
    /// Section title inherited from the surrounding heading, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
}

/// A record ready for upload to the remote search index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Unique record key, `{document_id}_chunk_{chunk_index}`.
    pub id: String,
    /// Chunk text stored alongside the vector.
    pub content: String,
    /// Embedding vector for the chunk content.
    pub content_vector: Vec<f32>,
    /// Identifier of the owning document.
    pub document_id: String,
    /// Name of the owning document.
    pub document_name: String,
    /// URL of the owning document.
    pub document_url: String,
    /// Page the chunk originated from; 0 when unknown.
    pub page_number: u32,
    /// Dense chunk position within the document.
    pub chunk_index: usize,
    /// Chunk metadata serialized as a JSON string.
    pub metadata: String,
    /// Tenant organization the record belongs to.
    pub organization_id: String,
    /// Tenant folder the record belongs to.
    pub folder_id: String,
}

/// Tenant scoping fields stamped onto every index record.
#[derive(Debug, Clone, Default)]
pub struct TenantScope {
    /// Owning organization identifier.
    pub organization_id: String,
    /// Owning folder identifier.
    pub folder_id: String,
}

/// Lifecycle status of a document as it moves through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Source file landed in storage, nothing processed yet.
    Uploaded,
    /// Parsing in progress.
    Parsing,
    /// Parsing finished.
    Parsed,
    /// Chunking in progress.
    Chunking,
    /// Chunking finished.
    Chunked,
    /// Embedding generation in progress.
    Embedding,
    /// Embedding generation finished.
    Embedded,
    /// Index upload in progress.
    Indexing,
    /// Every chunk of the document was indexed.
    Indexed,
    /// Some chunks were indexed, some failed.
    PartialSuccess,
    /// The document could not be indexed.
    Failed,
}

impl DocumentStatus {
    /// Stable string form used by status stores.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Parsing => "parsing",
            Self::Parsed => "parsed",
            Self::Chunking => "chunking",
            Self::Chunked => "chunked",
            Self::Embedding => "embedding",
            Self::Embedded => "embedded",
            Self::Indexing => "indexing",
            Self::Indexed => "indexed",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the SHA-256 hex digest the chunking engine stamps into
/// [`ChunkMetadata::content_hash`].
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_deterministic() {
        let a = ParsedDocument::id_for_name("reports/q3.pdf");
        let b = ParsedDocument::id_for_name("reports/q3.pdf");
        let c = ParsedDocument::id_for_name("reports/q4.pdf");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn content_hash_is_stable() {
        let h1 = compute_content_hash("Hello world");
        let h2 = compute_content_hash("Hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(DocumentStatus::PartialSuccess.as_str(), "partial_success");
        assert_eq!(DocumentStatus::Indexed.to_string(), "indexed");
        let parsed: DocumentStatus = serde_json::from_str("\"partial_success\"").unwrap();
        assert_eq!(parsed, DocumentStatus::PartialSuccess);
    }

    #[test]
    fn layout_flattens_pages_in_order() {
        let doc = ParsedDocument {
            document_id: "d".into(),
            document_name: "d.pdf".into(),
            document_url: "https://example.test/d.pdf".into(),
            full_text: "text".into(),
            pages: vec![
                Page {
                    page_number: 1,
                    content: "a".into(),
                    layout: vec![LayoutElement {
                        content: "Intro".into(),
                        role: Some("sectionHeading".into()),
                        page_refs: vec![1],
                    }],
                },
                Page {
                    page_number: 2,
                    content: "b".into(),
                    layout: vec![LayoutElement {
                        content: "Body".into(),
                        role: None,
                        page_refs: vec![2],
                    }],
                },
            ],
            page_count: 2,
        };

        let layout = doc.layout();
        assert_eq!(layout.len(), 2);
        assert!(layout[0].is_section_heading());
        assert!(!layout[1].is_section_heading());
    }
}
