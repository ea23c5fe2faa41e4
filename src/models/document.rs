use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use uuid::Uuid;

/// Maximum number of tags carried on a document.
pub const MAX_TAGS: usize = 12;

/// A knowledge-base document as seen by this pipeline.
///
/// The relational metadata store owns this record; the pipeline reads `id`
/// and `content` and writes back `embedding_model` after a reindex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub title: String,
    pub summary: String,
    /// Optional usage-policy string attached by the owning service.
    pub politic: Option<String>,
    /// Name of the embedding model last used to embed this document's chunks.
    pub embedding_model: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Normalize a tag set: lower-cased, deduplicated, capped at [`MAX_TAGS`].
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let normalized = tag.as_ref().trim().to_lowercase();
        if normalized.is_empty() || out.contains(&normalized) {
            continue;
        }
        out.push(normalized);
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

/// Half-open byte-offset span into a specific document's content.
///
/// A valid plan partitions `[0, content.len())` exactly: boundaries sorted by
/// `start`, no gaps, no overlaps, `start < end` for every boundary, first
/// boundary at 0 and last ending at `content.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkBoundary {
    pub start: usize,
    pub end: usize,
    /// Markdown section heading covering this span, when one was detected.
    pub label: Option<String>,
}

impl ChunkBoundary {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            label: None,
        }
    }

    pub fn with_label(start: usize, end: usize, label: Option<String>) -> Self {
        Self { start, end, label }
    }

    /// Span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A boundary plus its materialized text slice, carried to embedding.
/// Transient: never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMaterial {
    pub boundary: ChunkBoundary,
    pub text: String,
    pub keywords: Vec<String>,
}

/// A chunk as persisted in the vector index, keyed by its content-addressed id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub doc_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub start_offset: u64,
    pub end_offset: u64,
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub keywords: Vec<String>,
    pub created_at: String,
}

impl StoredChunk {
    /// Deterministic content-addressed point id.
    ///
    /// Derived from `(doc_id, SHA-1(text))` via UUIDv5, so re-chunking
    /// identical content reproduces the same id: repeated syncs and
    /// partial-failure retries never create duplicate points.
    pub fn point_id(doc_id: &str, text: &str) -> String {
        let digest = Sha1::digest(text.as_bytes());
        let name = format!("{}|{}", doc_id, hex::encode(digest));
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_deterministic() {
        let a = StoredChunk::point_id("doc1", "hello");
        let b = StoredChunk::point_id("doc1", "hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn test_point_id_varies_with_content_and_doc() {
        let base = StoredChunk::point_id("doc1", "hello");
        assert_ne!(base, StoredChunk::point_id("doc1", "hello!"));
        assert_ne!(base, StoredChunk::point_id("doc2", "hello"));
    }

    #[test]
    fn test_boundary_len() {
        let b = ChunkBoundary::new(8, 15);
        assert_eq!(b.len(), 7);
        assert!(!b.is_empty());
        assert!(ChunkBoundary::new(3, 3).is_empty());
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(["Rust", "rust", "  DB  ", "", "db"]);
        assert_eq!(tags, vec!["rust".to_string(), "db".to_string()]);

        let many: Vec<String> = (0..20).map(|i| format!("tag{i}")).collect();
        assert_eq!(normalize_tags(&many).len(), MAX_TAGS);
    }
}
