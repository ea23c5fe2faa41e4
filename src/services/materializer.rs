//! Boundary materialization: boundaries into concrete chunk records.

use crate::models::{ChunkBoundary, ChunkMaterial};
use crate::services::snippet::keyword_tokens;

/// Materialize planned boundaries into transient chunk records carrying the
/// exact text slice, the section label, and label-derived keywords.
pub fn materialize(content: &str, boundaries: &[ChunkBoundary]) -> Vec<ChunkMaterial> {
    boundaries
        .iter()
        .map(|boundary| {
            let keywords = boundary
                .label
                .as_deref()
                .map(keyword_tokens)
                .unwrap_or_default();
            ChunkMaterial {
                boundary: boundary.clone(),
                text: content[boundary.start..boundary.end].to_string(),
                keywords,
            }
        })
        .collect()
}
