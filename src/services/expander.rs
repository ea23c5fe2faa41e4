//! Query expansion: paraphrase/keyword variants to widen recall.
//!
//! The LLM response is validated against a strict shape at this boundary and
//! any failure degrades to the original query alone. Expansion never fails a
//! search.

use std::sync::Arc;

use serde::Deserialize;

use crate::services::completion::ChatCompleter;

/// Hard cap on variants, original included.
pub const MAX_VARIANTS: usize = 5;

/// Maximum words per variant; longer output is clamped.
const MAX_VARIANT_WORDS: usize = 12;

const SYSTEM_PROMPT: &str = "You rewrite search queries for a knowledge base. \
    Produce short paraphrases and keyword variants of the user's query. \
    Respond with strict JSON of the form {\"queries\": [\"...\"]} and nothing else. \
    Each variant must be at most 12 words. Return between 1 and 4 variants.";

/// Expected completion payload.
#[derive(Debug, Deserialize)]
struct ExpansionPayload {
    queries: Vec<String>,
}

/// Produces 1–5 query variants for retrieval, the original always first.
pub struct QueryExpander {
    completer: Arc<dyn ChatCompleter>,
    max_variants: usize,
}

impl QueryExpander {
    pub fn new(completer: Arc<dyn ChatCompleter>, max_variants: u32) -> Self {
        Self {
            completer,
            max_variants: (max_variants as usize).clamp(1, MAX_VARIANTS),
        }
    }

    /// Expand `query` into deduplicated variants. Infallible by design: on
    /// any completion or validation failure the original query is returned
    /// alone.
    pub async fn expand(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        let mut variants = vec![query.to_string()];
        if self.max_variants == 1 {
            return variants;
        }

        let raw = match self.completer.complete(SYSTEM_PROMPT, query).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(%error, "query expansion failed, using original query only");
                return variants;
            }
        };

        let Some(expanded) = parse_variants(&raw) else {
            tracing::warn!("query expansion returned malformed output, using original query only");
            return variants;
        };

        for variant in expanded {
            if variants.len() == self.max_variants {
                break;
            }
            let clamped = clamp_words(variant.trim());
            if clamped.is_empty() {
                continue;
            }
            if variants
                .iter()
                .any(|v| v.eq_ignore_ascii_case(&clamped))
            {
                continue;
            }
            variants.push(clamped);
        }

        variants
    }
}

/// Parse the strict `{"queries": [...]}` shape, tolerating a fenced code
/// block around it.
fn parse_variants(raw: &str) -> Option<Vec<String>> {
    let trimmed = strip_code_fence(raw.trim());
    let payload: ExpansionPayload = serde_json::from_str(trimmed).ok()?;
    if payload.queries.is_empty() {
        return None;
    }
    Some(payload.queries)
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    // Drop an optional language tag on the fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .map(str::trim_end)
        .unwrap_or(raw)
}

fn clamp_words(variant: &str) -> String {
    variant
        .split_whitespace()
        .take(MAX_VARIANT_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}
