//! Snippet extraction from retrieved chunks.
//!
//! Pure functions, no failure modes: non-empty input always produces some
//! excerpt through a keyword-window → best-sentence → edge-truncation
//! fallback chain.

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::text::normalize_whitespace;

/// Characters kept on each side of a keyword match.
const WINDOW_RADIUS: usize = 120;

/// Text at or under this length is returned verbatim by the edge fallback.
const EDGE_LIMIT: usize = 500;

/// Characters kept from each edge when the edge fallback truncates.
const EDGE_KEEP: usize = 250;

const ELLIPSIS: &str = "...";

static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").unwrap());

/// Build a human-readable excerpt of `text` oriented around `keywords`.
pub fn build_snippet(text: &str, keywords: &[String]) -> String {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return String::new();
    }
    if let Some(snippet) = keyword_window(&normalized, keywords) {
        return snippet;
    }
    if let Some(snippet) = best_sentence(&normalized, keywords) {
        return snippet;
    }
    edge_excerpt(&normalized)
}

/// Lower-cased alphanumeric tokens of length ≥ 3, deduplicated in order.
pub fn keyword_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for found in RE_TOKEN.find_iter(&lowered) {
        let token = found.as_str();
        if token.chars().count() >= 3 && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Keyword set for snippet building: tokens of the original query and all
/// expanded variants, merged.
pub fn extract_keywords(query: &str, variants: &[String]) -> Vec<String> {
    let mut combined = query.to_string();
    for variant in variants {
        combined.push(' ');
        combined.push_str(variant);
    }
    keyword_tokens(&combined)
}

/// Window around the earliest case-insensitive keyword occurrence.
fn keyword_window(normalized: &str, keywords: &[String]) -> Option<String> {
    let chars: Vec<char> = normalized.chars().collect();
    let lowered: Vec<char> = chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect();

    let mut earliest: Option<(usize, usize)> = None;
    for keyword in keywords {
        let needle: Vec<char> = keyword.to_lowercase().chars().collect();
        if needle.is_empty() {
            continue;
        }
        if let Some(pos) = find_chars(&lowered, &needle)
            && earliest.is_none_or(|(best, _)| pos < best)
        {
            earliest = Some((pos, needle.len()));
        }
    }

    let (pos, keyword_len) = earliest?;
    let start = pos.saturating_sub(WINDOW_RADIUS);
    let end = (pos + keyword_len + WINDOW_RADIUS).min(chars.len());

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(&chars[start..end]);
    if end < chars.len() {
        snippet.push_str(ELLIPSIS);
    }
    Some(snippet)
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Sentence containing the most distinct keywords; first sentence when no
/// keyword scores and ties go to the earlier sentence.
fn best_sentence(normalized: &str, keywords: &[String]) -> Option<String> {
    let sentences: Vec<&str> = normalized
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return None;
    }

    if keywords.is_empty() {
        // With a single sentence there is nothing to choose between; let the
        // edge fallback return the full text.
        return if sentences.len() > 1 {
            Some(sentences[0].to_string())
        } else {
            None
        };
    }

    let mut best = sentences[0];
    let mut best_score = 0usize;
    for sentence in &sentences {
        let lowered = sentence.to_lowercase();
        let score = keywords
            .iter()
            .filter(|k| lowered.contains(&k.to_lowercase()))
            .count();
        if score > best_score {
            best = sentence;
            best_score = score;
        }
    }
    Some(best.to_string())
}

/// First and last [`EDGE_KEEP`] characters joined by an ellipsis; short text
/// verbatim.
fn edge_excerpt(normalized: &str) -> String {
    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() <= EDGE_LIMIT {
        return normalized.to_string();
    }
    let head: String = chars[..EDGE_KEEP].iter().collect();
    let tail: String = chars[chars.len() - EDGE_KEEP..].iter().collect();
    format!("{head} {ELLIPSIS} {tail}")
}
