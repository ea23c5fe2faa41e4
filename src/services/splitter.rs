//! Recursive separator-priority text splitter.
//!
//! Splits text into fragments no longer than a target character size,
//! preferring the most semantic break available: markdown headers, then
//! horizontal rules, then blank lines, lines, words, and finally raw
//! character windows. Separators stay attached to the fragment that follows
//! them, so a header always leads its own section.
//!
//! The splitter never rewrites content: every fragment is a contiguous
//! substring of the input, and the text between two consecutive fragments is
//! whitespace only. The planner relies on that to map fragments back to
//! exact offsets.

/// Separators in priority order. The empty string is the terminal
/// character-window split and always matches.
const SEPARATORS: &[&str] = &[
    "\n# ", "\n## ", "\n### ", "\n#### ", "\n##### ", "\n###### ",
    "\n---\n", "\n***\n", "\n___\n",
    "\n\n", "\n", " ", "",
];

/// Split `text` into trimmed, non-empty fragments of at most `target` chars
/// (a fragment may exceed the target only when a single unbreakable run of
/// non-whitespace characters does).
pub fn split_text(text: &str, target: usize) -> Vec<String> {
    split_recursive(text, target.max(1), SEPARATORS)
        .into_iter()
        .map(|fragment| fragment.trim().to_string())
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn split_recursive(text: &str, target: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= target {
        return vec![text.to_string()];
    }

    let (separator, rest) = pick_separator(text, separators);
    let pieces = if separator.is_empty() {
        char_windows(text, target)
    } else {
        split_before(text, separator)
    };

    // Merge adjacent pieces up to the target; recurse into oversized ones
    // with the lower-priority separators.
    let mut fragments = Vec::new();
    let mut buffer = String::new();
    for piece in pieces {
        if char_len(piece) > target {
            if !buffer.is_empty() {
                fragments.push(std::mem::take(&mut buffer));
            }
            fragments.extend(split_recursive(piece, target, rest));
        } else if char_len(&buffer) + char_len(piece) > target {
            if !buffer.is_empty() {
                fragments.push(std::mem::take(&mut buffer));
            }
            buffer.push_str(piece);
        } else {
            buffer.push_str(piece);
        }
    }
    if !buffer.is_empty() {
        fragments.push(buffer);
    }

    fragments
}

/// First separator that occurs in `text`, plus the lower-priority tail.
fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split before each occurrence of `sep`, keeping the separator with the
/// following piece. Pieces concatenate back to the original text.
fn split_before<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut search = 0;
    while let Some(pos) = text[search..].find(sep) {
        let at = search + pos;
        if at > start {
            pieces.push(&text[start..at]);
            start = at;
        }
        search = at + sep.len();
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Fixed-size character windows, the last resort for unbreakable runs.
fn char_windows(text: &str, target: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == target {
            pieces.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
