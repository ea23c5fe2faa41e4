//! Text processing utilities.

/// True when content is empty or whitespace-only.
pub fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

/// Collapse all whitespace runs to single spaces and trim the edges.
pub fn normalize_whitespace(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   \n\t  "));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\nb\t c  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace("one"), "one");
    }
}
