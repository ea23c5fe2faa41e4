//! Chunk boundary planning with validation and shrink-and-retry.
//!
//! [`TextChunkPlanner::plan`] produces non-overlapping, whitespace-exact
//! boundaries bounded by a token budget and a maximum chunk count. It tries
//! the separator-priority splitter at a decreasing target size; each attempt
//! maps the split fragments back to exact offsets in the original content and
//! is validated before being accepted. An attempt can only ever discard
//! whitespace, never content.

use crate::error::ChunkPlanError;
use crate::models::{ChunkBoundary, ChunkingConfig};
use crate::services::splitter::split_text;

/// Smallest target size attempted, in characters.
const MIN_ATTEMPT_SIZE: usize = 100;

/// Shrink ratio between attempts.
const SHRINK_NUMERATOR: usize = 4;
const SHRINK_DENOMINATOR: usize = 5;

/// Hard floor on the per-chunk length limit, in characters.
const MIN_CHUNK_LENGTH_LIMIT: usize = 200;

/// Why a single planning attempt was rejected. Attempt failures are retried
/// at the next smaller size; only exhausting every size surfaces an error.
#[derive(Debug, PartialEq, Eq)]
enum AttemptError {
    /// A split fragment could not be located at or after the cursor.
    SplitNotFound { fragment_index: usize },
    /// The skipped-over gap before a fragment contained non-whitespace.
    GapNotWhitespace { fragment_index: usize },
    /// More boundaries than `max_chunk_count`.
    TooManyChunks { count: usize },
    /// A boundary exceeded the per-chunk character limit.
    ChunkTooLong { index: usize, chars: usize },
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::SplitNotFound { fragment_index } => {
                write!(f, "fragment {fragment_index} not found in content")
            }
            AttemptError::GapNotWhitespace { fragment_index } => {
                write!(f, "non-whitespace gap before fragment {fragment_index}")
            }
            AttemptError::TooManyChunks { count } => write!(f, "{count} chunks over budget"),
            AttemptError::ChunkTooLong { index, chars } => {
                write!(f, "chunk {index} is {chars} chars, over limit")
            }
        }
    }
}

/// Plans chunk boundaries for document content.
#[derive(Debug, Clone)]
pub struct TextChunkPlanner {
    max_chunk_count: usize,
    /// Per-chunk character limit: `max(200, max_tokens_per_chunk * 4)`.
    max_chunk_chars: usize,
    /// First attempt target: `max_tokens_per_chunk * chars_per_token`.
    initial_target: usize,
}

impl TextChunkPlanner {
    pub fn new(config: &ChunkingConfig) -> Self {
        let max_tokens = config.max_tokens_per_chunk as usize;
        Self {
            max_chunk_count: config.max_chunk_count as usize,
            max_chunk_chars: MIN_CHUNK_LENGTH_LIMIT.max(max_tokens * 4),
            initial_target: (max_tokens * config.chars_per_token as usize).max(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    /// Plan boundaries partitioning `[0, content.len())`.
    ///
    /// Empty or whitespace-only content yields an empty plan. Otherwise the
    /// planner walks its candidate sizes largest-first and returns the first
    /// attempt that validates, or [`ChunkPlanError::InvalidChunkPlan`] when
    /// every size is exhausted.
    pub fn plan(&self, content: &str) -> Result<Vec<ChunkBoundary>, ChunkPlanError> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sizes = self.candidate_sizes();
        for (attempt, &target) in sizes.iter().enumerate() {
            match self.attempt(content, target) {
                Ok(boundaries) => {
                    tracing::debug!(
                        attempt,
                        target,
                        chunks = boundaries.len(),
                        "chunk plan accepted"
                    );
                    return Ok(boundaries);
                }
                Err(reason) => {
                    tracing::debug!(attempt, target, %reason, "chunk plan attempt rejected");
                }
            }
        }

        Err(ChunkPlanError::InvalidChunkPlan {
            attempts: sizes.len(),
        })
    }

    /// Candidate target sizes, shrinking ×0.8 down to the floor. A budget
    /// already below the floor is attempted once as-is.
    fn candidate_sizes(&self) -> Vec<usize> {
        let mut size = self.initial_target;
        if size <= MIN_ATTEMPT_SIZE {
            return vec![size];
        }
        let mut sizes = Vec::new();
        while size > MIN_ATTEMPT_SIZE {
            sizes.push(size);
            size = size * SHRINK_NUMERATOR / SHRINK_DENOMINATOR;
        }
        sizes.push(MIN_ATTEMPT_SIZE);
        sizes
    }

    /// One planning attempt at a fixed target size.
    fn attempt(&self, content: &str, target: usize) -> Result<Vec<ChunkBoundary>, AttemptError> {
        let fragments = split_text(content, target);

        // Locate each fragment at or after the cursor; anything skipped over
        // must be whitespace so the plan never drops content.
        let mut starts = Vec::with_capacity(fragments.len());
        let mut labels = Vec::with_capacity(fragments.len());
        let mut cursor = 0usize;
        for (fragment_index, fragment) in fragments.iter().enumerate() {
            let found = content[cursor..]
                .find(fragment.as_str())
                .map(|i| cursor + i)
                .ok_or(AttemptError::SplitNotFound { fragment_index })?;
            if !content[cursor..found].chars().all(char::is_whitespace) {
                return Err(AttemptError::GapNotWhitespace { fragment_index });
            }
            starts.push(found);
            labels.push(heading_label(fragment));
            cursor = found + fragment.len();
        }
        if !content[cursor..].chars().all(char::is_whitespace) {
            return Err(AttemptError::GapNotWhitespace {
                fragment_index: fragments.len(),
            });
        }

        // Boundaries absorb inter-fragment whitespace: each ends where the
        // next fragment starts, the first starts at 0, the last extends over
        // any trailing whitespace to the end of content.
        let mut boundaries = Vec::with_capacity(starts.len());
        for (i, label) in labels.into_iter().enumerate() {
            let start = if i == 0 { 0 } else { starts[i] };
            let end = starts.get(i + 1).copied().unwrap_or(content.len());
            boundaries.push(ChunkBoundary::with_label(start, end, label));
        }

        self.validate(content, &boundaries)?;
        Ok(boundaries)
    }

    fn validate(&self, content: &str, boundaries: &[ChunkBoundary]) -> Result<(), AttemptError> {
        if boundaries.len() > self.max_chunk_count {
            return Err(AttemptError::TooManyChunks {
                count: boundaries.len(),
            });
        }
        debug_assert!(validate_partition(content, boundaries));
        for (index, boundary) in boundaries.iter().enumerate() {
            let chars = content[boundary.start..boundary.end].chars().count();
            if chars > self.max_chunk_chars {
                return Err(AttemptError::ChunkTooLong { index, chars });
            }
        }
        Ok(())
    }
}

/// Check the partition invariant: sorted, gapless, non-overlapping boundaries
/// spanning exactly `[0, content.len())` with `start < end` everywhere.
pub fn validate_partition(content: &str, boundaries: &[ChunkBoundary]) -> bool {
    if boundaries.is_empty() {
        return content.is_empty();
    }
    if boundaries[0].start != 0 || boundaries[boundaries.len() - 1].end != content.len() {
        return false;
    }
    for window in boundaries.windows(2) {
        if window[0].end != window[1].start {
            return false;
        }
    }
    boundaries.iter().all(|b| b.start < b.end)
}

/// Markdown heading text when the fragment opens with one.
fn heading_label(fragment: &str) -> Option<String> {
    let first_line = fragment.lines().next()?;
    let trimmed = first_line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let title = trimmed[hashes..].trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkingConfig;

    fn small_planner(max_tokens: u32, max_chunks: u32) -> TextChunkPlanner {
        TextChunkPlanner::new(&ChunkingConfig {
            max_tokens_per_chunk: max_tokens,
            max_chunk_count: max_chunks,
            chars_per_token: 4,
        })
    }

    #[test]
    fn test_empty_content_empty_plan() {
        let planner = TextChunkPlanner::with_defaults();
        assert!(planner.plan("").unwrap().is_empty());
        assert!(planner.plan("  \n\n ").unwrap().is_empty());
    }

    #[test]
    fn test_single_chunk_document() {
        let planner = TextChunkPlanner::with_defaults();
        let content = "A short paragraph that easily fits in one chunk.";
        let boundaries = planner.plan(content).unwrap();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0], ChunkBoundary::new(0, content.len()));
    }

    #[test]
    fn test_paragraph_example_offsets() {
        // Small budget so each sentence lands in its own chunk.
        let planner = small_planner(2, 10);
        let content = "Alpha.\n\nBeta.\n\nGamma.";
        let boundaries = planner.plan(content).unwrap();
        assert_eq!(boundaries.len(), 3);
        assert_eq!(
            boundaries
                .iter()
                .map(|b| (b.start, b.end))
                .collect::<Vec<_>>(),
            vec![(0, 8), (8, 15), (15, 21)]
        );
        // Concatenating the spans reproduces the original content exactly.
        let rebuilt: String = boundaries
            .iter()
            .map(|b| &content[b.start..b.end])
            .collect();
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn test_partition_invariant_holds() {
        let planner = small_planner(8, 100);
        let content = "# Guide\n\nFirst section body text.\n\nSecond section body text.\n\n\
                       ## Details\n\nSome more detailed prose, long enough to split across \
                       several chunks when the budget is small.\n";
        let boundaries = planner.plan(content).unwrap();
        assert!(boundaries.len() > 1);
        assert!(validate_partition(content, &boundaries));
    }

    #[test]
    fn test_leading_and_trailing_whitespace_absorbed() {
        let planner = small_planner(2, 10);
        let content = "\n\nAlpha.\n\nBeta.\n\n";
        let boundaries = planner.plan(content).unwrap();
        assert_eq!(boundaries[0].start, 0);
        assert_eq!(boundaries.last().unwrap().end, content.len());
        assert!(validate_partition(content, &boundaries));
    }

    #[test]
    fn test_heading_labels() {
        let planner = small_planner(8, 100);
        let content = "## Install\n\nRun the installer and follow the prompts carefully.\n\n\
                       ## Configure\n\nEdit the generated configuration file to match.";
        let boundaries = planner.plan(content).unwrap();
        let labels: Vec<_> = boundaries.iter().filter_map(|b| b.label.clone()).collect();
        assert!(labels.contains(&"Install".to_string()));
        assert!(labels.contains(&"Configure".to_string()));
    }

    #[test]
    fn test_chunk_count_budget_fails_plan() {
        // One chunk allowed but content is far too large for a single chunk
        // even at the largest size, so every attempt must fail.
        let planner = small_planner(2, 1);
        let content = "word ".repeat(400);
        let err = planner.plan(&content).unwrap_err();
        let ChunkPlanError::InvalidChunkPlan { attempts } = err;
        assert!(attempts > 0);
    }

    #[test]
    fn test_shrink_retry_recovers_from_count_overflow() {
        // Budget of 3 chunks: the smallest sizes would overflow the count,
        // but a larger size groups paragraphs and passes.
        let planner = small_planner(64, 3);
        let content = (0..12)
            .map(|i| format!("Paragraph number {i} with some filler text."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let boundaries = planner.plan(&content).unwrap();
        assert!(boundaries.len() <= 3);
        assert!(validate_partition(&content, &boundaries));
    }

    #[test]
    fn test_candidate_sizes_shrink_to_floor() {
        let planner = small_planner(100, 10);
        let sizes = planner.candidate_sizes();
        assert_eq!(sizes[0], 400);
        assert!(sizes.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(*sizes.last().unwrap(), MIN_ATTEMPT_SIZE);
    }

    #[test]
    fn test_heading_label_extraction() {
        assert_eq!(heading_label("## Title\nbody"), Some("Title".to_string()));
        assert_eq!(heading_label("# A"), Some("A".to_string()));
        assert_eq!(heading_label("####### too deep"), None);
        assert_eq!(heading_label("plain text"), None);
        assert_eq!(heading_label("##   "), None);
    }
}
