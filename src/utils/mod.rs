//! Utility modules.

pub mod retry;
pub mod text;

pub use retry::{RetryConfig, Retryable, with_retry};
pub use text::{is_blank, normalize_whitespace};
