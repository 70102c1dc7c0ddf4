//! Provider Error Types

/// Errors surfaced by a backing-queue backend
///
/// Kept cloneable so they can travel inside notification events.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
