/// Failures surfaced by index construction and querying.
///
/// Each variant is terminal for the operation that produced it; nothing in
/// this crate retries.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// No usable document remained after filtering.
    #[error("Empty corpus: no documents with indexable text")]
    EmptyCorpus,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A query arrived before the first index was published.
    #[error("Index not ready")]
    IndexNotReady,
}

pub type Result<T> = std::result::Result<T, SearchError>;
