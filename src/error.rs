//! Error types for the site search host.

use site_search_core::SearchError;

/// Top-level error type for the site search host.
#[derive(Debug, thiserror::Error)]
pub enum SiteSearchError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Dataset loading or shape error.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registration or search failure from the search core.
    #[error("search error: {0}")]
    Search(#[from] SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SiteSearchError>;
