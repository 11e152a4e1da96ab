//! Error types for the site-search-core crate.
//!
//! Registration errors surface at startup, never during a search. Errors
//! raised while searching (authorization, fetch) abort the whole search
//! call unless fetch isolation is switched on in
//! [`SearchConfig`](crate::config::SearchConfig).

/// Errors that can occur while registering indices or searching them.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An index was registered with an invalid configuration.
    #[error("registration error: {0}")]
    Registration(String),

    /// A precondition pattern could not be compiled.
    #[error("invalid precondition {source_text:?}: {reason}")]
    PreconditionCompile {
        /// The pattern source as given at registration.
        source_text: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// The authorization hook failed for a record type.
    #[error("authorization failed for {record_type}: {message}")]
    Authorization {
        /// Name of the record type being authorized.
        record_type: String,
        /// Underlying failure.
        message: String,
    },

    /// Fetching records for one index failed.
    #[error("fetch failed for {record_type}.{field}: {message}")]
    Fetch {
        /// Name of the record type being searched.
        record_type: String,
        /// Match field of the failing index.
        field: String,
        /// Underlying failure.
        message: String,
    },

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for site-search-core results.
pub type Result<T> = std::result::Result<T, SearchError>;
