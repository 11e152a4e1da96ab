//! Search behaviour configuration with sensible defaults.
//!
//! [`SearchConfig`] controls how a search fetches from indices, how fetch
//! failures are treated, and how duplicate records are collapsed.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// How duplicate records within a record type's capped results collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Keep the first occurrence; result order follows index relevance.
    #[default]
    FirstOccurrence,
    /// Collapse through a hash set; result order is unspecified.
    Unordered,
}

/// Configuration for a search call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Fetch a record type's indices concurrently. Results are assembled in
    /// relevance order either way.
    pub parallel_fetch: bool,
    /// Upper bound on concurrent fetches per record type when
    /// `parallel_fetch` is on.
    pub max_concurrent_fetches: usize,
    /// Log and skip a failing index instead of failing the whole search.
    pub isolate_fetch_failures: bool,
    /// Duplicate handling.
    pub dedup: DedupMode,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parallel_fetch: false,
            max_concurrent_fetches: 4,
            isolate_fetch_failures: false,
            dedup: DedupMode::FirstOccurrence,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_concurrent_fetches` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_concurrent_fetches == 0 {
            return Err(SearchError::Config(
                "max_concurrent_fetches must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = SearchConfig::default();
        assert!(!config.parallel_fetch);
        assert_eq!(config.max_concurrent_fetches, 4);
        assert!(!config.isolate_fetch_failures);
        assert_eq!(config.dedup, DedupMode::FirstOccurrence);
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = SearchConfig {
            max_concurrent_fetches: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrent_fetches"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"dedup": "unordered"}"#).expect("deserialize");
        assert_eq!(config.dedup, DedupMode::Unordered);
        assert_eq!(config.max_concurrent_fetches, 4);
        assert!(!config.parallel_fetch);
    }
}
