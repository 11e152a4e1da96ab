//! Index descriptors: one record type bound to one filterable field.
//!
//! An [`IndexSpec`] collects the search configuration for an index and is
//! turned into an immutable [`IndexDescriptor`] when it is registered. The
//! precondition pattern, if given as source text, is compiled once at that
//! point.

use std::fmt;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, SearchError};
use crate::record::{BoxScope, RecordRef, RecordTypeRef, Scope};

/// Default cap on records returned by a single index.
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Maps the raw search term to the value handed to the scope filter.
pub type TermTransform = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Narrows or reorders the scope an index searches.
pub type ScopeTransform = Arc<dyn Fn(BoxScope) -> BoxScope + Send + Sync>;

/// A precondition the raw term must satisfy for an index to apply.
#[derive(Debug, Clone)]
pub enum Precondition {
    /// Pattern source, compiled when the index is built.
    Source(String),
    /// An already compiled pattern.
    Compiled(Regex),
}

impl From<&str> for Precondition {
    fn from(source: &str) -> Self {
        Self::Source(source.to_owned())
    }
}

impl From<String> for Precondition {
    fn from(source: String) -> Self {
        Self::Source(source)
    }
}

impl From<Regex> for Precondition {
    fn from(pattern: Regex) -> Self {
        Self::Compiled(pattern)
    }
}

impl Precondition {
    fn compile(self) -> Result<Regex> {
        match self {
            Self::Compiled(pattern) => Ok(pattern),
            Self::Source(source) => {
                Regex::new(&source).map_err(|e| SearchError::PreconditionCompile {
                    source_text: source.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn identity_term(term: &str) -> Value {
    Value::String(term.to_owned())
}

fn identity_scope(scope: BoxScope) -> BoxScope {
    scope
}

/// Search configuration for one index, prior to registration.
///
/// Construct with [`IndexSpec::new`] and the builder methods; every field
/// except `match_field` has a default.
#[derive(Clone)]
pub struct IndexSpec {
    match_field: Option<String>,
    precondition: Option<Precondition>,
    term_transform: TermTransform,
    max_results: usize,
    relevance: f64,
    scope_transform: ScopeTransform,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            match_field: None,
            precondition: None,
            term_transform: Arc::new(identity_term),
            max_results: DEFAULT_MAX_RESULTS,
            relevance: 0.0,
            scope_transform: Arc::new(identity_scope),
        }
    }
}

impl fmt::Debug for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSpec")
            .field("match_field", &self.match_field)
            .field("precondition", &self.precondition)
            .field("max_results", &self.max_results)
            .field("relevance", &self.relevance)
            .finish_non_exhaustive()
    }
}

impl IndexSpec {
    /// Start a spec matching on `match_field`.
    pub fn new(match_field: impl Into<String>) -> Self {
        Self {
            match_field: Some(match_field.into()),
            ..Self::default()
        }
    }

    /// Set the field selector used to build the filter predicate.
    #[must_use]
    pub fn match_field(mut self, match_field: impl Into<String>) -> Self {
        self.match_field = Some(match_field.into());
        self
    }

    /// Require the term to match `precondition` at its start.
    #[must_use]
    pub fn precondition(mut self, precondition: impl Into<Precondition>) -> Self {
        self.precondition = Some(precondition.into());
        self
    }

    /// Transform the term before it is used as the filter value.
    #[must_use]
    pub fn term_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        self.term_transform = Arc::new(transform);
        self
    }

    /// Maximum number of records this index fetches.
    #[must_use]
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Relevance weight; higher weights are searched first.
    #[must_use]
    pub fn relevance(mut self, relevance: f64) -> Self {
        self.relevance = relevance;
        self
    }

    /// Transform the scope before filtering.
    #[must_use]
    pub fn scope_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(BoxScope) -> BoxScope + Send + Sync + 'static,
    {
        self.scope_transform = Arc::new(transform);
        self
    }

    /// Validate the spec and bind it to `record_type`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Registration`] for a missing or blank match
    /// field, a zero `max_results`, or a NaN relevance, and
    /// [`SearchError::PreconditionCompile`] for an invalid pattern.
    pub fn build(self, record_type: RecordTypeRef) -> Result<IndexDescriptor> {
        let match_field = match self.match_field {
            Some(field) if !field.trim().is_empty() => field,
            _ => {
                return Err(SearchError::Registration(format!(
                    "match_field is required for an index on {}",
                    record_type.name()
                )))
            }
        };
        if self.max_results == 0 {
            return Err(SearchError::Registration(format!(
                "max_results must be at least 1 (index {}.{match_field})",
                record_type.name()
            )));
        }
        if self.relevance.is_nan() {
            return Err(SearchError::Registration(format!(
                "relevance must be a number (index {}.{match_field})",
                record_type.name()
            )));
        }
        let precondition = self.precondition.map(Precondition::compile).transpose()?;

        Ok(IndexDescriptor {
            record_type,
            match_field,
            precondition,
            term_transform: self.term_transform,
            max_results: self.max_results,
            relevance: self.relevance,
            scope_transform: self.scope_transform,
        })
    }
}

/// An immutable, registered index.
pub struct IndexDescriptor {
    record_type: RecordTypeRef,
    match_field: String,
    precondition: Option<Regex>,
    term_transform: TermTransform,
    max_results: usize,
    relevance: f64,
    scope_transform: ScopeTransform,
}

impl fmt::Debug for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDescriptor")
            .field("record_type", &self.record_type.name())
            .field("match_field", &self.match_field)
            .field("precondition", &self.precondition.as_ref().map(Regex::as_str))
            .field("max_results", &self.max_results)
            .field("relevance", &self.relevance)
            .finish_non_exhaustive()
    }
}

impl IndexDescriptor {
    /// The record type this index searches.
    pub fn record_type(&self) -> &RecordTypeRef {
        &self.record_type
    }

    /// Field selector used for filtering.
    pub fn match_field(&self) -> &str {
        &self.match_field
    }

    /// Compiled precondition, if any.
    pub fn precondition(&self) -> Option<&Regex> {
        self.precondition.as_ref()
    }

    /// Cap on records fetched by this index.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Relevance weight.
    pub fn relevance(&self) -> f64 {
        self.relevance
    }

    /// Whether this index applies to `term`.
    ///
    /// An empty term never applies. A precondition must match at the start
    /// of the term; it need not consume the whole term.
    pub fn accepts(&self, term: &str) -> bool {
        if term.is_empty() {
            return false;
        }
        match &self.precondition {
            None => true,
            // Leftmost-first: a match starting at 0 is always the one found.
            Some(pattern) => pattern.find(term).is_some_and(|m| m.start() == 0),
        }
    }

    /// Lazily fetch records matching `term`.
    ///
    /// Searches `scope` (or every record when `None`) after passing it
    /// through the scope transform, filtering on the match field with the
    /// transformed term, and limiting to `max_results`.
    pub fn fetch(
        &self,
        term: &str,
        scope: Option<&dyn Scope>,
    ) -> BoxStream<'static, Result<RecordRef>> {
        let base = scope.map_or_else(|| self.record_type.all(), |s| s.clone_scope());
        let value = (self.term_transform)(term);
        let effective = (self.scope_transform)(base)
            .filter(&self.match_field, &value)
            .limit(self.max_results);

        let record_type = self.record_type.name().to_owned();
        let field = self.match_field.clone();
        effective
            .fetch()
            .map_err(move |e| SearchError::Fetch {
                record_type: record_type.clone(),
                field: field.clone(),
                message: e.to_string(),
            })
            .boxed()
    }

    /// Fetch and collect every matching record.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Fetch`] if the underlying scope fails.
    pub async fn fetch_all(&self, term: &str, scope: Option<&dyn Scope>) -> Result<Vec<RecordRef>> {
        self.fetch(term, scope).try_collect().await
    }
}
