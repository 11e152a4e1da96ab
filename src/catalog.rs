//! Declarative index definitions and their registration.
//!
//! An [`IndexDef`] is the configuration-file form of an index: it names a
//! dataset table and the field selector to match on, plus optional
//! precondition, cap, weight and transforms. [`register_all`] turns a list
//! of definitions into registered indices.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use site_search_core::{BoxScope, IndexSpec, Registry, DEFAULT_MAX_RESULTS};

use crate::error::{Result, SiteSearchError};
use crate::store::{Dataset, MemoryScope};

/// Named transformation of the raw search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermTransformKind {
    /// Use the term unchanged.
    #[default]
    Identity,
    /// Lowercase the term.
    Lowercase,
    /// Strip surrounding whitespace.
    Trim,
    /// Parse the trimmed term as an integer; non-integers match nothing.
    #[serde(alias = "digits")]
    Integer,
}

impl TermTransformKind {
    /// Apply the transformation.
    pub fn apply(self, term: &str) -> Value {
        match self {
            Self::Identity => Value::String(term.to_owned()),
            Self::Lowercase => Value::String(term.to_lowercase()),
            Self::Trim => Value::String(term.trim().to_owned()),
            Self::Integer => term
                .trim()
                .parse::<i64>()
                .map_or(Value::Null, Value::from),
        }
    }
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// One `[[indices]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Dataset table (record type) name.
    pub record_type: String,
    /// Field selector, e.g. `name__icontains`.
    pub field: String,
    /// Pattern the term must match at its start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub term_transform: TermTransformKind,
    /// Field to order matches by; prefix with `-` for descending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// Selector/value pairs whose matches are never returned.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exclude: BTreeMap<String, Value>,
}

impl IndexDef {
    /// A definition with every optional setting at its default.
    pub fn new(record_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            field: field.into(),
            precondition: None,
            max_results: DEFAULT_MAX_RESULTS,
            relevance: 0.0,
            term_transform: TermTransformKind::Identity,
            order_by: None,
            exclude: BTreeMap::new(),
        }
    }

    /// Checks that do not need the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`SiteSearchError::Config`] for a blank record type or field,
    /// or a zero `max_results`.
    pub fn validate(&self) -> Result<()> {
        if self.record_type.trim().is_empty() {
            return Err(SiteSearchError::Config(
                "index record_type must not be empty".into(),
            ));
        }
        if self.field.trim().is_empty() {
            return Err(SiteSearchError::Config(format!(
                "index on {} has an empty field",
                self.record_type
            )));
        }
        if self.max_results == 0 {
            return Err(SiteSearchError::Config(format!(
                "index {}.{} max_results must be greater than 0",
                self.record_type, self.field
            )));
        }
        Ok(())
    }

    /// Build the index spec this definition describes.
    pub fn to_spec(&self) -> IndexSpec {
        let transform = self.term_transform;
        let mut spec = IndexSpec::new(self.field.clone())
            .max_results(self.max_results)
            .relevance(self.relevance);
        if transform != TermTransformKind::Identity {
            spec = spec.term_transform(move |term| transform.apply(term));
        }
        if let Some(pattern) = &self.precondition {
            spec = spec.precondition(pattern.as_str());
        }
        if self.order_by.is_some() || !self.exclude.is_empty() {
            let order_by = self.order_by.clone();
            let exclude = self.exclude.clone();
            spec = spec.scope_transform(move |scope: BoxScope| {
                let Some(memory) = scope.downcast_ref::<MemoryScope>() else {
                    return scope;
                };
                let mut next = memory.clone();
                for (selector, value) in &exclude {
                    next = next.exclude(selector, value);
                }
                if let Some(field) = &order_by {
                    next = next.order_by(field);
                }
                Box::new(next)
            });
        }
        spec
    }
}

/// Register every definition against its dataset table.
///
/// Returns the number of indices registered.
///
/// # Errors
///
/// Fails on the first definition that is invalid, names a table the
/// dataset does not have, or is rejected by the registry. Definitions
/// before it stay registered.
pub fn register_all(registry: &Registry, dataset: &Dataset, defs: &[IndexDef]) -> Result<usize> {
    for def in defs {
        def.validate()?;
        let table = dataset.table(&def.record_type).ok_or_else(|| {
            SiteSearchError::Config(format!(
                "index refers to unknown record type {:?}",
                def.record_type
            ))
        })?;
        registry.register(Arc::clone(table), def.to_spec())?;
    }
    Ok(defs.len())
}
