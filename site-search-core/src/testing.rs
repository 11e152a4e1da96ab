//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;

use crate::record::{BoxError, BoxScope, Record, RecordRef, RecordStream, RecordType, Scope};

#[derive(Debug, Clone)]
pub(crate) struct FakeRow {
    pub id: u32,
    pub name: String,
    pub email: String,
}

impl FakeRow {
    pub fn new(id: u32, name: &str, email: &str) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    fn field(&self, field: &str) -> Option<String> {
        match field {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.name.clone()),
            "email" => Some(self.email.clone()),
            _ => None,
        }
    }
}

impl Record for FakeRow {
    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn to_display_text(&self) -> String {
        self.name.clone()
    }

    fn try_get_link(&self) -> Option<String> {
        Some(format!("/people/{}/", self.id))
    }
}

/// Record type whose filters are case-insensitive substring matches
/// (exact match on `id`).
#[derive(Debug)]
pub(crate) struct FakeTable {
    name: String,
    plural: String,
    rows: Arc<Vec<Arc<FakeRow>>>,
    failing: bool,
    fetches: Arc<AtomicUsize>,
}

impl FakeTable {
    pub fn new(name: &str, plural: &str, rows: Vec<FakeRow>) -> Self {
        Self {
            name: name.into(),
            plural: plural.into(),
            rows: Arc::new(rows.into_iter().map(Arc::new).collect()),
            failing: false,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &str, plural: &str) -> Self {
        Self {
            failing: true,
            ..Self::new(name, plural, vec![])
        }
    }

    /// Number of scopes iterated so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn scope(&self, empty: bool) -> FakeScope {
        FakeScope {
            rows: Arc::clone(&self.rows),
            filters: Vec::new(),
            limit: None,
            empty,
            failing: self.failing,
            fetches: Arc::clone(&self.fetches),
        }
    }
}

impl RecordType for FakeTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn plural_label(&self) -> &str {
        &self.plural
    }

    fn all(&self) -> BoxScope {
        Box::new(self.scope(false))
    }

    fn none(&self) -> BoxScope {
        Box::new(self.scope(true))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeScope {
    rows: Arc<Vec<Arc<FakeRow>>>,
    filters: Vec<(String, String)>,
    limit: Option<usize>,
    empty: bool,
    failing: bool,
    fetches: Arc<AtomicUsize>,
}

impl FakeScope {
    fn matches(&self, row: &FakeRow) -> bool {
        self.filters.iter().all(|(field, value)| match row.field(field) {
            Some(actual) if field == "id" => actual == *value,
            Some(actual) => actual.to_lowercase().contains(&value.to_lowercase()),
            None => false,
        })
    }
}

impl Scope for FakeScope {
    fn filter(&self, field: &str, value: &Value) -> BoxScope {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let mut next = self.clone();
        next.filters.push((field.to_owned(), value));
        Box::new(next)
    }

    fn limit(&self, n: usize) -> BoxScope {
        let mut next = self.clone();
        next.limit = Some(self.limit.map_or(n, |current| current.min(n)));
        Box::new(next)
    }

    fn is_empty(&self) -> bool {
        self.empty || self.limit == Some(0)
    }

    fn fetch(&self) -> RecordStream {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return futures::stream::once(async {
                Err::<RecordRef, BoxError>("storage offline".into())
            })
            .boxed();
        }
        if self.empty {
            return futures::stream::empty().boxed();
        }
        let matched: Vec<RecordRef> = self
            .rows
            .iter()
            .filter(|row| self.matches(row))
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|row| Arc::clone(row) as RecordRef)
            .collect();
        futures::stream::iter(matched.into_iter().map(Ok)).boxed()
    }

    fn clone_scope(&self) -> BoxScope {
        Box::new(self.clone())
    }
}
