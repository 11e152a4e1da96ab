//! In-memory record store backing the search host.
//!
//! A [`Dataset`] holds named [`MemoryTable`]s of JSON records. Each table is
//! a search [`RecordType`]; its [`MemoryScope`] understands field selectors
//! of the form `field__lookup`:
//!
//! | Lookup        | Matches when the record's field value...       |
//! |---------------|------------------------------------------------|
//! | `exact`       | equals the value (the default)                 |
//! | `iexact`      | equals the value, ignoring case                |
//! | `contains`    | contains the value                             |
//! | `icontains`   | contains the value, ignoring case              |
//! | `startswith`  | starts with the value                          |
//! | `istartswith` | starts with the value, ignoring case           |
//! | `gt` `gte` `lt` `lte` | compares numerically (or as text)      |
//!
//! Scopes are evaluated lazily: nothing is filtered until the record stream
//! is polled, and every record handed out is a suspension point.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use site_search_core::{BoxError, BoxScope, Record, RecordRef, RecordStream, RecordType, Scope};

use crate::error::{Result, SiteSearchError};

/// Comparison applied by a field selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookup {
    #[default]
    Exact,
    IExact,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FromStr for Lookup {
    type Err = SiteSearchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "iexact" => Ok(Self::IExact),
            "contains" => Ok(Self::Contains),
            "icontains" => Ok(Self::IContains),
            "startswith" => Ok(Self::StartsWith),
            "istartswith" => Ok(Self::IStartsWith),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            other => Err(SiteSearchError::Config(format!("unknown lookup {other:?}"))),
        }
    }
}

impl Lookup {
    /// Split a selector into its field and lookup.
    ///
    /// A suffix that is not a known lookup is treated as part of the field
    /// name, so `"first__name"` is an exact match on `first__name`.
    pub fn parse_selector(selector: &str) -> (&str, Lookup) {
        match selector.rsplit_once("__") {
            Some((field, suffix)) => match suffix.parse() {
                Ok(lookup) => (field, lookup),
                Err(_) => (selector, Lookup::Exact),
            },
            None => (selector, Lookup::Exact),
        }
    }

    /// Whether a record value satisfies this lookup against `expected`.
    ///
    /// A missing field (`None`) never matches.
    pub fn matches(self, actual: Option<&Value>, expected: &Value) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            Self::Exact => compare(actual, expected) == Ordering::Equal,
            Self::IExact => text(actual).to_lowercase() == text(expected).to_lowercase(),
            Self::Contains => text(actual).contains(text(expected).as_str()),
            Self::IContains => text(actual)
                .to_lowercase()
                .contains(&text(expected).to_lowercase()),
            Self::StartsWith => text(actual).starts_with(text(expected).as_str()),
            Self::IStartsWith => text(actual)
                .to_lowercase()
                .starts_with(&text(expected).to_lowercase()),
            Self::Gt => compare(actual, expected) == Ordering::Greater,
            Self::Gte => compare(actual, expected) != Ordering::Less,
            Self::Lt => compare(actual, expected) == Ordering::Less,
            Self::Lte => compare(actual, expected) != Ordering::Greater,
        }
    }
}

/// Textual form of a JSON value; strings are used verbatim.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Numeric comparison when one side is a JSON number and the other reads
/// as one, text otherwise. Two strings always compare as text.
fn compare(a: &Value, b: &Value) -> Ordering {
    if !(a.is_number() || b.is_number()) {
        return text(a).cmp(&text(b));
    }
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => text(a).cmp(&text(b)),
    }
}

/// One stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    id: String,
    fields: Map<String, Value>,
    display: String,
    link: Option<String>,
}

impl MemoryRecord {
    /// Value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All stored fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Record for MemoryRecord {
    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn to_display_text(&self) -> String {
        self.display.clone()
    }

    fn try_get_link(&self) -> Option<String> {
        self.link.clone()
    }
}

/// Serialized shape of a table in a dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    /// Record type name, e.g. `"Person"`.
    pub name: String,
    /// Plural label shown with results, e.g. `"people"`.
    pub plural: String,
    /// Field used as the record's display text.
    #[serde(default = "default_display_field")]
    pub display_field: String,
    /// Link template; `{id}` is replaced by the record id.
    #[serde(default)]
    pub link: Option<String>,
    /// Raw records. Each must carry an `id`.
    #[serde(default)]
    pub records: Vec<Map<String, Value>>,
}

fn default_display_field() -> String {
    "name".to_owned()
}

/// A named, immutable collection of records.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    plural: String,
    rows: Arc<Vec<Arc<MemoryRecord>>>,
}

impl MemoryTable {
    /// Build a table from its serialized definition.
    ///
    /// # Errors
    ///
    /// Returns [`SiteSearchError::Dataset`] for a blank name, a record
    /// without a usable `id`, or two records sharing an id.
    pub fn from_def(def: TableDef) -> Result<Self> {
        if def.name.trim().is_empty() {
            return Err(SiteSearchError::Dataset("table name must not be empty".into()));
        }
        let mut seen = HashSet::with_capacity(def.records.len());
        let mut rows = Vec::with_capacity(def.records.len());
        for (position, fields) in def.records.into_iter().enumerate() {
            let id = match fields.get("id") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(SiteSearchError::Dataset(format!(
                        "record {position} of {} has no id",
                        def.name
                    )));
                }
            };
            if !seen.insert(id.clone()) {
                return Err(SiteSearchError::Dataset(format!(
                    "duplicate id {id:?} in {}",
                    def.name
                )));
            }
            let display = fields
                .get(&def.display_field)
                .map(text)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("{} {id}", def.name));
            let link = def.link.as_ref().map(|template| template.replace("{id}", &id));
            rows.push(Arc::new(MemoryRecord {
                id,
                fields,
                display,
                link,
            }));
        }
        Ok(Self {
            name: def.name,
            plural: def.plural,
            rows: Arc::new(rows),
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unrestricted concrete scope over this table.
    pub fn scope(&self) -> MemoryScope {
        MemoryScope {
            rows: Arc::clone(&self.rows),
            conditions: Vec::new(),
            order: None,
            limit: None,
            empty: false,
        }
    }
}

impl RecordType for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn plural_label(&self) -> &str {
        &self.plural
    }

    fn all(&self) -> BoxScope {
        Box::new(self.scope())
    }

    fn none(&self) -> BoxScope {
        Box::new(MemoryScope {
            empty: true,
            ..self.scope()
        })
    }
}

#[derive(Debug, Clone)]
struct Condition {
    field: String,
    lookup: Lookup,
    value: Value,
    negate: bool,
}

impl Condition {
    fn holds(&self, record: &MemoryRecord) -> bool {
        self.lookup.matches(record.get(&self.field), &self.value) != self.negate
    }
}

/// A lazily evaluated view over a [`MemoryTable`].
#[derive(Debug, Clone)]
pub struct MemoryScope {
    rows: Arc<Vec<Arc<MemoryRecord>>>,
    conditions: Vec<Condition>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
    empty: bool,
}

impl MemoryScope {
    fn with_condition(&self, selector: &str, value: &Value, negate: bool) -> Self {
        let (field, lookup) = Lookup::parse_selector(selector);
        let mut next = self.clone();
        next.conditions.push(Condition {
            field: field.to_owned(),
            lookup,
            value: value.clone(),
            negate,
        });
        next
    }

    /// Keep records matching `selector`.
    pub fn filter_by(&self, selector: &str, value: &Value) -> Self {
        self.with_condition(selector, value, false)
    }

    /// Drop records matching `selector`.
    pub fn exclude(&self, selector: &str, value: &Value) -> Self {
        self.with_condition(selector, value, true)
    }

    /// Order by `field`; a leading `-` sorts descending. Ties keep table order.
    pub fn order_by(&self, field: &str) -> Self {
        let mut next = self.clone();
        next.order = Some(match field.strip_prefix('-') {
            Some(field) => (field.to_owned(), true),
            None => (field.to_owned(), false),
        });
        next
    }

    /// Cap the number of records.
    pub fn take(&self, n: usize) -> Self {
        let mut next = self.clone();
        next.limit = Some(self.limit.map_or(n, |current| current.min(n)));
        next
    }

    /// Evaluate the scope synchronously.
    pub fn evaluate(&self) -> Vec<Arc<MemoryRecord>> {
        if self.empty {
            return Vec::new();
        }
        let mut matched: Vec<Arc<MemoryRecord>> = self
            .rows
            .iter()
            .filter(|row| self.conditions.iter().all(|c| c.holds(row)))
            .cloned()
            .collect();
        if let Some((field, descending)) = &self.order {
            // Records missing the field sort last in either direction.
            matched.sort_by(|a, b| match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) if *descending => compare(y, x),
                (Some(x), Some(y)) => compare(x, y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

impl Scope for MemoryScope {
    fn filter(&self, field: &str, value: &Value) -> BoxScope {
        Box::new(self.filter_by(field, value))
    }

    fn limit(&self, n: usize) -> BoxScope {
        Box::new(self.take(n))
    }

    fn is_empty(&self) -> bool {
        self.empty || self.limit == Some(0) || self.rows.is_empty()
    }

    fn fetch(&self) -> RecordStream {
        let scope = self.clone();
        async_stream::stream! {
            for record in scope.evaluate() {
                tokio::task::yield_now().await;
                yield Ok::<RecordRef, BoxError>(record);
            }
        }
        .boxed()
    }

    fn clone_scope(&self) -> BoxScope {
        Box::new(self.clone())
    }
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    tables: Vec<TableDef>,
}

/// Named tables loaded from a JSON file.
#[derive(Debug, Default)]
pub struct Dataset {
    tables: BTreeMap<String, Arc<MemoryTable>>,
}

impl Dataset {
    /// Parse a dataset from JSON of the form `{"tables": [TableDef, ...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteSearchError::Dataset`] for malformed JSON, invalid
    /// tables, or duplicate table names.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DatasetFile =
            serde_json::from_str(json).map_err(|e| SiteSearchError::Dataset(e.to_string()))?;
        let mut dataset = Self::default();
        for def in file.tables {
            dataset.insert(MemoryTable::from_def(def)?)?;
        }
        Ok(dataset)
    }

    /// Load a dataset from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dataset = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            tables = dataset.tables.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Add a table, returning its shared handle.
    ///
    /// # Errors
    ///
    /// Returns [`SiteSearchError::Dataset`] if a table with the same name
    /// already exists.
    pub fn insert(&mut self, table: MemoryTable) -> Result<Arc<MemoryTable>> {
        if self.tables.contains_key(&table.name) {
            return Err(SiteSearchError::Dataset(format!(
                "duplicate table {:?}",
                table.name
            )));
        }
        let table = Arc::new(table);
        self.tables.insert(table.name.clone(), Arc::clone(&table));
        Ok(table)
    }

    /// Table by record type name.
    pub fn table(&self, name: &str) -> Option<&Arc<MemoryTable>> {
        self.tables.get(name)
    }

    /// All tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<MemoryTable>> {
        self.tables.values()
    }
}
