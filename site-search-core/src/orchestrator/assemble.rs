//! Assembly of one record type's hits into a [`TypeResult`].
//!
//! Hits arrive flattened in index relevance order. The shared cap is the
//! largest `max_results` among the indices that produced hits; only the
//! first `cap` hits are kept, and the reported relevance is the highest
//! weight among the indices that still have a hit inside that prefix.

use crate::config::DedupMode;
use crate::descriptor::IndexDescriptor;
use crate::record::RecordRef;
use crate::types::{FromRecord, TypeResult};

use super::dedup::deduplicate;

/// One record produced by one index.
#[derive(Debug, Clone)]
pub struct Hit {
    /// `max_results` of the producing index.
    pub max_results: usize,
    /// Relevance weight of the producing index.
    pub relevance: f64,
    /// The matched record.
    pub record: RecordRef,
}

impl Hit {
    /// A hit of `record` from `index`.
    pub fn new(index: &IndexDescriptor, record: RecordRef) -> Self {
        Self {
            max_results: index.max_results(),
            relevance: index.relevance(),
            record,
        }
    }
}

/// Build the result for one record type.
///
/// Returns `None` when there are no hits.
pub fn assemble<D: FromRecord>(
    type_label: &str,
    mut hits: Vec<Hit>,
    dedup: DedupMode,
) -> Option<TypeResult<D>> {
    let cap = hits.iter().map(|hit| hit.max_results).max()?;
    hits.truncate(cap);

    let relevance = hits
        .iter()
        .map(|hit| hit.relevance)
        .fold(f64::NEG_INFINITY, f64::max);
    let records: Vec<D> = deduplicate(hits.into_iter().map(|hit| hit.record).collect(), dedup)
        .iter()
        .map(|record| D::from_record(record.as_ref()))
        .collect();

    if records.is_empty() {
        return None;
    }
    Some(TypeResult {
        type_label: type_label.to_owned(),
        relevance,
        records,
    })
}
