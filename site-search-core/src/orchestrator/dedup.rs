//! Record deduplication by record identity.
//!
//! Two hits referring to the same [`Record::record_id`](crate::record::Record::record_id) are the same
//! record. The default mode keeps the first occurrence so that results stay
//! in index relevance order; the unordered mode collapses through a hash
//! map and makes no ordering promise.

use std::collections::{HashMap, HashSet};

use crate::config::DedupMode;
use crate::record::RecordRef;

/// Remove duplicate records according to `mode`.
pub fn deduplicate(records: Vec<RecordRef>, mode: DedupMode) -> Vec<RecordRef> {
    match mode {
        DedupMode::FirstOccurrence => {
            let mut seen = HashSet::new();
            records
                .into_iter()
                .filter(|record| seen.insert(record.record_id()))
                .collect()
        }
        DedupMode::Unordered => {
            let mut distinct: HashMap<String, RecordRef> = HashMap::new();
            for record in records {
                distinct.entry(record.record_id()).or_insert(record);
            }
            distinct.into_values().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::FakeRow;

    fn record_ids(records: &[RecordRef]) -> Vec<String> {
        records.iter().map(|r| r.record_id()).collect()
    }

    fn rows(ids: &[u32]) -> Vec<RecordRef> {
        ids.iter()
            .map(|&id| Arc::new(FakeRow::new(id, &format!("row {id}"), "")) as RecordRef)
            .collect()
    }

    #[test]
    fn unique_records_pass_through() {
        let deduped = deduplicate(rows(&[1, 2, 3]), DedupMode::FirstOccurrence);
        assert_eq!(record_ids(&deduped), vec!["1", "2", "3"]);
    }

    #[test]
    fn first_occurrence_keeps_order() {
        let deduped = deduplicate(rows(&[3, 1, 3, 2, 1]), DedupMode::FirstOccurrence);
        assert_eq!(record_ids(&deduped), vec!["3", "1", "2"]);
    }

    #[test]
    fn unordered_keeps_one_of_each() {
        let deduped = deduplicate(rows(&[3, 1, 3, 2, 1]), DedupMode::Unordered);
        let mut ids = record_ids(&deduped);
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(deduplicate(vec![], DedupMode::FirstOccurrence).is_empty());
        assert!(deduplicate(vec![], DedupMode::Unordered).is_empty());
    }
}
