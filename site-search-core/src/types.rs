//! Result value objects produced by a search.

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Display form of one matched record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Text representation of the record.
    pub text: String,
    /// Canonical link to the record, if any.
    pub url: Option<String>,
}

/// Conversion from a matched record into a result entry.
///
/// Implement this for your own display type to carry extra fields; downcast
/// with [`dyn Record::downcast_ref`](crate::record::Record) to reach the
/// concrete record.
pub trait FromRecord: Sized + Send {
    /// Build the display form of `record`.
    fn from_record(record: &dyn Record) -> Self;
}

impl FromRecord for ResultRecord {
    fn from_record(record: &dyn Record) -> Self {
        Self {
            text: record.to_display_text(),
            url: record.try_get_link(),
        }
    }
}

/// Aggregated results for one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeResult<D = ResultRecord> {
    /// Plural label of the record type, e.g. `"people"`.
    pub type_label: String,
    /// Highest relevance weight among the indices whose records made the cut.
    pub relevance: f64,
    /// Distinct matched records.
    pub records: Vec<D>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRow;

    #[test]
    fn result_record_from_record_uses_text_and_link() {
        let row = FakeRow::new(5, "Alice Smith", "alice@example.com");
        let record = ResultRecord::from_record(&row);
        assert_eq!(record.text, "Alice Smith");
        assert_eq!(record.url.as_deref(), Some("/people/5/"));
    }

    #[test]
    fn type_result_serializes_records() {
        let result = TypeResult {
            type_label: "people".into(),
            relevance: 0.75,
            records: vec![ResultRecord {
                text: "Alice".into(),
                url: None,
            }],
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["type_label"], "people");
        assert_eq!(json["records"][0]["text"], "Alice");
        assert!(json["records"][0]["url"].is_null());
    }

    #[derive(Debug)]
    struct Email(String);

    impl FromRecord for Email {
        fn from_record(record: &dyn Record) -> Self {
            let email = record
                .downcast_ref::<FakeRow>()
                .map(|row| row.email.clone())
                .unwrap_or_default();
            Email(email)
        }
    }

    #[test]
    fn custom_display_type_reaches_concrete_record() {
        let row = FakeRow::new(1, "Alice", "alice@example.com");
        let email = Email::from_record(&row);
        assert_eq!(email.0, "alice@example.com");
    }
}
