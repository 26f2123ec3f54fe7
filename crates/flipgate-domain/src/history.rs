use flipgate_types::{OutcomeRecord, TestStatus};
use std::collections::BTreeMap;
use time::PrimitiveDateTime;

/// Chronological outcome history for every test in one dataset.
///
/// Skipped outcomes are dropped on construction and records are sorted by
/// timestamp with a stable sort, so equal timestamps keep ingestion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestHistory {
    records: Vec<OutcomeRecord>,
}

impl TestHistory {
    pub fn from_records(records: impl IntoIterator<Item = OutcomeRecord>) -> Self {
        let mut records: Vec<OutcomeRecord> = records
            .into_iter()
            .filter(|r| !r.status.is_skipped())
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<PrimitiveDateTime> {
        self.records.last().map(|r| r.timestamp)
    }

    /// Per-test outcome sequences, chronological, keyed by identifier.
    pub fn by_test(&self) -> BTreeMap<&str, Vec<&TestStatus>> {
        let mut grouped: BTreeMap<&str, Vec<&TestStatus>> = BTreeMap::new();
        for record in &self.records {
            grouped
                .entry(record.test_identifier.as_str())
                .or_default()
                .push(&record.status);
        }
        grouped
    }

    pub fn test_count(&self) -> usize {
        self.by_test().len()
    }
}
