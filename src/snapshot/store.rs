//! Persistence of reported-variant snapshots.

use indexmap::IndexMap;

use crate::{
    err::StoreError,
    schema::report::{ReportedVariantSnapshot, SnapshotKey},
};

/// Result of inserting one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same key exists already; nothing was written.
    Duplicate,
}

/// Storage for snapshot rows, unique by `SnapshotKey`.
pub trait SnapshotStore {
    /// Insert `snapshot` unless a row with the same key exists.
    fn insert(&mut self, snapshot: ReportedVariantSnapshot) -> Result<InsertOutcome, StoreError>;

    /// Whether a row with `key` exists.
    fn contains(&self, key: &SnapshotKey) -> bool;
}

/// In-memory store, keeping rows in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    rows: IndexMap<SnapshotKey, ReportedVariantSnapshot>,
}

impl MemorySnapshotStore {
    /// Create a store pre-populated with `rows`; later duplicates are dropped.
    pub fn with_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = ReportedVariantSnapshot>,
    {
        let mut result = Self::default();
        for row in rows {
            result.rows.entry(row.key()).or_insert(row);
        }
        result
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &ReportedVariantSnapshot> {
        self.rows.values()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn insert(&mut self, snapshot: ReportedVariantSnapshot) -> Result<InsertOutcome, StoreError> {
        if snapshot.sample_oid.is_empty() || snapshot.report_oid.is_empty() {
            return Err(StoreError::Rejected(format!(
                "snapshot of {} lacks sample or report id",
                &snapshot.simple_id
            )));
        }
        let key = snapshot.key();
        if self.rows.contains_key(&key) {
            Ok(InsertOutcome::Duplicate)
        } else {
            self.rows.insert(key, snapshot);
            Ok(InsertOutcome::Inserted)
        }
    }

    fn contains(&self, key: &SnapshotKey) -> bool {
        self.rows.contains_key(key)
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;

    fn snapshot(report_oid: &str, simple_id: &str) -> ReportedVariantSnapshot {
        ReportedVariantSnapshot {
            sample_oid: "s1".into(),
            sample_name: "S1".into(),
            report_oid: report_oid.into(),
            report_id: None,
            simple_id: simple_id.into(),
            var_oid: "v1".into(),
            tier: 1,
            gene: "TP53".into(),
            transcript: None,
            hgvsp: None,
            hgvsc: None,
            annotation_oid: None,
            annotation_text_oid: None,
            sample_comment_oid: None,
            time_created: Utc
                .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
                .single()
                .expect("valid date"),
        }
    }

    #[test]
    fn insert_is_unique_by_key() -> Result<(), anyhow::Error> {
        let mut store = MemorySnapshotStore::default();

        assert_eq!(store.insert(snapshot("r1", "17_1_C_T"))?, InsertOutcome::Inserted);
        assert_eq!(store.insert(snapshot("r1", "17_1_C_T"))?, InsertOutcome::Duplicate);
        assert_eq!(store.insert(snapshot("r2", "17_1_C_T"))?, InsertOutcome::Inserted);
        assert_eq!(store.len(), 2);
        assert!(store.contains(&snapshot("r2", "17_1_C_T").key()));

        Ok(())
    }

    #[test]
    fn insert_rejects_incomplete_key() {
        let mut store = MemorySnapshotStore::default();

        let res = store.insert(snapshot("", "17_1_C_T"));

        assert!(matches!(res, Err(StoreError::Rejected(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn with_rows_keeps_first() {
        let mut second = snapshot("r1", "17_1_C_T");
        second.tier = 3;

        let store = MemorySnapshotStore::with_rows([snapshot("r1", "17_1_C_T"), second]);

        assert_eq!(store.rows().map(|r| r.tier).collect::<Vec<_>>(), vec![1]);
    }
}
