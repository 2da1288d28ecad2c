//! In-memory record store: the injected store capability used by the CLI
//! and by tests. Swapping in a persistent document store means implementing
//! [`RecordStore`] over it; the engine never sees the difference.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::contract::{RecordStore, StoreError, SyncTarget, SyncedRecord, TargetKind};

/// Keyed maps behind an async lock. Upserts to distinct keys never conflict;
/// re-upserting a key is a full replace.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<String, SyncedRecord>,
    targets: HashMap<String, SyncTarget>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn upsert_record(&self, record: SyncedRecord) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .records
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<SyncedRecord>, StoreError> {
        Ok(self.inner.read().await.records.get(id).cloned())
    }

    async fn list_records(&self) -> Result<Vec<SyncedRecord>, StoreError> {
        let mut records: Vec<SyncedRecord> =
            self.inner.read().await.records.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn upsert_target(&self, target: SyncTarget) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .targets
            .insert(target.remote_id.clone(), target);
        Ok(())
    }

    async fn load_enabled_targets(&self) -> Result<Vec<SyncTarget>, StoreError> {
        let mut targets: Vec<SyncTarget> = self
            .inner
            .read()
            .await
            .targets
            .values()
            .filter(|t| t.enabled)
            .cloned()
            .collect();
        targets.sort_by(|a, b| a.remote_id.cmp(&b.remote_id));
        Ok(targets)
    }
}

/// Aggregate view over the synced record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub synced_pages: usize,
    pub synced_databases: usize,
    pub total_synced: usize,
    /// ISO-8601 timestamp of the most recent sync, if any record exists.
    pub last_sync: Option<String>,
    /// Records whose content came back blank (permission failures).
    pub items_with_errors: usize,
}

/// Compute a status summary from the store's current record set.
pub async fn status_summary<R: RecordStore>(store: &R) -> Result<StatusSummary, StoreError> {
    let records = store.list_records().await?;

    let synced_pages = records
        .iter()
        .filter(|r| r.kind == TargetKind::Page)
        .count();
    let synced_databases = records.len() - synced_pages;
    let items_with_errors = records.iter().filter(|r| r.has_permission_error).count();
    // ISO-8601 UTC strings order chronologically, so max is the latest.
    let last_sync = records.iter().map(|r| r.last_synced.clone()).max();

    Ok(StatusSummary {
        synced_pages,
        synced_databases,
        total_synced: records.len(),
        last_sync,
        items_with_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, kind: TargetKind, has_permission_error: bool) -> SyncedRecord {
        SyncedRecord {
            id: id.to_owned(),
            title: format!("title {id}"),
            content: "content".to_owned(),
            last_synced: format!("2024-06-0{}T00:00:00+00:00", id.len()),
            url: None,
            kind,
            has_permission_error,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = InMemoryStore::new();
        store
            .upsert_record(record("a", TargetKind::Page, false))
            .await
            .unwrap();

        let mut updated = record("a", TargetKind::Page, true);
        updated.content = "new content".to_owned();
        store.upsert_record(updated.clone()).await.unwrap();

        assert_eq!(store.get_record("a").await.unwrap(), Some(updated));
        assert_eq!(store.list_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn load_enabled_targets_filters_disabled() {
        let store = InMemoryStore::new();
        store
            .upsert_target(SyncTarget {
                remote_id: "on".into(),
                kind: TargetKind::Page,
                enabled: true,
            })
            .await
            .unwrap();
        store
            .upsert_target(SyncTarget {
                remote_id: "off".into(),
                kind: TargetKind::Collection,
                enabled: false,
            })
            .await
            .unwrap();

        let enabled = store.load_enabled_targets().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].remote_id, "on");
    }

    #[tokio::test]
    async fn status_summary_counts_kinds_and_errors() {
        let store = InMemoryStore::new();
        store
            .upsert_record(record("p1", TargetKind::Page, false))
            .await
            .unwrap();
        store
            .upsert_record(record("p-broken", TargetKind::Page, true))
            .await
            .unwrap();
        store
            .upsert_record(record("db1", TargetKind::Collection, false))
            .await
            .unwrap();

        let summary = status_summary(&store).await.unwrap();
        assert_eq!(summary.synced_pages, 2);
        assert_eq!(summary.synced_databases, 1);
        assert_eq!(summary.total_synced, 3);
        assert_eq!(summary.items_with_errors, 1);
        // "p-broken" has the longest id, so the latest fabricated timestamp.
        assert_eq!(
            summary.last_sync.as_deref(),
            Some("2024-06-08T00:00:00+00:00")
        );
    }

    #[tokio::test]
    async fn empty_store_summary_has_no_last_sync() {
        let summary = status_summary(&InMemoryStore::new()).await.unwrap();
        assert_eq!(summary.total_synced, 0);
        assert_eq!(summary.last_sync, None);
    }
}
