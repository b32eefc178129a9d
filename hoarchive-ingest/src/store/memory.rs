use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::IngestResult;
use crate::ledger::ManifestEntry;
use crate::promote::CuratedTable;
use crate::schema::{SourceId, TableId};
use crate::staging::StagingRelation;
use crate::store::{CuratedStore, ManifestStore, StagingStore};
use crate::types::{BusinessKey, Cell, StagingRow};

#[derive(Debug, Default)]
struct Inner {
    staging: BTreeMap<SourceId, Vec<StagingRow>>,
    tables: BTreeMap<TableId, BTreeMap<BusinessKey, Vec<Cell>>>,
    manifest: BTreeMap<SourceId, ManifestEntry>,
}

/// In-memory store used by tests and as the reference for store semantics.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CuratedStore for MemoryStore {
    async fn replace_table(&self, table: CuratedTable) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(table.table, table.rows);
        Ok(())
    }

    async fn table_rows(&self, table: TableId) -> IngestResult<Vec<Vec<Cell>>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tables
            .get(&table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> IngestResult<()> {
        Ok(())
    }
}

impl StagingStore for MemoryStore {
    async fn replace_staging(&self, relation: &StagingRelation) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;
        inner.staging.insert(relation.source, relation.rows.clone());
        Ok(())
    }

    async fn staging_rows(&self, source: SourceId) -> IngestResult<Vec<StagingRow>> {
        let inner = self.inner.lock().await;
        Ok(inner.staging.get(&source).cloned().unwrap_or_default())
    }
}

impl ManifestStore for MemoryStore {
    async fn manifest(&self) -> IngestResult<BTreeMap<SourceId, ManifestEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner.manifest.clone())
    }

    async fn manifest_entry(&self, source: SourceId) -> IngestResult<Option<ManifestEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner.manifest.get(&source).cloned())
    }

    async fn upsert_manifest_entry(
        &self,
        source: SourceId,
        entry: ManifestEntry,
    ) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;
        inner.manifest.insert(source, entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn table_of(rows: &[(i64, &str)]) -> CuratedTable {
        CuratedTable {
            table: TableId::Player,
            rows: rows
                .iter()
                .map(|&(id, name)| {
                    (
                        BusinessKey(vec![Cell::Int(id)]),
                        vec![Cell::Int(id), Cell::Text(name.into())],
                    )
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn replace_deletes_stale_keys() {
        let store = MemoryStore::new();
        store
            .replace_table(table_of(&[(1, "One"), (2, "Two")]))
            .await
            .unwrap();
        store.replace_table(table_of(&[(2, "Two")])).await.unwrap();

        let rows = store.table_rows(TableId::Player).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Cell::Int(2));
    }

    #[tokio::test]
    async fn staging_round_trips_per_source() {
        let store = MemoryStore::new();
        assert!(
            store
                .staging_rows(SourceId::Players)
                .await
                .unwrap()
                .is_empty()
        );

        let relation = StagingRelation {
            source: SourceId::Players,
            rows: vec![StagingRow::new(
                2,
                vec![Cell::Int(1), Cell::Text("One".into())],
            )],
        };
        store.replace_staging(&relation).await.unwrap();
        assert_eq!(
            store.staging_rows(SourceId::Players).await.unwrap(),
            relation.rows
        );
    }

    #[tokio::test]
    async fn manifest_round_trips_and_clones_share_state() {
        let store = MemoryStore::new();
        let entry = ManifestEntry {
            fingerprint: "abc".into(),
            processed_at: Utc::now(),
            schema_version: 1,
        };
        store
            .upsert_manifest_entry(SourceId::Players, entry.clone())
            .await
            .unwrap();

        let clone = store.clone();
        assert_eq!(
            clone.manifest_entry(SourceId::Players).await.unwrap(),
            Some(entry)
        );
        assert_eq!(clone.manifest_entry(SourceId::Games).await.unwrap(), None);
    }
}
