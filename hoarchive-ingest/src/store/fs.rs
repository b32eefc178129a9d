use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::IngestResult;
use crate::ledger::ManifestEntry;
use crate::promote::CuratedTable;
use crate::schema::{SourceId, TableId};
use crate::staging::StagingRelation;
use crate::store::{CuratedStore, ManifestStore, StagingStore};
use crate::types::{Cell, StagingRow};

/// Filesystem-backed store.
///
/// Each curated table is one JSON file of rows in business-key order under
/// `<root>/curated/`, each staging relation one JSON file under `<root>/staging/`, and
/// the manifest is `<root>/manifest.json`. Files are written to a temporary sibling and
/// renamed into place, so readers never observe a partial write.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    // Serializes read-modify-write cycles across clones.
    write_lock: Arc<Mutex<()>>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn table_path(&self, table: TableId) -> PathBuf {
        self.root.join("curated").join(format!("{table}.json"))
    }

    fn staging_path(&self, source: SourceId) -> PathBuf {
        self.root
            .join("staging")
            .join(format!("{source}.json"))
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> IngestResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_rows(&self, table: TableId) -> IngestResult<Vec<Vec<Cell>>> {
        let path = self.table_path(table);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_manifest(&self) -> IngestResult<BTreeMap<SourceId, ManifestEntry>> {
        match tokio::fs::read(self.manifest_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl CuratedStore for FsStore {
    async fn replace_table(&self, table: CuratedTable) -> IngestResult<()> {
        let _guard = self.write_lock.lock().await;
        let rows: Vec<&Vec<Cell>> = table.rows.values().collect();
        let bytes = serde_json::to_vec_pretty(&rows)?;
        self.write_atomic(&self.table_path(table.table), &bytes)
            .await?;
        debug!(table = %table.table, rows = rows.len(), "table replaced");
        Ok(())
    }

    async fn table_rows(&self, table: TableId) -> IngestResult<Vec<Vec<Cell>>> {
        self.read_rows(table).await
    }

    async fn health_check(&self) -> IngestResult<()> {
        tokio::fs::create_dir_all(self.root.join("curated")).await?;
        tokio::fs::create_dir_all(self.root.join("staging")).await?;
        let probe = self.root.join(".health");
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }
}

impl StagingStore for FsStore {
    async fn replace_staging(&self, relation: &StagingRelation) -> IngestResult<()> {
        let _guard = self.write_lock.lock().await;
        let bytes = serde_json::to_vec_pretty(&relation.rows)?;
        self.write_atomic(&self.staging_path(relation.source), &bytes)
            .await?;
        debug!(source = %relation.source, rows = relation.rows.len(), "staging relation written");
        Ok(())
    }

    async fn staging_rows(&self, source: SourceId) -> IngestResult<Vec<StagingRow>> {
        match tokio::fs::read(self.staging_path(source)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ManifestStore for FsStore {
    async fn manifest(&self) -> IngestResult<BTreeMap<SourceId, ManifestEntry>> {
        self.read_manifest().await
    }

    async fn manifest_entry(&self, source: SourceId) -> IngestResult<Option<ManifestEntry>> {
        Ok(self.read_manifest().await?.remove(&source))
    }

    async fn upsert_manifest_entry(
        &self,
        source: SourceId,
        entry: ManifestEntry,
    ) -> IngestResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut manifest = self.read_manifest().await?;
        manifest.insert(source, entry);
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        self.write_atomic(&self.manifest_path(), &bytes).await
    }
}
