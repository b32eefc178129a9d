//! Storage abstractions for staging relations, curated tables, and the processed-file
//! manifest.

mod fs;
mod memory;
pub mod query;

pub use fs::FsStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::future::Future;

use crate::error::IngestResult;
use crate::ledger::ManifestEntry;
use crate::promote::CuratedTable;
use crate::schema::{SourceId, TableId};
use crate::staging::StagingRelation;
use crate::types::{Cell, StagingRow};

/// Destination for promoted curated tables.
///
/// Implementations must apply each call atomically with respect to readers: a reader
/// sees either the table as it was before the call or after, never a partial write.
pub trait CuratedStore {
    /// Replaces the table's content wholesale. Keys absent from `table` are deleted.
    fn replace_table(&self, table: CuratedTable) -> impl Future<Output = IngestResult<()>> + Send;

    /// Reads a table's rows in business-key order. An absent table reads as empty.
    fn table_rows(&self, table: TableId) -> impl Future<Output = IngestResult<Vec<Vec<Cell>>>> + Send;

    /// Verifies the store is reachable and writable.
    fn health_check(&self) -> impl Future<Output = IngestResult<()>> + Send;
}

/// Persistence for raw staging relations, one per source file.
pub trait StagingStore {
    /// Replaces the persisted staging relation for `relation.source`.
    fn replace_staging(
        &self,
        relation: &StagingRelation,
    ) -> impl Future<Output = IngestResult<()>> + Send;

    /// Reads the persisted staging rows of `source`. An absent relation reads as empty.
    fn staging_rows(
        &self,
        source: SourceId,
    ) -> impl Future<Output = IngestResult<Vec<StagingRow>>> + Send;
}

/// Persistence for the per-source processed-file manifest.
pub trait ManifestStore {
    fn manifest(
        &self,
    ) -> impl Future<Output = IngestResult<BTreeMap<SourceId, ManifestEntry>>> + Send;

    fn manifest_entry(
        &self,
        source: SourceId,
    ) -> impl Future<Output = IngestResult<Option<ManifestEntry>>> + Send;

    fn upsert_manifest_entry(
        &self,
        source: SourceId,
        entry: ManifestEntry,
    ) -> impl Future<Output = IngestResult<()>> + Send;
}
