//! Pipeline orchestration: stage, deduplicate, validate, promote.
//!
//! Stages run strictly in order and each stage consumes the previous stage's output in
//! full. Staging relations are mirrored to the store as soon as their file stages;
//! curated writes happen only at the end of a successful promotion, after every curated
//! table has been built and checked, so an aborted run leaves the last known-good
//! curated state untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use hoarchive_config::shared::PipelineConfig;

use crate::aliases::TeamAliasResolver;
use crate::concurrency::{ShutdownRx, ShutdownTx, create_shutdown_channel, shutdown_requested};
use crate::error::{ErrorKind, IngestResult};
use crate::ingest_error;
use crate::ledger::{ManifestEntry, SourceFile, changed_sources, scan_sources};
use crate::promote::{CuratedTable, build_table};
use crate::reports::{RunReport, SkipReason, SkippedSource, SourceFailure};
use crate::schema::{SourceId, TableId, schema_for, source_dependencies, tables_for_source};
use crate::staging::{Candidate, StagingRelation, dedupe, load_source};
use crate::store::{CuratedStore, ManifestStore, StagingStore};
use crate::types::StagingRow;
use crate::validate::validate;

/// Promotion scope of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Rebuild every staged source regardless of the manifest.
    Full,
    /// Skip sources whose fingerprint and schema version match the manifest.
    Incremental,
}

/// One staged source file and everything learned while staging it.
#[derive(Debug)]
pub struct StagedSource {
    pub file: SourceFile,
    pub relation: StagingRelation,
}

/// All successfully staged sources of one run.
#[derive(Debug, Default)]
pub struct StagingSnapshot {
    pub sources: BTreeMap<SourceId, StagedSource>,
}

/// The ingestion pipeline over a curated store.
///
/// Assumes a single writer per store; concurrent runs against the same store must be
/// prevented by an external run lock.
#[derive(Debug)]
pub struct Pipeline<S> {
    config: Arc<PipelineConfig>,
    store: S,
    shutdown_tx: ShutdownTx,
    shutdown_rx: ShutdownRx,
}

impl<S> Pipeline<S>
where
    S: CuratedStore + ManifestStore + StagingStore + Clone + Send + Sync + 'static,
{
    pub fn new(config: Arc<PipelineConfig>, store: S) -> Self {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        Self {
            config,
            store,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Handle for requesting a graceful stop from another task.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stages every present source file into typed relations.
    ///
    /// Files are loaded on blocking threads, at most `max_load_workers` at a time. A
    /// file that fails to stage is reported and skipped; the rest of the run continues.
    pub async fn stage(&self, report: &mut RunReport) -> IngestResult<StagingSnapshot> {
        let scan = scan_sources(&self.config.csv_dir)?;
        for source in scan.missing {
            report.skipped_sources.push(SkippedSource {
                source,
                reason: SkipReason::Missing,
            });
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_load_workers as usize));
        let mut handles = Vec::with_capacity(scan.files.len());

        for file in scan.files {
            if shutdown_requested(&self.shutdown_rx) {
                warn!(source = %file.source, "shutdown requested, source not staged");
                report.skipped_sources.push(SkippedSource {
                    source: file.source,
                    reason: SkipReason::ShutdownRequested,
                });
                continue;
            }

            let permit = semaphore.clone().acquire_owned().await.map_err(|err| {
                ingest_error!(
                    ErrorKind::InvalidState,
                    "Load worker semaphore closed unexpectedly",
                    err,
                    source: err
                )
            })?;
            let null_tokens = self.config.null_tokens.clone();
            let schema = schema_for(file.source);
            let path = file.path.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let result = load_source(&path, schema, &null_tokens);
                drop(permit);
                result
            });
            handles.push((file, handle));
        }

        let joined = future::join_all(
            handles
                .into_iter()
                .map(|(file, handle)| async move { (file, handle.await) }),
        )
        .await;

        let mut snapshot = StagingSnapshot::default();
        for (file, joined_result) in joined {
            match joined_result? {
                Ok((relation, load_report)) => {
                    report.loads.push(load_report);
                    snapshot
                        .sources
                        .insert(file.source, StagedSource { file, relation });
                }
                Err(err) => {
                    warn!(source = %file.source, error = %err, "source failed to stage");
                    report.load_failures.push(SourceFailure {
                        source: file.source,
                        error: err.to_string(),
                    });
                    report.skipped_sources.push(SkippedSource {
                        source: file.source,
                        reason: SkipReason::LoadFailed,
                    });
                }
            }
        }

        Ok(snapshot)
    }

    /// Stages every source and persists the raw staging relations, without promoting.
    pub async fn ingest(&self) -> IngestResult<RunReport> {
        let mut report = RunReport::default();
        let snapshot = self.stage(&mut report).await?;
        self.persist_staging(&snapshot).await?;
        Ok(report)
    }

    /// Stages and validates without writing anything to the store.
    pub async fn check(&self) -> IngestResult<RunReport> {
        let mut report = RunReport::default();
        let snapshot = self.stage(&mut report).await?;
        let resolver = self.build_resolver(&snapshot)?;
        let relations = self.dedupe_snapshot(&snapshot, &mut report);
        let outcome = validate(relations, &resolver);
        report.violations = outcome.violations;
        report.warnings = outcome.warnings;
        Ok(report)
    }

    /// Runs the full pipeline and promotes the result.
    pub async fn run(&self, mode: RunMode) -> IngestResult<RunReport> {
        let mut report = RunReport::default();
        let snapshot = self.stage(&mut report).await?;

        if shutdown_requested(&self.shutdown_rx) {
            info!("shutdown requested after staging, nothing promoted");
            return Ok(report);
        }

        self.persist_staging(&snapshot).await?;
        let blocked = self.dependency_blocked(&snapshot, &mut report);

        let resolver = self.build_resolver(&snapshot)?;
        let mut relations = self.dedupe_snapshot(&snapshot, &mut report);
        for source in &blocked {
            for table in tables_for_source(*source) {
                relations.remove(table);
            }
        }
        let outcome = validate(relations, &resolver);
        report.violations = outcome.violations;
        report.warnings = outcome.warnings;
        let mut validated = outcome.relations;

        // Decide, per source, whether promotion can be skipped this run.
        let manifest = self.store.manifest().await?;
        let changed = changed_sources(
            snapshot.sources.values().map(|staged| &staged.file),
            &manifest,
            self.config.schema_version,
        );
        let mut promotable: Vec<(SourceId, String)> = Vec::new();
        for (source, staged) in &snapshot.sources {
            if blocked.contains(source) {
                continue;
            }
            let unchanged = mode == RunMode::Incremental && !changed.contains(source);
            if unchanged {
                info!(source = %source, "fingerprint unchanged, promotion skipped");
                report.skipped_sources.push(SkippedSource {
                    source: *source,
                    reason: SkipReason::Unchanged,
                });
            } else {
                promotable.push((*source, staged.file.fingerprint.clone()));
            }
        }

        // Build every table before writing anything. A uniqueness failure here aborts
        // the run with the store untouched.
        let mut built: Vec<(SourceId, String, Vec<CuratedTable>)> = Vec::new();
        for (source, fingerprint) in promotable {
            let mut tables = Vec::new();
            for &table in tables_for_source(source) {
                let rows = validated.remove(&table).unwrap_or_default();
                tables.push(build_table(table, rows)?);
            }
            built.push((source, fingerprint, tables));
        }

        if shutdown_requested(&self.shutdown_rx) {
            info!("shutdown requested before promotion, nothing promoted");
            return Ok(report);
        }

        // Commit. Each table has a single owning source, so promotion replaces it
        // outright; keys absent from the rebuilt table are deleted.
        for (source, fingerprint, tables) in built {
            for table in tables {
                let table_id = table.table;
                self.store.replace_table(table).await?;
                report.promoted_tables.push(table_id);
            }
            self.store
                .upsert_manifest_entry(
                    source,
                    ManifestEntry {
                        fingerprint,
                        processed_at: Utc::now(),
                        schema_version: self.config.schema_version,
                    },
                )
                .await?;
        }

        info!(
            promoted = report.promoted_tables.len(),
            violations = report.violations.len(),
            "pipeline run completed"
        );
        Ok(report)
    }

    /// Writes each staged relation through to the store's staging area.
    async fn persist_staging(&self, snapshot: &StagingSnapshot) -> IngestResult<()> {
        for staged in snapshot.sources.values() {
            self.store.replace_staging(&staged.relation).await?;
        }
        Ok(())
    }

    /// Sources staged this run whose referential dimensions did not stage.
    ///
    /// Rebuilding a fact table against an absent dimension would exclude every row and
    /// then overwrite the table's last known-good state; those sources are skipped.
    fn dependency_blocked(
        &self,
        snapshot: &StagingSnapshot,
        report: &mut RunReport,
    ) -> BTreeSet<SourceId> {
        let mut blocked = BTreeSet::new();
        for source in snapshot.sources.keys() {
            let unavailable = source_dependencies(*source)
                .iter()
                .any(|dep| !snapshot.sources.contains_key(dep));
            if unavailable {
                warn!(source = %source, "dimension source unavailable, promotion skipped");
                report.skipped_sources.push(SkippedSource {
                    source: *source,
                    reason: SkipReason::DependencyUnavailable,
                });
                blocked.insert(*source);
            }
        }
        blocked
    }

    /// Builds the alias resolver from the raw alias relation, before deduplication.
    ///
    /// Conflicting mappings must fail the run here instead of being collapsed to an
    /// arbitrary survivor downstream. A run without the alias source gets an empty
    /// resolver, and alias-dependent rows fall out at validation.
    fn build_resolver(&self, snapshot: &StagingSnapshot) -> IngestResult<TeamAliasResolver> {
        match snapshot.sources.get(&SourceId::TeamAliases) {
            Some(staged) => TeamAliasResolver::from_staging(&staged.relation),
            None => Ok(TeamAliasResolver::default()),
        }
    }

    /// Deduplicates every staged relation into key-sorted rows per curated table.
    fn dedupe_snapshot(
        &self,
        snapshot: &StagingSnapshot,
        report: &mut RunReport,
    ) -> BTreeMap<TableId, Vec<StagingRow>> {
        let mut relations = BTreeMap::new();
        for (source, staged) in &snapshot.sources {
            let schema = schema_for(*source);
            let candidates = staged
                .relation
                .rows
                .iter()
                .map(|row| Candidate {
                    priority: schema.source_priority,
                    recency: staged.file.modified_at,
                    row: row.clone(),
                })
                .collect();
            let (rows, dedup_report) = dedupe(schema, candidates);
            report.dedups.push(dedup_report);

            for &table in tables_for_source(*source) {
                relations.insert(table, rows.clone());
            }
        }
        relations
    }
}
