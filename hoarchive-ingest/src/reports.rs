//! Structured run reports emitted at the end of each pipeline stage.

use serde::Serialize;

use crate::schema::{SourceId, TableId};
use crate::staging::{DedupReport, LoadReport};
use crate::validate::{IntegrityViolation, RateWarning};

/// A source file that was present but could not be staged.
///
/// Schema errors are scoped to their file; the run continues with the rest.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: SourceId,
    pub error: String,
}

/// Why a source was not promoted in this run.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSource {
    pub source: SourceId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The fingerprint and schema version match the manifest; nothing to recompute.
    Unchanged,
    /// The file was absent from the csv directory.
    Missing,
    /// Staging failed for this file.
    LoadFailed,
    /// A dimension this source references did not stage; the table's last promoted
    /// state is kept.
    DependencyUnavailable,
    /// Shutdown was requested before this source was reached.
    ShutdownRequested,
}

/// Everything a pipeline run observed and decided, for operators and for tests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub loads: Vec<LoadReport>,
    pub load_failures: Vec<SourceFailure>,
    pub dedups: Vec<DedupReport>,
    pub violations: Vec<IntegrityViolation>,
    pub warnings: Vec<RateWarning>,
    pub promoted_tables: Vec<TableId>,
    pub skipped_sources: Vec<SkippedSource>,
}

impl RunReport {
    /// Whether the run staged or promoted anything at all.
    pub fn is_no_op(&self) -> bool {
        self.loads.is_empty() && self.promoted_tables.is_empty()
    }
}
