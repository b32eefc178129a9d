//! Source fingerprinting and the processed-file manifest.
//!
//! Each curated table records the fingerprint of the source content it was built from.
//! A subsequent run that sees the same fingerprint under the same schema version can
//! skip recomputation for that source entirely.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{ErrorKind, IngestResult};
use crate::ingest_error;
use crate::schema::SourceId;

/// A source file discovered in the configured CSV directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub source: SourceId,
    pub path: PathBuf,
    /// SHA-256 of the file content, lowercase hex.
    pub fingerprint: String,
    pub modified_at: DateTime<Utc>,
}

/// The manifest record kept per source after a successful promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub fingerprint: String,
    pub processed_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl ManifestEntry {
    /// Whether a discovered file matches this entry closely enough to skip reprocessing.
    ///
    /// A schema version bump invalidates every entry, since the curated shape changed
    /// even if the bytes did not.
    pub fn covers(&self, file: &SourceFile, schema_version: u32) -> bool {
        self.fingerprint == file.fingerprint && self.schema_version == schema_version
    }
}

/// Result of scanning the CSV directory for the known sources.
#[derive(Debug, Default)]
pub struct SourceScan {
    /// Present files in [`SourceId::ALL`] order.
    pub files: Vec<SourceFile>,
    /// Sources whose file was absent. Absence is reportable, not fatal.
    pub missing: Vec<SourceId>,
}

/// Scans `csv_dir` for every known source file and fingerprints the ones present.
pub fn scan_sources(csv_dir: &Path) -> IngestResult<SourceScan> {
    let mut scan = SourceScan::default();

    for source in SourceId::ALL {
        let path = csv_dir.join(source.file_name());
        if !path.exists() {
            debug!(source = %source, "source file absent, skipping");
            scan.missing.push(source);
            continue;
        }

        let fingerprint = fingerprint_file(&path)?;
        let modified_at = modified_at(&path)?;
        scan.files.push(SourceFile {
            source,
            path,
            fingerprint,
            modified_at,
        });
    }

    Ok(scan)
}

/// Sources whose current file content is not covered by the manifest.
///
/// A source counts as changed when it has no manifest entry, its fingerprint differs,
/// or the curated schema version moved since it was last processed.
pub fn changed_sources<'a, I>(
    files: I,
    manifest: &std::collections::BTreeMap<SourceId, ManifestEntry>,
    schema_version: u32,
) -> std::collections::BTreeSet<SourceId>
where
    I: IntoIterator<Item = &'a SourceFile>,
{
    files
        .into_iter()
        .filter(|file| {
            manifest
                .get(&file.source)
                .is_none_or(|entry| !entry.covers(file, schema_version))
        })
        .map(|file| file.source)
        .collect()
}

/// Computes the lowercase hex SHA-256 of a file's content.
pub fn fingerprint_file(path: &Path) -> IngestResult<String> {
    let mut file = File::open(path).map_err(|err| {
        ingest_error!(
            ErrorKind::IoError,
            "Source file could not be opened for fingerprinting",
            format!("{}: {err}", path.display()),
            source: err
        )
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let digest = hasher.finalize();
    Ok(digest.iter().fold(
        String::with_capacity(digest.len() * 2),
        |mut out, byte| {
            use std::fmt::Write;
            let _ = write!(out, "{byte:02x}");
            out
        },
    ))
}

fn modified_at(path: &Path) -> IngestResult<DateTime<Utc>> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}
