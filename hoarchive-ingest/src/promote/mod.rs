//! Promotion of validated staging rows into curated tables.
//!
//! Builds the keyed in-memory shape of every curated table before anything is written,
//! so a failure here leaves the store at its last known-good state. Uniqueness of the
//! business key is re-checked at this boundary; upstream deduplication should make
//! duplicates impossible, and a duplicate slipping through aborts the whole promotion.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::{ErrorKind, IngestResult};
use crate::ingest_error;
use crate::schema::{TableId, schema_for};
use crate::types::{BusinessKey, Cell, StagingRow};

/// One curated table in its keyed, promotable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuratedTable {
    pub table: TableId,
    /// Rows keyed by business key; iteration order is the table's canonical row order.
    pub rows: BTreeMap<BusinessKey, Vec<Cell>>,
}

impl CuratedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Keys validated rows into a curated table, enforcing business-key uniqueness.
pub fn build_table(table: TableId, rows: Vec<StagingRow>) -> IngestResult<CuratedTable> {
    let schema = schema_for(table.source());
    let key_indexes = schema.business_key_indexes();

    let mut keyed: BTreeMap<BusinessKey, Vec<Cell>> = BTreeMap::new();
    for row in rows {
        let key = BusinessKey::from_row(&row, &key_indexes);
        if let Some(previous) = keyed.insert(key.clone(), row.cells) {
            return Err(ingest_error!(
                ErrorKind::UniquenessViolation,
                "Duplicate business key at promotion",
                format!(
                    "table `{table}` key {key} appears more than once (line {}, prior row had {} cells)",
                    row.line,
                    previous.len()
                )
            ));
        }
    }

    info!(table = %table, rows = keyed.len(), "curated table built");
    Ok(CuratedTable { table, rows: keyed })
}
