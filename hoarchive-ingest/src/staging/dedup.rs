use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::schema::SourceSchema;
use crate::types::StagingRow;

/// One staged row offered to the deduplicator, together with the ranking attributes of
/// the source file it came from.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Rank of the contributing source; higher wins.
    pub priority: u32,
    /// Recency of the contributing source file; newer wins.
    pub recency: DateTime<Utc>,
    pub row: StagingRow,
}

/// Per-relation deduplication report.
#[derive(Debug, Clone, Serialize)]
pub struct DedupReport {
    pub source: String,
    /// Number of distinct business keys seen.
    pub keys: u64,
    /// Number of keys that had more than one candidate.
    pub collisions: u64,
}

/// Reduces candidates to exactly one survivor per business key.
///
/// Within a key group the survivor is chosen by source priority descending, then recency
/// descending, then a full lexicographic comparison of the row's cells ascending in
/// schema column order. The cell comparison makes the choice reproducible across runs
/// even for byte-identical candidates. Output rows are sorted by business key.
pub fn dedupe(schema: &SourceSchema, candidates: Vec<Candidate>) -> (Vec<StagingRow>, DedupReport) {
    let mut groups: BTreeMap<_, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        let key = schema.key_of(&candidate.row);
        groups.entry(key).or_default().push(candidate);
    }

    let keys = groups.len() as u64;
    let mut collisions = 0u64;
    let mut survivors = Vec::with_capacity(groups.len());

    for (_, group) in groups {
        if group.len() > 1 {
            collisions += 1;
        }

        let survivor = group
            .into_iter()
            .min_by(compare_candidates)
            .expect("groups are never empty");
        survivors.push(survivor.row);
    }

    let report = DedupReport {
        source: schema.source.logical_name().to_string(),
        keys,
        collisions,
    };

    if report.collisions > 0 {
        info!(
            source = %schema.source,
            collisions = report.collisions,
            "resolved business-key collisions deterministically"
        );
    }

    (survivors, report)
}

/// Candidate ordering: the minimum under this comparison is the survivor.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .reverse()
        .then_with(|| a.recency.cmp(&b.recency).reverse())
        .then_with(|| a.row.cells.cmp(&b.row.cells))
}
