//! Staging: raw CSV sources to typed, deduplicated relations.

mod dedup;
mod loader;

pub use dedup::*;
pub use loader::*;

use crate::schema::SourceId;
use crate::types::StagingRow;

/// A fully staged source file: typed rows in source order.
///
/// Owned by the staging loader; downstream components only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRelation {
    pub source: SourceId,
    pub rows: Vec<StagingRow>,
}
