//! Season-specific team alias resolution.
//!
//! Team abbreviations changed across decades of renames and relocations; a
//! `(season, abbreviation)` pair is only meaningful together. The resolver absorbs that
//! history into a single lookup built from the alias source, and is consulted (never
//! mutated) by the validator and promoter.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{ErrorKind, IngestResult};
use crate::ingest_error;
use crate::schema::{SourceId, schema_for};
use crate::staging::StagingRelation;

/// A successfully resolved team identity for one season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTeam {
    pub team_id: i64,
    pub league: Option<String>,
    pub playoffs: bool,
}

/// Lookup from `(season, abbreviation)` to a stable team identity.
#[derive(Debug, Clone, Default)]
pub struct TeamAliasResolver {
    entries: BTreeMap<(i64, String), ResolvedTeam>,
}

impl TeamAliasResolver {
    /// Builds the resolver from the raw alias staging relation.
    ///
    /// Built from pre-dedup rows on purpose: two rows claiming the same
    /// `(season, abbreviation)` with different target teams must fail construction
    /// rather than be silently collapsed by the deduplicator. Byte-duplicate rows are
    /// tolerated. Rows whose key or target fields are null cannot be mapped and are
    /// skipped; downstream referential checks surface the fallout.
    pub fn from_staging(relation: &StagingRelation) -> IngestResult<Self> {
        debug_assert_eq!(relation.source, SourceId::TeamAliases);

        let schema = schema_for(SourceId::TeamAliases);
        let season_idx = schema.index_of("season");
        let abbr_idx = schema.index_of("abbreviation");
        let team_idx = schema.index_of("team_id");
        let league_idx = schema.index_of("lg");
        let playoffs_idx = schema.index_of("playoffs");

        let mut entries: BTreeMap<(i64, String), ResolvedTeam> = BTreeMap::new();
        let mut skipped = 0u64;

        for row in &relation.rows {
            let (Some(season), Some(abbreviation), Some(team_id)) = (
                row.cells[season_idx].as_int(),
                row.cells[abbr_idx].as_text(),
                row.cells[team_idx].as_int(),
            ) else {
                skipped += 1;
                continue;
            };

            let resolved = ResolvedTeam {
                team_id,
                league: row.cells[league_idx].as_text().map(str::to_string),
                playoffs: row.cells[playoffs_idx].as_bool().unwrap_or(false),
            };

            let key = (season, abbreviation.to_string());
            match entries.get(&key) {
                None => {
                    entries.insert(key, resolved);
                }
                Some(existing) if existing.team_id == team_id => {
                    // Duplicate row restating the same mapping; nothing to do.
                }
                Some(existing) => {
                    return Err(ingest_error!(
                        ErrorKind::AliasAmbiguity,
                        "Conflicting team alias mappings",
                        format!(
                            "({season}, {abbreviation}) maps to both team {} and team {team_id} (source line {})",
                            existing.team_id, row.line
                        )
                    ));
                }
            }
        }

        if skipped > 0 {
            debug!(skipped, "alias rows with null key or target fields were skipped");
        }
        info!(aliases = entries.len(), "team alias resolver built");

        Ok(Self { entries })
    }

    /// Resolves a `(season, abbreviation)` pair.
    ///
    /// `None` is an ordinary outcome that consumers treat as a referential-integrity
    /// violation candidate.
    pub fn resolve(&self, season: i64, abbreviation: &str) -> Option<&ResolvedTeam> {
        self.entries.get(&(season, abbreviation.to_string()))
    }

    /// Number of distinct `(season, abbreviation)` mappings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates mappings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&(i64, String), &ResolvedTeam)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, StagingRow};

    fn alias_row(line: u64, season: i64, abbr: &str, team_id: i64) -> StagingRow {
        StagingRow::new(
            line,
            vec![
                Cell::Int(season),
                Cell::Text(abbr.into()),
                Cell::Int(team_id),
                Cell::Text("NBA".into()),
                Cell::Bool(false),
            ],
        )
    }

    fn relation(rows: Vec<StagingRow>) -> StagingRelation {
        StagingRelation {
            source: SourceId::TeamAliases,
            rows,
        }
    }

    #[test]
    fn resolves_unique_pairs() {
        let resolver = TeamAliasResolver::from_staging(&relation(vec![
            alias_row(2, 1999, "LAL", 14),
            alias_row(3, 1971, "SDR", 11),
            // The franchise moved; same abbreviation resolves differently by season.
            alias_row(4, 1972, "HOU", 11),
        ]))
        .unwrap();

        assert_eq!(resolver.len(), 3);
        assert_eq!(resolver.resolve(1971, "SDR").unwrap().team_id, 11);
        assert_eq!(resolver.resolve(1972, "HOU").unwrap().team_id, 11);
        assert!(resolver.resolve(1999, "SDR").is_none());
    }

    #[test]
    fn duplicate_identical_mappings_are_tolerated() {
        let resolver = TeamAliasResolver::from_staging(&relation(vec![
            alias_row(2, 1999, "LAL", 14),
            alias_row(3, 1999, "LAL", 14),
        ]))
        .unwrap();
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn conflicting_mappings_fail_construction() {
        let err = TeamAliasResolver::from_staging(&relation(vec![
            alias_row(2, 1999, "LAL", 14),
            alias_row(3, 1999, "LAL", 15),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AliasAmbiguity);
    }
}
