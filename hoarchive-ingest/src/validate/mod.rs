//! Cross-source integrity validation of deduplicated staging data.
//!
//! Confirms required columns, referential integrity (player, team, game, and
//! season-alias references), and the TOT-exclusivity domain rule before anything
//! promotes. Failing records are excluded from promotion and reported; the rest of the
//! relation still promotes. Rate columns outside [0, 1] are nulled and downgraded to
//! warnings, since source rounding artifacts are expected.

use std::collections::{BTreeMap, BTreeSet};

use bigdecimal::BigDecimal;
use serde::Serialize;
use tracing::info;

use crate::aliases::TeamAliasResolver;
use crate::schema::{TableId, schema_for};
use crate::types::{Cell, StagingRow};

/// Marker used by season split rows to denote the aggregate across teams.
pub const TOT_MARKER: &str = "TOT";

/// A record that failed a referential or domain rule and is excluded from promotion.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityViolation {
    pub table: TableId,
    pub rule: &'static str,
    /// Business key of the violating record, rendered for reporting.
    pub key: String,
    /// Offending field names.
    pub fields: Vec<String>,
    pub line: u64,
}

/// A rate value outside [0, 1] that was nulled but whose row was retained.
#[derive(Debug, Clone, Serialize)]
pub struct RateWarning {
    pub table: TableId,
    pub column: String,
    pub value: String,
    pub line: u64,
}

/// Validated relations plus everything that was excluded or repaired on the way.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub relations: BTreeMap<TableId, Vec<StagingRow>>,
    pub violations: Vec<IntegrityViolation>,
    pub warnings: Vec<RateWarning>,
}

/// Validates deduplicated relations against the dimensions they reference.
///
/// `relations` maps each curated table to its deduplicated, key-sorted rows. Tables are
/// checked in dependency order, and each dimension key set is built from the rows that
/// survived that dimension's own checks, so a fact row can only reference dimension rows
/// that will themselves promote.
pub fn validate(
    mut relations: BTreeMap<TableId, Vec<StagingRow>>,
    resolver: &TeamAliasResolver,
) -> ValidationOutcome {
    let mut violations = Vec::new();
    let mut warnings = Vec::new();

    for (&table, rows) in relations.iter_mut() {
        enforce_rate_bounds(table, rows, &mut warnings);
    }

    let mut players = BTreeSet::new();
    let mut teams = BTreeSet::new();
    let mut games = BTreeSet::new();

    for table in TableId::ALL {
        let Some(rows) = relations.remove(&table) else {
            continue;
        };
        let rows = check_required(table, rows, &mut violations);

        let kept = match table {
            TableId::TeamAlias => {
                check_int_fk(table, rows, &["team_id"], &teams, "team_fk", &mut violations)
            }
            TableId::Game => check_int_fk(
                table,
                rows,
                &["home_team_id", "away_team_id"],
                &teams,
                "team_fk",
                &mut violations,
            ),
            TableId::PlayerSeason => {
                let rows = check_int_fk(
                    table,
                    rows,
                    &["player_id"],
                    &players,
                    "player_fk",
                    &mut violations,
                );
                let rows = check_alias_fk(table, rows, "tm", resolver, &mut violations);
                check_tot_exclusivity(rows, &mut violations)
            }
            TableId::TeamSeason => {
                check_alias_fk(table, rows, "abbreviation", resolver, &mut violations)
            }
            TableId::PlayByPlay => {
                let rows = check_int_fk(
                    table,
                    rows,
                    &["game_id"],
                    &games,
                    "game_fk",
                    &mut violations,
                );
                check_int_fk(
                    table,
                    rows,
                    &["player1_team_id"],
                    &teams,
                    "team_fk",
                    &mut violations,
                )
            }
            // Dimension tables and league averages have no outbound references.
            TableId::Player | TableId::Team | TableId::LeagueAverage => rows,
        };

        match table {
            TableId::Player => players = key_set(&kept),
            TableId::Team => teams = key_set(&kept),
            TableId::Game => games = key_set(&kept),
            _ => {}
        }
        relations.insert(table, kept);
    }

    info!(
        violations = violations.len(),
        warnings = warnings.len(),
        "validation completed"
    );

    ValidationOutcome {
        relations,
        violations,
        warnings,
    }
}

/// Collects the single-column integer keys of a dimension relation.
fn key_set(rows: &[StagingRow]) -> BTreeSet<i64> {
    rows.iter()
        .filter_map(|row| row.cells.first().and_then(Cell::as_int))
        .collect()
}

/// Keeps rows whose non-nullable columns all carry a value.
///
/// The loader nulls unparseable or missing fields instead of dropping rows, so a
/// required column can arrive null; such a row has no usable identity and is excluded.
fn check_required(
    table: TableId,
    rows: Vec<StagingRow>,
    violations: &mut Vec<IntegrityViolation>,
) -> Vec<StagingRow> {
    let schema = schema_for(table.source());
    let required = schema.required_column_indexes();

    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let offending: Vec<String> = required
            .iter()
            .filter(|&&index| row.cells[index].is_null())
            .map(|&index| schema.columns[index].name.to_string())
            .collect();

        if offending.is_empty() {
            kept.push(row);
        } else {
            violations.push(IntegrityViolation {
                table,
                rule: "not_null",
                key: schema.key_of(&row).to_string(),
                fields: offending,
                line: row.line,
            });
        }
    }
    kept
}

/// Nulls out-of-range rate cells in place, recording a warning per cell.
fn enforce_rate_bounds(table: TableId, rows: &mut [StagingRow], warnings: &mut Vec<RateWarning>) {
    let schema = schema_for(table.source());
    let rate_indexes = schema.rate_column_indexes();
    if rate_indexes.is_empty() {
        return;
    }

    let zero = BigDecimal::from(0);
    let one = BigDecimal::from(1);

    for row in rows {
        for &index in &rate_indexes {
            let Cell::Numeric(value) = &row.cells[index] else {
                continue;
            };
            if *value < zero || *value > one {
                warnings.push(RateWarning {
                    table,
                    column: schema.columns[index].name.to_string(),
                    value: value.to_string(),
                    line: row.line,
                });
                row.cells[index] = Cell::Null;
            }
        }
    }
}

/// Keeps rows whose integer columns all reference existing dimension keys.
///
/// Null references are not dangling references; they pass. Each failing row becomes one
/// violation listing every offending field.
fn check_int_fk(
    table: TableId,
    rows: Vec<StagingRow>,
    columns: &[&str],
    dimension: &BTreeSet<i64>,
    rule: &'static str,
    violations: &mut Vec<IntegrityViolation>,
) -> Vec<StagingRow> {
    let schema = schema_for(table.source());
    let indexes: Vec<usize> = columns
        .iter()
        .map(|name| schema.index_of(name))
        .collect();

    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let offending: Vec<String> = indexes
            .iter()
            .zip(columns)
            .filter(|&(&index, _)| {
                row.cells[index]
                    .as_int()
                    .is_some_and(|id| !dimension.contains(&id))
            })
            .map(|(_, name)| name.to_string())
            .collect();

        if offending.is_empty() {
            kept.push(row);
        } else {
            violations.push(IntegrityViolation {
                table,
                rule,
                key: schema.key_of(&row).to_string(),
                fields: offending,
                line: row.line,
            });
        }
    }
    kept
}

/// Keeps rows whose `(season, abbreviation-like)` pair resolves via the alias resolver.
///
/// The TOT aggregate marker is not a team and is exempt.
fn check_alias_fk(
    table: TableId,
    rows: Vec<StagingRow>,
    abbreviation_column: &str,
    resolver: &TeamAliasResolver,
    violations: &mut Vec<IntegrityViolation>,
) -> Vec<StagingRow> {
    let schema = schema_for(table.source());
    let season_idx = schema.index_of("season");
    let abbr_idx = schema.index_of(abbreviation_column);

    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let resolves = match (row.cells[season_idx].as_int(), row.cells[abbr_idx].as_text()) {
            (_, Some(TOT_MARKER)) => true,
            (Some(season), Some(abbreviation)) => resolver.resolve(season, abbreviation).is_some(),
            // Null season or abbreviation cannot dangle.
            _ => true,
        };

        if resolves {
            kept.push(row);
        } else {
            violations.push(IntegrityViolation {
                table,
                rule: "team_alias_fk",
                key: schema.key_of(&row).to_string(),
                fields: vec![abbreviation_column.to_string()],
                line: row.line,
            });
        }
    }
    kept
}

/// Enforces TOT exclusivity per (player, season).
///
/// A season may carry exactly one TOT aggregate row, or one-or-more per-team rows, never
/// both. When both appear, every row of the conflicting group is excluded. A season with
/// neither simply produces no rows; absence is not a violation.
fn check_tot_exclusivity(
    rows: Vec<StagingRow>,
    violations: &mut Vec<IntegrityViolation>,
) -> Vec<StagingRow> {
    let schema = schema_for(TableId::PlayerSeason.source());
    let player_idx = schema.index_of("player_id");
    let season_idx = schema.index_of("season");
    let tm_idx = schema.index_of("tm");

    let mut groups: BTreeMap<(Option<i64>, Option<i64>), (bool, bool)> = BTreeMap::new();
    for row in &rows {
        let group = (
            row.cells[player_idx].as_int(),
            row.cells[season_idx].as_int(),
        );
        let is_tot = row.cells[tm_idx].as_text() == Some(TOT_MARKER);
        let entry = groups.entry(group).or_insert((false, false));
        if is_tot {
            entry.0 = true;
        } else {
            entry.1 = true;
        }
    }

    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let group = (
            row.cells[player_idx].as_int(),
            row.cells[season_idx].as_int(),
        );
        let (has_tot, has_team) = groups[&group];

        if has_tot && has_team {
            violations.push(IntegrityViolation {
                table: TableId::PlayerSeason,
                rule: "tot_exclusivity",
                key: schema.key_of(&row).to_string(),
                fields: vec!["tm".to_string()],
                line: row.line,
            });
        } else {
            kept.push(row);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::schema::SourceId;
    use crate::staging::StagingRelation;

    fn player(id: i64, name: &str) -> StagingRow {
        StagingRow::new(2, vec![Cell::Int(id), Cell::Text(name.into())])
    }

    fn team(id: i64, name: &str) -> StagingRow {
        StagingRow::new(2, vec![Cell::Int(id), Cell::Text(name.into())])
    }

    fn player_season(line: u64, player_id: i64, season: i64, tm: &str, fg_pct: &str) -> StagingRow {
        StagingRow::new(
            line,
            vec![
                Cell::Int(player_id),
                Cell::Int(season),
                Cell::Text(tm.into()),
                Cell::Text("NBA".into()),
                Cell::Null, // jersey
                Cell::Int(82),
                Cell::Null, // gs
                Cell::Null, // mp
                Cell::Int(1000),
                Cell::Null, // ast
                Cell::Null, // trb
                Cell::Numeric(bigdecimal::BigDecimal::from_str(fg_pct).unwrap()),
                Cell::Null, // fg3_pct
                Cell::Null, // ft_pct
            ],
        )
    }

    fn resolver_with(season: i64, abbr: &str, team_id: i64) -> TeamAliasResolver {
        TeamAliasResolver::from_staging(&StagingRelation {
            source: SourceId::TeamAliases,
            rows: vec![StagingRow::new(
                2,
                vec![
                    Cell::Int(season),
                    Cell::Text(abbr.into()),
                    Cell::Int(team_id),
                    Cell::Text("NBA".into()),
                    Cell::Bool(false),
                ],
            )],
        })
        .unwrap()
    }

    #[test]
    fn tot_and_per_team_rows_for_same_season_all_violate() {
        let resolver = resolver_with(1999, "LAL", 14);
        let mut relations = BTreeMap::new();
        relations.insert(TableId::Player, vec![player(7, "Someone")]);
        relations.insert(
            TableId::PlayerSeason,
            vec![
                player_season(2, 7, 1999, "LAL", "0.5"),
                player_season(3, 7, 1999, "TOT", "0.5"),
                // A clean season for the same player promotes untouched.
                player_season(4, 7, 2000, "TOT", "0.5"),
            ],
        );

        let outcome = validate(relations, &resolver);
        let kept = &outcome.relations[&TableId::PlayerSeason];
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cells[1], Cell::Int(2000));
        assert_eq!(outcome.violations.len(), 2);
        assert!(
            outcome
                .violations
                .iter()
                .all(|v| v.rule == "tot_exclusivity")
        );
    }

    #[test]
    fn dangling_player_and_unresolvable_alias_are_excluded() {
        let resolver = resolver_with(1999, "LAL", 14);
        let mut relations = BTreeMap::new();
        relations.insert(TableId::Player, vec![player(7, "Someone")]);
        relations.insert(
            TableId::PlayerSeason,
            vec![
                player_season(2, 7, 1999, "LAL", "0.5"),
                player_season(3, 99, 1999, "LAL", "0.5"),
                player_season(4, 7, 1999, "XXX", "0.5"),
            ],
        );

        let outcome = validate(relations, &resolver);
        assert_eq!(outcome.relations[&TableId::PlayerSeason].len(), 1);
        let rules: Vec<_> = outcome.violations.iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec!["player_fk", "team_alias_fk"]);
    }

    #[test]
    fn out_of_range_rate_is_nulled_with_warning_and_row_kept() {
        let resolver = resolver_with(1999, "LAL", 14);
        let mut relations = BTreeMap::new();
        relations.insert(TableId::Player, vec![player(7, "Someone")]);
        relations.insert(
            TableId::PlayerSeason,
            vec![player_season(2, 7, 1999, "LAL", "1.150")],
        );

        let outcome = validate(relations, &resolver);
        let kept = &outcome.relations[&TableId::PlayerSeason];
        assert_eq!(kept.len(), 1);
        let fg_idx = schema_for(SourceId::PlayerSeasons)
            .column_index("fg_pct")
            .unwrap();
        assert_eq!(kept[0].cells[fg_idx], Cell::Null);
        assert!(outcome.violations.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].column, "fg_pct");
    }

    #[test]
    fn null_in_required_column_is_excluded() {
        let resolver = TeamAliasResolver::default();
        let mut relations = BTreeMap::new();
        relations.insert(
            TableId::Player,
            vec![
                player(7, "Someone"),
                StagingRow::new(3, vec![Cell::Null, Cell::Text("No Id".into())]),
            ],
        );

        let outcome = validate(relations, &resolver);
        assert_eq!(outcome.relations[&TableId::Player].len(), 1);
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].rule, "not_null");
        assert_eq!(outcome.violations[0].fields, vec!["player_id"]);
        assert_eq!(outcome.violations[0].line, 3);
    }

    #[test]
    fn dangling_team_reference_in_play_by_play_excludes_only_that_row() {
        let resolver = TeamAliasResolver::default();
        let game = StagingRow::new(
            2,
            vec![
                Cell::Int(100),
                Cell::Int(1999),
                Cell::Date(chrono::NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()),
                Cell::Int(14),
                Cell::Int(15),
            ],
        );
        let event = |line: u64, eventnum: i64, team: Cell| {
            StagingRow::new(
                line,
                vec![
                    Cell::Int(100),
                    Cell::Int(eventnum),
                    Cell::Int(1),
                    Cell::Null,
                    Cell::Int(1),
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                    team,
                    Cell::Null,
                ],
            )
        };

        let mut relations = BTreeMap::new();
        relations.insert(TableId::Team, vec![team(14, "Lakers"), team(15, "Celtics")]);
        relations.insert(TableId::Game, vec![game]);
        relations.insert(
            TableId::PlayByPlay,
            vec![
                event(2, 1, Cell::Int(14)),
                event(3, 2, Cell::Int(9999999)),
                event(4, 3, Cell::Null),
            ],
        );

        let outcome = validate(relations, &resolver);
        assert_eq!(outcome.relations[&TableId::PlayByPlay].len(), 2);
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].rule, "team_fk");
        assert_eq!(outcome.violations[0].fields, vec!["player1_team_id"]);
    }

    #[test]
    fn events_of_an_excluded_game_are_excluded_too() {
        let resolver = TeamAliasResolver::default();
        // The only game references a team absent from the dimension.
        let game = StagingRow::new(
            2,
            vec![
                Cell::Int(100),
                Cell::Int(1999),
                Cell::Date(chrono::NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()),
                Cell::Int(14),
                Cell::Int(999),
            ],
        );
        let event = |line: u64, eventnum: i64| {
            StagingRow::new(
                line,
                vec![
                    Cell::Int(100),
                    Cell::Int(eventnum),
                    Cell::Int(1),
                    Cell::Null,
                    Cell::Int(1),
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                    Cell::Int(14),
                    Cell::Null,
                ],
            )
        };

        let mut relations = BTreeMap::new();
        relations.insert(TableId::Team, vec![team(14, "Lakers"), team(15, "Celtics")]);
        relations.insert(TableId::Game, vec![game]);
        relations.insert(TableId::PlayByPlay, vec![event(2, 1), event(3, 2)]);

        let outcome = validate(relations, &resolver);
        assert!(outcome.relations[&TableId::Game].is_empty());
        assert!(outcome.relations[&TableId::PlayByPlay].is_empty());

        let rules: Vec<_> = outcome.violations.iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec!["team_fk", "game_fk", "game_fk"]);
    }
}
