//! Read-side queries over a curated store.
//!
//! The catalog joins curated tables in memory and always returns rows in a total,
//! documented order so the same store content yields the same answer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::IngestResult;
use crate::schema::{EntityKind, SourceId, TableId, schema_for};
use crate::store::CuratedStore;
use crate::types::Cell;

/// Filters for [`Catalog::query_players`]. All filters are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub season: Option<i64>,
    /// Team abbreviation, matched case-insensitively against the split's `tm` value or
    /// any alias of the season.
    pub team: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Page size applied when a query does not state its own limit.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// One player-season split joined with the player dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSeasonLine {
    pub player_id: i64,
    pub full_name: String,
    pub season: i64,
    pub team: String,
    pub games: Option<i64>,
    pub points: Option<i64>,
}

/// A row of the season union view: either a team's season or the league-wide average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonEntity {
    pub kind: EntityKind,
    pub cells: Vec<Cell>,
}

/// Query facade over any curated store.
#[derive(Debug, Clone)]
pub struct Catalog<S> {
    store: S,
}

impl<S: CuratedStore + Sync> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All season splits for one player, in (season, tm) order.
    pub async fn player_seasons(&self, player_id: i64) -> IngestResult<Vec<Vec<Cell>>> {
        let rows = self.store.table_rows(TableId::PlayerSeason).await?;
        Ok(rows
            .into_iter()
            .filter(|cells| cells.first().and_then(Cell::as_int) == Some(player_id))
            .collect())
    }

    /// Exact-grain lookup of one season split.
    pub async fn player_season(
        &self,
        player_id: i64,
        season: i64,
        tm: &str,
    ) -> IngestResult<Option<Vec<Cell>>> {
        let rows = self.store.table_rows(TableId::PlayerSeason).await?;
        Ok(rows.into_iter().find(|cells| {
            cells.first().and_then(Cell::as_int) == Some(player_id)
                && cells.get(1).and_then(Cell::as_int) == Some(season)
                && cells.get(2).and_then(|c| c.as_text()) == Some(tm)
        }))
    }

    /// Exact-grain lookup of one team season.
    pub async fn team_season(
        &self,
        season: i64,
        abbreviation: &str,
        playoffs: bool,
    ) -> IngestResult<Option<Vec<Cell>>> {
        let rows = self.store.table_rows(TableId::TeamSeason).await?;
        Ok(rows.into_iter().find(|cells| {
            cells.first().and_then(Cell::as_int) == Some(season)
                && cells.get(1).and_then(|c| c.as_text()) == Some(abbreviation)
                && cells.get(2).and_then(Cell::as_bool) == Some(playoffs)
        }))
    }

    /// The events of one game, ordered by (period, eventnum).
    pub async fn play_by_play(&self, game_id: i64) -> IngestResult<Vec<Vec<Cell>>> {
        let schema = schema_for(SourceId::PlayByPlay);
        let period_idx = schema.index_of("period");
        let eventnum_idx = schema.index_of("eventnum");

        let mut rows: Vec<Vec<Cell>> = self
            .store
            .table_rows(TableId::PlayByPlay)
            .await?
            .into_iter()
            .filter(|cells| cells.first().and_then(Cell::as_int) == Some(game_id))
            .collect();
        rows.sort_by(|a, b| {
            (&a[period_idx], &a[eventnum_idx]).cmp(&(&b[period_idx], &b[eventnum_idx]))
        });
        Ok(rows)
    }

    /// Team seasons of one season, in business-key order.
    pub async fn team_seasons(&self, season: i64) -> IngestResult<Vec<Vec<Cell>>> {
        let rows = self.store.table_rows(TableId::TeamSeason).await?;
        Ok(rows
            .into_iter()
            .filter(|cells| cells.first().and_then(Cell::as_int) == Some(season))
            .collect())
    }

    /// Union view of one season: every team season plus the league-average row, tagged
    /// by entity kind. Team rows first, league average last.
    pub async fn season_entities(&self, season: i64) -> IngestResult<Vec<SeasonEntity>> {
        let mut entities: Vec<SeasonEntity> = self
            .team_seasons(season)
            .await?
            .into_iter()
            .map(|cells| SeasonEntity {
                kind: EntityKind::Team,
                cells,
            })
            .collect();

        let averages = self.store.table_rows(TableId::LeagueAverage).await?;
        entities.extend(
            averages
                .into_iter()
                .filter(|cells| cells.first().and_then(Cell::as_int) == Some(season))
                .map(|cells| SeasonEntity {
                    kind: EntityKind::LeagueAverage,
                    cells,
                }),
        );
        Ok(entities)
    }

    /// Number of players in the dimension.
    pub async fn player_count(&self) -> IngestResult<u64> {
        Ok(self.store.table_rows(TableId::Player).await?.len() as u64)
    }

    /// Player-season splits joined with player names, filtered and paged.
    ///
    /// A team filter matches the split's own `tm` abbreviation or any alias that maps to
    /// the same team in that season, both case-insensitively. Results are ordered by
    /// (full_name, season) and paged with offset before limit.
    pub async fn query_players(&self, filter: &PlayerFilter) -> IngestResult<Vec<PlayerSeasonLine>> {
        let names: BTreeMap<i64, String> = self
            .store
            .table_rows(TableId::Player)
            .await?
            .into_iter()
            .filter_map(|cells| {
                let id = cells.first().and_then(Cell::as_int)?;
                let name = cells.get(1).and_then(|c| c.as_text().map(str::to_string))?;
                Some((id, name))
            })
            .collect();

        // Abbreviations equivalent to the filtered team, per season.
        let alias_matches = match &filter.team {
            Some(team) => Some(self.equivalent_abbreviations(team).await?),
            None => None,
        };

        let schema = schema_for(SourceId::PlayerSeasons);
        let season_idx = schema.index_of("season");
        let tm_idx = schema.index_of("tm");
        let g_idx = schema.index_of("g");
        let pts_idx = schema.index_of("pts");

        let mut lines = Vec::new();
        for cells in self.store.table_rows(TableId::PlayerSeason).await? {
            let (Some(player_id), Some(season), Some(team)) = (
                cells.first().and_then(Cell::as_int),
                cells[season_idx].as_int(),
                cells[tm_idx].as_text(),
            ) else {
                continue;
            };

            if filter.season.is_some_and(|wanted| wanted != season) {
                continue;
            }
            if let Some(equivalents) = &alias_matches
                && !equivalents.matches(season, team)
            {
                continue;
            }
            let Some(full_name) = names.get(&player_id) else {
                continue;
            };

            lines.push(PlayerSeasonLine {
                player_id,
                full_name: full_name.clone(),
                season,
                team: team.to_string(),
                games: cells[g_idx].as_int(),
                points: cells[pts_idx].as_int(),
            });
        }

        lines.sort_by(|a, b| {
            (&a.full_name, a.season, &a.team).cmp(&(&b.full_name, b.season, &b.team))
        });

        let limit = filter.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        Ok(lines
            .into_iter()
            .skip(filter.offset)
            .take(limit)
            .collect())
    }

    /// Builds the set of `(season, abbreviation)` pairs equivalent to `team`.
    ///
    /// An abbreviation is equivalent in a season when it matches the filter directly or
    /// when both map to the same team id through the alias table.
    async fn equivalent_abbreviations(&self, team: &str) -> IngestResult<AliasEquivalence> {
        let schema = schema_for(SourceId::TeamAliases);
        let season_idx = schema.index_of("season");
        let abbr_idx = schema.index_of("abbreviation");
        let team_idx = schema.index_of("team_id");

        let wanted = team.to_ascii_lowercase();
        let mut by_season: BTreeMap<i64, Vec<(String, i64)>> = BTreeMap::new();
        for cells in self.store.table_rows(TableId::TeamAlias).await? {
            let (Some(season), Some(abbr), Some(team_id)) = (
                cells[season_idx].as_int(),
                cells[abbr_idx].as_text(),
                cells[team_idx].as_int(),
            ) else {
                continue;
            };
            by_season
                .entry(season)
                .or_default()
                .push((abbr.to_ascii_lowercase(), team_id));
        }

        let mut equivalents: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for (season, aliases) in &by_season {
            let Some(&(_, wanted_id)) = aliases.iter().find(|(abbr, _)| *abbr == wanted) else {
                continue;
            };
            equivalents.insert(
                *season,
                aliases
                    .iter()
                    .filter(|&&(_, id)| id == wanted_id)
                    .map(|(abbr, _)| abbr.clone())
                    .collect(),
            );
        }

        Ok(AliasEquivalence {
            wanted,
            equivalents,
        })
    }
}

#[derive(Debug)]
struct AliasEquivalence {
    wanted: String,
    equivalents: BTreeMap<i64, Vec<String>>,
}

impl AliasEquivalence {
    fn matches(&self, season: i64, abbreviation: &str) -> bool {
        let abbreviation = abbreviation.to_ascii_lowercase();
        if abbreviation == self.wanted {
            return true;
        }
        self.equivalents
            .get(&season)
            .is_some_and(|aliases| aliases.contains(&abbreviation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promote::build_table;
    use crate::store::MemoryStore;
    use crate::types::StagingRow;

    fn player(id: i64, name: &str) -> StagingRow {
        StagingRow::new(2, vec![Cell::Int(id), Cell::Text(name.into())])
    }

    fn split(player_id: i64, season: i64, tm: &str, g: i64, pts: i64) -> StagingRow {
        StagingRow::new(
            2,
            vec![
                Cell::Int(player_id),
                Cell::Int(season),
                Cell::Text(tm.into()),
                Cell::Text("NBA".into()),
                Cell::Null,
                Cell::Int(g),
                Cell::Null,
                Cell::Null,
                Cell::Int(pts),
                Cell::Null,
                Cell::Null,
                Cell::Null,
                Cell::Null,
                Cell::Null,
            ],
        )
    }

    fn alias(season: i64, abbr: &str, team_id: i64) -> StagingRow {
        StagingRow::new(
            2,
            vec![
                Cell::Int(season),
                Cell::Text(abbr.into()),
                Cell::Int(team_id),
                Cell::Text("NBA".into()),
                Cell::Bool(false),
            ],
        )
    }

    async fn seeded_catalog() -> Catalog<MemoryStore> {
        let store = MemoryStore::new();
        store
            .replace_table(
                build_table(
                    TableId::Player,
                    vec![player(1, "Zeke Zawoluk"), player(2, "Al Attles")],
                )
                .unwrap(),
            )
            .await
            .unwrap();
        store
            .replace_table(
                build_table(
                    TableId::PlayerSeason,
                    vec![
                        split(1, 1971, "SDR", 70, 900),
                        split(1, 1972, "HOU", 75, 950),
                        split(2, 1971, "GSW", 80, 1100),
                    ],
                )
                .unwrap(),
            )
            .await
            .unwrap();
        store
            .replace_table(
                build_table(
                    TableId::TeamAlias,
                    vec![
                        alias(1971, "SDR", 11),
                        alias(1971, "SDA", 11),
                        alias(1971, "GSW", 9),
                        alias(1972, "HOU", 11),
                    ],
                )
                .unwrap(),
            )
            .await
            .unwrap();
        Catalog::new(store)
    }

    #[tokio::test]
    async fn exact_grain_lookups_match_full_keys_only() {
        let catalog = seeded_catalog().await;
        let split = catalog.player_season(1, 1971, "SDR").await.unwrap();
        assert!(split.is_some());
        assert!(catalog.player_season(1, 1971, "HOU").await.unwrap().is_none());
        assert!(catalog.team_season(1971, "SDR", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_orders_by_name_then_season() {
        let catalog = seeded_catalog().await;
        let lines = catalog.query_players(&PlayerFilter::default()).await.unwrap();
        let names: Vec<_> = lines
            .iter()
            .map(|l| (l.full_name.as_str(), l.season))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Al Attles", 1971),
                ("Zeke Zawoluk", 1971),
                ("Zeke Zawoluk", 1972)
            ]
        );
    }

    #[tokio::test]
    async fn team_filter_is_case_insensitive_and_alias_aware() {
        let catalog = seeded_catalog().await;
        let lines = catalog
            .query_players(&PlayerFilter {
                team: Some("sda".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        // SDA aliases team 11 in 1971, which SDR also maps to.
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].team, "SDR");
        assert_eq!(lines[0].season, 1971);
    }

    #[tokio::test]
    async fn season_filter_limit_and_offset_page_the_result() {
        let catalog = seeded_catalog().await;
        let filter = PlayerFilter {
            season: Some(1971),
            limit: Some(1),
            offset: 1,
            ..Default::default()
        };
        let lines = catalog.query_players(&filter).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].full_name, "Zeke Zawoluk");
    }

    #[tokio::test]
    async fn play_by_play_orders_by_period_then_eventnum() {
        let store = MemoryStore::new();
        let event = |eventnum: i64, period: i64| {
            StagingRow::new(
                2,
                vec![
                    Cell::Int(100),
                    Cell::Int(eventnum),
                    Cell::Int(period),
                    Cell::Null,
                    Cell::Int(1),
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                ],
            )
        };
        store
            .replace_table(
                build_table(
                    TableId::PlayByPlay,
                    vec![event(5, 1), event(2, 2), event(9, 1)],
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let catalog = Catalog::new(store);
        let rows = catalog.play_by_play(100).await.unwrap();
        let order: Vec<_> = rows
            .iter()
            .map(|c| (c[2].as_int().unwrap(), c[1].as_int().unwrap()))
            .collect();
        assert_eq!(order, vec![(1, 5), (1, 9), (2, 2)]);
    }

    #[tokio::test]
    async fn season_entities_tag_team_and_league_rows() {
        let store = MemoryStore::new();
        let team_season = StagingRow::new(
            2,
            vec![
                Cell::Int(1971),
                Cell::Text("SDR".into()),
                Cell::Bool(false),
                Cell::Text("NBA".into()),
                Cell::Int(40),
                Cell::Int(42),
                Cell::Null,
                Cell::Null,
            ],
        );
        let average = StagingRow::new(
            2,
            vec![
                Cell::Int(1971),
                Cell::Text("NBA".into()),
                Cell::Int(82),
                Cell::Null,
                Cell::Null,
                Cell::Null,
                Cell::Null,
            ],
        );
        store
            .replace_table(build_table(TableId::TeamSeason, vec![team_season]).unwrap())
            .await
            .unwrap();
        store
            .replace_table(build_table(TableId::LeagueAverage, vec![average]).unwrap())
            .await
            .unwrap();

        let catalog = Catalog::new(store);
        let entities = catalog.season_entities(1971).await.unwrap();
        let kinds: Vec<_> = entities.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Team, EntityKind::LeagueAverage]);
    }
}
