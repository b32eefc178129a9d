//! Per-source schema declarations.
//!
//! The registry declares, for each raw CSV source, the expected columns, their target
//! types, the business key of the curated table it feeds, and the static dependency map
//! used to scope incremental promotion. Everything downstream (loader, deduplicator,
//! validator, promoter, stores) consults this module instead of hardcoding column layout.

mod registry;

pub use registry::*;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{BusinessKey, StagingRow};

/// Identifies one raw CSV source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Players,
    Teams,
    TeamAliases,
    Games,
    PlayerSeasons,
    TeamSeasons,
    PlayByPlay,
    LeagueAverages,
}

impl SourceId {
    /// All known sources, in staging order (dimensions before facts).
    pub const ALL: [SourceId; 8] = [
        SourceId::Players,
        SourceId::Teams,
        SourceId::TeamAliases,
        SourceId::Games,
        SourceId::PlayerSeasons,
        SourceId::TeamSeasons,
        SourceId::PlayByPlay,
        SourceId::LeagueAverages,
    ];

    /// The expected file name of this source inside the configured csv directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            SourceId::Players => "players.csv",
            SourceId::Teams => "teams.csv",
            SourceId::TeamAliases => "team_aliases.csv",
            SourceId::Games => "games.csv",
            SourceId::PlayerSeasons => "player_seasons.csv",
            SourceId::TeamSeasons => "team_seasons.csv",
            SourceId::PlayByPlay => "play_by_play.csv",
            SourceId::LeagueAverages => "league_averages.csv",
        }
    }

    /// The stable logical name used in manifests and reports.
    pub fn logical_name(&self) -> &'static str {
        match self {
            SourceId::Players => "players",
            SourceId::Teams => "teams",
            SourceId::TeamAliases => "team_aliases",
            SourceId::Games => "games",
            SourceId::PlayerSeasons => "player_seasons",
            SourceId::TeamSeasons => "team_seasons",
            SourceId::PlayByPlay => "play_by_play",
            SourceId::LeagueAverages => "league_averages",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.logical_name())
    }
}

/// Identifies one curated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    Player,
    Team,
    TeamAlias,
    Game,
    PlayerSeason,
    TeamSeason,
    PlayByPlay,
    LeagueAverage,
}

impl TableId {
    /// All curated tables, in promotion order (dimensions before facts).
    pub const ALL: [TableId; 8] = [
        TableId::Player,
        TableId::Team,
        TableId::TeamAlias,
        TableId::Game,
        TableId::PlayerSeason,
        TableId::TeamSeason,
        TableId::PlayByPlay,
        TableId::LeagueAverage,
    ];

    /// The source file this table is built from.
    ///
    /// Every curated table has exactly one owning source, so promotion always replaces
    /// the table wholesale.
    pub fn source(&self) -> SourceId {
        match self {
            TableId::Player => SourceId::Players,
            TableId::Team => SourceId::Teams,
            TableId::TeamAlias => SourceId::TeamAliases,
            TableId::Game => SourceId::Games,
            TableId::PlayerSeason => SourceId::PlayerSeasons,
            TableId::TeamSeason => SourceId::TeamSeasons,
            TableId::PlayByPlay => SourceId::PlayByPlay,
            TableId::LeagueAverage => SourceId::LeagueAverages,
        }
    }

    /// The stable name used in reports and persisted table files.
    pub fn name(&self) -> &'static str {
        match self {
            TableId::Player => "player",
            TableId::Team => "team",
            TableId::TeamAlias => "team_alias",
            TableId::Game => "game",
            TableId::PlayerSeason => "player_season",
            TableId::TeamSeason => "team_season",
            TableId::PlayByPlay => "play_by_play",
            TableId::LeagueAverage => "league_average",
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Curated tables affected by a change in `source`.
pub fn tables_for_source(source: SourceId) -> &'static [TableId] {
    match source {
        SourceId::Players => &[TableId::Player],
        SourceId::Teams => &[TableId::Team],
        SourceId::TeamAliases => &[TableId::TeamAlias],
        SourceId::Games => &[TableId::Game],
        SourceId::PlayerSeasons => &[TableId::PlayerSeason],
        SourceId::TeamSeasons => &[TableId::TeamSeason],
        SourceId::PlayByPlay => &[TableId::PlayByPlay],
        SourceId::LeagueAverages => &[TableId::LeagueAverage],
    }
}

/// Sources whose staged relations `source`'s referential checks consult.
///
/// A source with an unavailable dependency cannot be rebuilt meaningfully in that run;
/// the pipeline skips its promotion and keeps the table's last promoted state.
pub fn source_dependencies(source: SourceId) -> &'static [SourceId] {
    match source {
        SourceId::Players | SourceId::Teams | SourceId::LeagueAverages => &[],
        SourceId::TeamAliases => &[SourceId::Teams],
        SourceId::Games => &[SourceId::Teams],
        SourceId::PlayerSeasons => &[SourceId::Players, SourceId::TeamAliases],
        SourceId::TeamSeasons => &[SourceId::TeamAliases],
        SourceId::PlayByPlay => &[SourceId::Games, SourceId::Teams],
    }
}

/// Discriminator used by the union view over team seasons and league-average rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Team,
    LeagueAverage,
}

/// Semantic target type of a source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    /// Decimal measure stored at scale 3.
    Numeric,
    /// Decimal fraction expected to lie in [0, 1]; checked at validation time.
    Rate,
    Date,
    Text,
    /// Identifier-like text (jersey numbers): never coerced to numeric.
    Identifier,
    Bool,
}

/// Declares one expected column of a source file.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: &'static str,
    pub typ: ColumnType,
    pub nullable: bool,
}

impl ColumnSchema {
    pub const fn new(name: &'static str, typ: ColumnType, nullable: bool) -> Self {
        Self { name, typ, nullable }
    }
}

/// Declares the full expected shape of one source file.
#[derive(Debug, Clone)]
pub struct SourceSchema {
    pub source: SourceId,
    /// Expected columns, in the order staged rows carry their cells.
    pub columns: Vec<ColumnSchema>,
    /// Names of the business-key columns, a subset of `columns`.
    pub business_key: Vec<&'static str>,
    /// Rank used by the deduplicator when several sources contribute the same key.
    pub source_priority: u32,
}

impl SourceSchema {
    /// Returns the index of `name` in the staged cell order.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of a column the registry is known to declare.
    ///
    /// Panics on an undeclared name; the registry tests rule that out for every
    /// column this crate asks for.
    pub fn index_of(&self, name: &str) -> usize {
        self.column_index(name)
            .unwrap_or_else(|| panic!("column `{name}` is not declared for {}", self.source))
    }

    /// Indexes of the business-key columns, in key order.
    pub fn business_key_indexes(&self) -> Vec<usize> {
        self.business_key
            .iter()
            .map(|name| {
                self.column_index(name)
                    .expect("business key must reference declared columns")
            })
            .collect()
    }

    /// Extracts the business key of a staged row.
    pub fn key_of(&self, row: &StagingRow) -> BusinessKey {
        BusinessKey::from_row(row, &self.business_key_indexes())
    }

    /// Indexes of columns declared non-nullable.
    pub fn required_column_indexes(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.nullable)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indexes of columns declared as 0..1 rates.
    pub fn rate_column_indexes(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.typ == ColumnType::Rate)
            .map(|(i, _)| i)
            .collect()
    }
}
