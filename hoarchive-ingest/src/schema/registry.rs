use std::sync::OnceLock;

use crate::schema::{ColumnSchema, ColumnType, SourceId, SourceSchema};

const fn col(name: &'static str, typ: ColumnType) -> ColumnSchema {
    ColumnSchema::new(name, typ, false)
}

const fn opt(name: &'static str, typ: ColumnType) -> ColumnSchema {
    ColumnSchema::new(name, typ, true)
}

/// Returns the declared schema for `source`.
pub fn schema_for(source: SourceId) -> &'static SourceSchema {
    static REGISTRY: OnceLock<Vec<SourceSchema>> = OnceLock::new();

    let registry = REGISTRY.get_or_init(build_registry);
    registry
        .iter()
        .find(|schema| schema.source == source)
        .expect("every source has a registered schema")
}

fn build_registry() -> Vec<SourceSchema> {
    vec![
        SourceSchema {
            source: SourceId::Players,
            columns: vec![
                col("player_id", ColumnType::Int),
                col("full_name", ColumnType::Text),
            ],
            business_key: vec!["player_id"],
            source_priority: 1,
        },
        SourceSchema {
            source: SourceId::Teams,
            columns: vec![
                col("team_id", ColumnType::Int),
                col("name", ColumnType::Text),
            ],
            business_key: vec!["team_id"],
            source_priority: 1,
        },
        SourceSchema {
            source: SourceId::TeamAliases,
            columns: vec![
                col("season", ColumnType::Int),
                col("abbreviation", ColumnType::Text),
                col("team_id", ColumnType::Int),
                col("lg", ColumnType::Text),
                col("playoffs", ColumnType::Bool),
            ],
            business_key: vec!["season", "abbreviation"],
            source_priority: 1,
        },
        SourceSchema {
            source: SourceId::Games,
            columns: vec![
                col("game_id", ColumnType::Int),
                col("season", ColumnType::Int),
                col("game_date", ColumnType::Date),
                col("home_team_id", ColumnType::Int),
                col("away_team_id", ColumnType::Int),
            ],
            business_key: vec!["game_id"],
            source_priority: 1,
        },
        SourceSchema {
            source: SourceId::PlayerSeasons,
            columns: vec![
                col("player_id", ColumnType::Int),
                col("season", ColumnType::Int),
                // Team abbreviation for the split, or the TOT aggregate marker.
                col("tm", ColumnType::Text),
                opt("lg", ColumnType::Text),
                opt("jersey", ColumnType::Identifier),
                opt("g", ColumnType::Int),
                opt("gs", ColumnType::Int),
                opt("mp", ColumnType::Numeric),
                opt("pts", ColumnType::Int),
                opt("ast", ColumnType::Int),
                opt("trb", ColumnType::Int),
                opt("fg_pct", ColumnType::Rate),
                opt("fg3_pct", ColumnType::Rate),
                opt("ft_pct", ColumnType::Rate),
            ],
            business_key: vec!["player_id", "season", "tm"],
            source_priority: 1,
        },
        SourceSchema {
            source: SourceId::TeamSeasons,
            columns: vec![
                col("season", ColumnType::Int),
                col("abbreviation", ColumnType::Text),
                col("playoffs", ColumnType::Bool),
                opt("lg", ColumnType::Text),
                opt("w", ColumnType::Int),
                opt("l", ColumnType::Int),
                opt("pts", ColumnType::Numeric),
                opt("opp_pts", ColumnType::Numeric),
            ],
            business_key: vec!["season", "abbreviation", "playoffs"],
            source_priority: 1,
        },
        SourceSchema {
            source: SourceId::PlayByPlay,
            columns: vec![
                col("game_id", ColumnType::Int),
                col("eventnum", ColumnType::Int),
                col("period", ColumnType::Int),
                opt("wctimestring", ColumnType::Text),
                col("eventmsgtype", ColumnType::Int),
                opt("eventmsgactiontype", ColumnType::Int),
                opt("home_description", ColumnType::Text),
                opt("visitor_description", ColumnType::Text),
                opt("player1_id", ColumnType::Int),
                opt("player1_team_id", ColumnType::Int),
                opt("player2_id", ColumnType::Int),
            ],
            business_key: vec!["game_id", "eventnum"],
            source_priority: 1,
        },
        SourceSchema {
            source: SourceId::LeagueAverages,
            columns: vec![
                col("season", ColumnType::Int),
                col("lg", ColumnType::Text),
                opt("g", ColumnType::Int),
                opt("pts", ColumnType::Numeric),
                opt("trb", ColumnType::Numeric),
                opt("ast", ColumnType::Numeric),
                opt("fg_pct", ColumnType::Rate),
            ],
            business_key: vec!["season"],
            source_priority: 1,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_source_has_a_schema() {
        for source in SourceId::ALL {
            let schema = schema_for(source);
            assert_eq!(schema.source, source);
            assert!(!schema.columns.is_empty());
        }
    }

    #[test]
    fn business_keys_reference_declared_columns() {
        for source in SourceId::ALL {
            let schema = schema_for(source);
            for key_column in &schema.business_key {
                assert!(
                    schema.column_index(key_column).is_some(),
                    "{source}: key column `{key_column}` not declared"
                );
            }
        }
    }

    #[test]
    fn key_columns_are_not_nullable() {
        for source in SourceId::ALL {
            let schema = schema_for(source);
            for index in schema.business_key_indexes() {
                assert!(
                    !schema.columns[index].nullable,
                    "{source}: key column `{}` must not be nullable",
                    schema.columns[index].name
                );
            }
        }
    }
}
