//! Shared fixtures for pipeline integration tests.

use std::path::Path;
use std::sync::Arc;

use hoarchive_config::shared::PipelineConfig;
use hoarchive_ingest::pipeline::Pipeline;
use hoarchive_ingest::store::MemoryStore;

pub const PLAYERS: &str = "\
player_id,full_name
1,Kareem Abdul-Jabbar
2,Magic Johnson
7,Glenn Rivers
";

pub const TEAMS: &str = "\
team_id,name
14,Los Angeles Lakers
15,Boston Celtics
";

pub const TEAM_ALIASES: &str = "\
season,abbreviation,team_id,lg,playoffs
1999,LAL,14,NBA,0
1999,BOS,15,NBA,0
2000,LAL,14,NBA,0
";

pub const GAMES: &str = "\
game_id,season,game_date,home_team_id,away_team_id
100,1999,1999-01-15,14,15
";

pub const PLAYER_SEASONS: &str = "\
player_id,season,tm,lg,jersey,g,gs,mp,pts,ast,trb,fg_pct,fg3_pct,ft_pct
1,1999,LAL,NBA,33,82,82,2500.5,1800,300,800,0.512,NA,0.765
2,1999,LAL,NBA,32,80,80,2400,1500,900,500,0.480,0.300,0.850
7,2000,LAL,NBA,25,75,10,1500,600,400,200,0.445,0.350,0.790
";

pub const TEAM_SEASONS: &str = "\
season,abbreviation,playoffs,lg,w,l,pts,opp_pts
1999,LAL,0,NBA,50,32,101.5,98.2
1999,BOS,0,NBA,40,42,99.0,100.0
";

pub const PLAY_BY_PLAY: &str = "\
game_id,eventnum,period,wctimestring,eventmsgtype,eventmsgactiontype,home_description,visitor_description,player1_id,player1_team_id,player2_id
100,2,1,7:12 PM,12,0,,,,,
100,4,1,7:13 PM,1,5,Layup,,1,14,
100,7,2,7:45 PM,2,1,,Miss,2,14,
";

pub const LEAGUE_AVERAGES: &str = "\
season,lg,g,pts,trb,ast,fg_pct
1999,NBA,82,183.2,85.1,45.3,0.457
";

/// Writes the default, internally consistent fixture set into `dir`.
pub fn write_fixtures(dir: &Path) {
    write_fixture(dir, "players.csv", PLAYERS);
    write_fixture(dir, "teams.csv", TEAMS);
    write_fixture(dir, "team_aliases.csv", TEAM_ALIASES);
    write_fixture(dir, "games.csv", GAMES);
    write_fixture(dir, "player_seasons.csv", PLAYER_SEASONS);
    write_fixture(dir, "team_seasons.csv", TEAM_SEASONS);
    write_fixture(dir, "play_by_play.csv", PLAY_BY_PLAY);
    write_fixture(dir, "league_averages.csv", LEAGUE_AVERAGES);
}

pub fn write_fixture(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

/// Builds a pipeline over a fresh in-memory store reading from `csv_dir`.
pub fn pipeline(csv_dir: &Path) -> Pipeline<MemoryStore> {
    pipeline_with_store(csv_dir, MemoryStore::new())
}

pub fn pipeline_with_store(csv_dir: &Path, store: MemoryStore) -> Pipeline<MemoryStore> {
    let config = PipelineConfig {
        csv_dir: csv_dir.to_path_buf(),
        ..PipelineConfig::default()
    };
    Pipeline::new(Arc::new(config), store)
}
