// SQLite persistence for ranked player-games, feature rows and pipeline runs.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gridiron_core::model::{FeatureRow, PlayerGameRecord, PlayerProfile};
use rusqlite::{params, Connection, OptionalExtension};

/// Summary of one pipeline run, stored in the `runs` table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub seasons: Vec<i32>,
    pub records: usize,
    pub feature_rows: usize,
    pub skipped_rows: usize,
}

/// SQLite-backed store. Every batch write is a single transaction and every
/// insert is keyed, so re-running the pipeline overwrites rather than
/// duplicates.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at `path` and ensure all tables exist.
    /// Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS profiles (
                id        TEXT PRIMARY KEY,
                positions TEXT NOT NULL,
                tank_id   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS player_games (
                player_id TEXT NOT NULL,
                game_id   TEXT NOT NULL,
                season    INTEGER NOT NULL,
                week      INTEGER NOT NULL,
                team      TEXT,
                opponent  TEXT NOT NULL,
                is_home   INTEGER NOT NULL,
                points    REAL NOT NULL,
                stats     TEXT NOT NULL,
                stat_rank TEXT,
                PRIMARY KEY (player_id, game_id)
            );

            CREATE INDEX IF NOT EXISTS idx_player_games_season_week
                ON player_games(season, week);

            CREATE TABLE IF NOT EXISTS features (
                player_game_id                               TEXT PRIMARY KEY,
                player_id                                    TEXT NOT NULL,
                season_week_key                              INTEGER NOT NULL,
                position_index                               INTEGER NOT NULL,
                is_home                                      INTEGER NOT NULL,
                avg_points_this_season                       REAL NOT NULL,
                avg_points_last_5_games                      REAL NOT NULL,
                avg_category_rank_for_position               REAL NOT NULL,
                opponent_avg_points_allowed_this_season      REAL NOT NULL,
                opponent_avg_defensive_rank_against_position REAL NOT NULL,
                actual_points                                REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS runs (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at   TEXT NOT NULL,
                finished_at  TEXT NOT NULL,
                seasons      TEXT NOT NULL,
                records      INTEGER NOT NULL,
                feature_rows INTEGER NOT NULL,
                skipped_rows INTEGER NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Insert or replace player profiles in a single transaction.
    pub fn upsert_profiles(&self, profiles: &[PlayerProfile]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin profile transaction")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO profiles (id, positions, tank_id)
                     VALUES (?1, ?2, ?3)",
                )
                .context("failed to prepare profile upsert")?;
            for profile in profiles {
                let positions = serde_json::to_string(&profile.positions)
                    .context("failed to serialize positions")?;
                stmt.execute(params![profile.id, positions, profile.tank_external_id])
                    .with_context(|| format!("failed to upsert profile {}", profile.id))?;
            }
        }
        tx.commit().context("failed to commit profiles")?;
        Ok(profiles.len())
    }

    /// Insert or replace ranked player-games keyed by (player_id, game_id).
    pub fn upsert_player_games(&self, records: &[PlayerGameRecord]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin player-game transaction")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO player_games
                        (player_id, game_id, season, week, team, opponent, is_home, points, stats, stat_rank)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )
                .context("failed to prepare player-game upsert")?;
            for record in records {
                let stats =
                    serde_json::to_string(&record.stats).context("failed to serialize stats")?;
                let stat_rank = record
                    .stat_rank
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()
                    .context("failed to serialize stat ranks")?;
                stmt.execute(params![
                    record.player_id,
                    record.game_id,
                    record.season,
                    record.week,
                    record.team,
                    record.opponent_team_id,
                    record.is_home,
                    record.points,
                    stats,
                    stat_rank,
                ])
                .with_context(|| format!("failed to upsert {}", record.player_game_id()))?;
            }
        }
        tx.commit().context("failed to commit player-games")?;
        Ok(records.len())
    }

    /// Insert or replace feature rows keyed by player-game id.
    pub fn upsert_features(&self, rows: &[FeatureRow]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin feature transaction")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO features
                        (player_game_id, player_id, season_week_key, position_index, is_home,
                         avg_points_this_season, avg_points_last_5_games,
                         avg_category_rank_for_position,
                         opponent_avg_points_allowed_this_season,
                         opponent_avg_defensive_rank_against_position, actual_points)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                )
                .context("failed to prepare feature upsert")?;
            for row in rows {
                stmt.execute(params![
                    row.player_game_id,
                    row.player_id,
                    row.season_week_key,
                    row.position_index,
                    row.is_home,
                    row.avg_points_this_season,
                    row.avg_points_last_5_games,
                    row.avg_category_rank_for_position,
                    row.opponent_avg_points_allowed_this_season,
                    row.opponent_avg_defensive_rank_against_position,
                    row.actual_points,
                ])
                .with_context(|| format!("failed to upsert feature row {}", row.player_game_id))?;
            }
        }
        tx.commit().context("failed to commit features")?;
        Ok(rows.len())
    }

    /// Append a run summary. Returns the new run id.
    pub fn record_run(&self, run: &RunRecord) -> Result<i64> {
        let conn = self.conn();
        let seasons = serde_json::to_string(&run.seasons).context("failed to serialize seasons")?;
        conn.execute(
            "INSERT INTO runs (started_at, finished_at, seasons, records, feature_rows, skipped_rows)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
                seasons,
                run.records as i64,
                run.feature_rows as i64,
                run.skipped_rows as i64,
            ],
        )
        .context("failed to record run")?;
        Ok(conn.last_insert_rowid())
    }

    /// The most recently recorded run, if any.
    pub fn last_run(&self) -> Result<Option<RunRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT started_at, finished_at, seasons, records, feature_rows, skipped_rows
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()
            .context("failed to query last run")?;

        let Some((started, finished, seasons, records, feature_rows, skipped_rows)) = row else {
            return Ok(None);
        };
        Ok(Some(RunRecord {
            started_at: parse_timestamp(&started)?,
            finished_at: parse_timestamp(&finished)?,
            seasons: serde_json::from_str(&seasons).context("failed to parse run seasons")?,
            records: records as usize,
            feature_rows: feature_rows as usize,
            skipped_rows: skipped_rows as usize,
        }))
    }

    /// Load one stored player-game, ranks included.
    pub fn load_player_game(
        &self,
        player_id: &str,
        game_id: &str,
    ) -> Result<Option<PlayerGameRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT player_id, game_id, season, week, team, opponent, is_home, points, stats, stat_rank
                 FROM player_games WHERE player_id = ?1 AND game_id = ?2",
                params![player_id, game_id],
                |row| {
                    Ok((
                        PlayerGameRecord {
                            player_id: row.get(0)?,
                            game_id: row.get(1)?,
                            season: row.get(2)?,
                            week: row.get(3)?,
                            team: row.get(4)?,
                            opponent_team_id: row.get(5)?,
                            is_home: row.get(6)?,
                            points: row.get(7)?,
                            stats: Default::default(),
                            stat_rank: None,
                        },
                        row.get::<_, String>(8)?,
                        row.get::<_, Option<String>>(9)?,
                    ))
                },
            )
            .optional()
            .context("failed to query player-game")?;

        let Some((mut record, stats, stat_rank)) = row else {
            return Ok(None);
        };
        record.stats = serde_json::from_str(&stats).context("failed to parse stored stats")?;
        record.stat_rank = stat_rank
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .context("failed to parse stored stat ranks")?;
        Ok(Some(record))
    }

    /// All feature rows ordered by season-week key, then player-game id.
    pub fn load_features(&self) -> Result<Vec<FeatureRow>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_game_id, player_id, season_week_key, position_index, is_home,
                        avg_points_this_season, avg_points_last_5_games,
                        avg_category_rank_for_position,
                        opponent_avg_points_allowed_this_season,
                        opponent_avg_defensive_rank_against_position, actual_points
                 FROM features ORDER BY season_week_key, player_game_id",
            )
            .context("failed to prepare load_features query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(FeatureRow {
                    player_game_id: row.get(0)?,
                    player_id: row.get(1)?,
                    season_week_key: row.get(2)?,
                    position_index: row.get(3)?,
                    is_home: row.get(4)?,
                    avg_points_this_season: row.get(5)?,
                    avg_points_last_5_games: row.get(6)?,
                    avg_category_rank_for_position: row.get(7)?,
                    opponent_avg_points_allowed_this_season: row.get(8)?,
                    opponent_avg_defensive_rank_against_position: row.get(9)?,
                    actual_points: row.get(10)?,
                })
            })
            .context("failed to query features")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map feature rows")?;

        Ok(rows)
    }

    /// Row count for one of this store's tables.
    pub fn count(&self, table: Table) -> Result<usize> {
        let conn = self.conn();
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let n: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("failed to count {}", table.name()))?;
        Ok(n as usize)
    }
}

/// Tables whose size callers may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Profiles,
    PlayerGames,
    Features,
    Runs,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::PlayerGames => "player_games",
            Table::Features => "features",
            Table::Runs => "runs",
        }
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("invalid stored timestamp '{text}'"))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridiron_core::category::Category;
    use gridiron_core::model::{GameStats, RushingStats, StatRank};

    /// Fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn sample_record(player: &str, game: &str) -> PlayerGameRecord {
        let mut rank = StatRank::default();
        rank.set(Category::RushYds, 3);
        PlayerGameRecord {
            player_id: player.into(),
            game_id: game.into(),
            opponent_team_id: "KC".into(),
            team: Some("DET".into()),
            week: 4,
            season: 2023,
            is_home: true,
            points: 12.5,
            stats: GameStats {
                rushing: Some(RushingStats {
                    carries: 14,
                    rush_yds: 71,
                    rush_td: 1,
                }),
                ..Default::default()
            },
            stat_rank: Some(rank),
        }
    }

    fn sample_row(id: &str, key: u32) -> FeatureRow {
        FeatureRow {
            player_game_id: id.into(),
            player_id: "p".into(),
            season_week_key: key,
            position_index: 1,
            is_home: 0,
            avg_points_this_season: 10.0,
            avg_points_last_5_games: 9.0,
            avg_category_rank_for_position: 4.2,
            opponent_avg_points_allowed_this_season: 7.0,
            opponent_avg_defensive_rank_against_position: 11.0,
            actual_points: 14.0,
        }
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        for expected in ["features", "player_games", "profiles", "runs"] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[test]
    fn player_game_round_trip_keeps_ranks() {
        let db = test_db();
        let record = sample_record("p1", "g1");
        db.upsert_player_games(std::slice::from_ref(&record)).unwrap();

        let loaded = db.load_player_game("p1", "g1").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(db.load_player_game("p1", "nope").unwrap().is_none());
    }

    #[test]
    fn upserts_are_idempotent() {
        let db = test_db();
        let mut record = sample_record("p1", "g1");
        db.upsert_player_games(std::slice::from_ref(&record)).unwrap();
        record.points = 20.0;
        db.upsert_player_games(std::slice::from_ref(&record)).unwrap();

        assert_eq!(db.count(Table::PlayerGames).unwrap(), 1);
        let loaded = db.load_player_game("p1", "g1").unwrap().unwrap();
        assert!((loaded.points - 20.0).abs() < f64::EPSILON);

        db.upsert_features(&[sample_row("p_g1", 202301)]).unwrap();
        db.upsert_features(&[sample_row("p_g1", 202301)]).unwrap();
        assert_eq!(db.count(Table::Features).unwrap(), 1);
    }

    #[test]
    fn features_load_in_key_order() {
        let db = test_db();
        db.upsert_features(&[
            sample_row("b", 202302),
            sample_row("a", 202302),
            sample_row("z", 202301),
        ])
        .unwrap();
        let ids: Vec<String> = db
            .load_features()
            .unwrap()
            .into_iter()
            .map(|r| r.player_game_id)
            .collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
    }

    #[test]
    fn profiles_upsert_replaces() {
        let db = test_db();
        let mut profile = PlayerProfile::new("4046", &["RB"]);
        db.upsert_profiles(std::slice::from_ref(&profile)).unwrap();
        profile.positions.push("WR".into());
        db.upsert_profiles(std::slice::from_ref(&profile)).unwrap();
        assert_eq!(db.count(Table::Profiles).unwrap(), 1);

        let conn = db.conn();
        let positions: String = conn
            .query_row("SELECT positions FROM profiles WHERE id = '4046'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(positions, r#"["RB","WR"]"#);
    }

    #[test]
    fn runs_record_and_reload() {
        let db = test_db();
        assert!(db.last_run().unwrap().is_none());

        let started = Utc::now();
        let run = RunRecord {
            started_at: started,
            finished_at: started,
            seasons: vec![2022, 2023],
            records: 200,
            feature_rows: 150,
            skipped_rows: 12,
        };
        let first = db.record_run(&run).unwrap();
        let second = db.record_run(&RunRecord { records: 201, ..run.clone() }).unwrap();
        assert!(second > first);

        let last = db.last_run().unwrap().unwrap();
        assert_eq!(last.records, 201);
        assert_eq!(last.seasons, vec![2022, 2023]);
        assert_eq!(last.started_at, started);
    }
}
