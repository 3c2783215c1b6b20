// Input loading: player profiles (CSV), player-game records (JSON) and the
// league schedule (CSV).
//
// CSV loaders skip malformed rows with a warning. Record files are all or
// nothing: a single bad record (an unparseable week, say) rejects the file.

use std::io::Read;
use std::path::Path;

use gridiron_core::model::{PlayerGameRecord, PlayerProfile, NO_TANK_ID};
use gridiron_core::schedule::ScheduledGame;
use gridiron_core::team::{is_team_code, normalize_team_code};
use gridiron_core::week::parse_week;
use serde::Deserialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

/// `id,positions,tank_id`, positions `|`-separated with the primary first.
#[derive(Debug, Deserialize)]
struct RawProfile {
    id: String,
    #[serde(default)]
    positions: String,
    #[serde(default, alias = "tankID")]
    tank_id: String,
}

#[derive(Debug, Deserialize)]
struct RawScheduledGame {
    #[serde(alias = "gameID")]
    game_id: String,
    #[serde(alias = "home")]
    home_team: String,
    #[serde(alias = "away")]
    away_team: String,
    season: i32,
    week: String,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_profiles_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerProfile>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut profiles = Vec::new();
    for result in reader.deserialize::<RawProfile>() {
        match result {
            Ok(raw) => {
                let id = raw.id.trim();
                if id.is_empty() {
                    warn!("skipping profile row with empty id");
                    continue;
                }
                let tank_id = raw.tank_id.trim();
                profiles.push(PlayerProfile {
                    id: id.to_string(),
                    positions: raw
                        .positions
                        .split('|')
                        .map(|p| p.trim().to_uppercase())
                        .filter(|p| !p.is_empty())
                        .collect(),
                    tank_external_id: if tank_id.is_empty() {
                        NO_TANK_ID.to_string()
                    } else {
                        tank_id.to_string()
                    },
                });
            }
            Err(e) => {
                warn!("skipping malformed profile row: {}", e);
            }
        }
    }
    Ok(profiles)
}

fn load_schedule_from_reader<R: Read>(rdr: R) -> Result<Vec<ScheduledGame>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut games = Vec::new();
    for result in reader.deserialize::<RawScheduledGame>() {
        match result {
            Ok(raw) => {
                let week = match parse_week(&raw.week) {
                    Ok(week) => week,
                    Err(e) => {
                        warn!("skipping scheduled game '{}': {}", raw.game_id.trim(), e);
                        continue;
                    }
                };
                games.push(ScheduledGame {
                    game_id: raw.game_id.trim().to_string(),
                    home_team: normalize_team_code(&raw.home_team),
                    away_team: normalize_team_code(&raw.away_team),
                    season: raw.season,
                    week,
                });
            }
            Err(e) => {
                warn!("skipping malformed schedule row: {}", e);
            }
        }
    }
    Ok(games)
}

fn load_records_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerGameRecord>, serde_json::Error> {
    let mut records: Vec<PlayerGameRecord> = serde_json::from_reader(rdr)?;
    for record in &mut records {
        record.opponent_team_id = normalize_team_code(&record.opponent_team_id);
        if let Some(team) = record.team.as_mut() {
            *team = normalize_team_code(team);
        }
    }
    Ok(records)
}

/// Team-defense ids arrive in either Washington spelling; anything that is
/// still not a team code afterwards is rejected.
fn normalize_defense_ids(records: &mut [PlayerGameRecord]) -> Result<(), InputError> {
    for record in records.iter_mut() {
        record.player_id = normalize_team_code(&record.player_id);
        if !is_team_code(&record.player_id) {
            return Err(InputError::Validation(format!(
                "defense record for game {} has non-team player id '{}'",
                record.game_id, record.player_id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, InputError> {
    std::fs::File::open(path).map_err(|e| InputError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load player profiles from a CSV file.
pub fn load_profiles(path: &Path) -> Result<Vec<PlayerProfile>, InputError> {
    load_profiles_from_reader(open(path)?).map_err(|e| InputError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load individual player-game records from a JSON array.
pub fn load_player_games(path: &Path) -> Result<Vec<PlayerGameRecord>, InputError> {
    load_records_from_reader(open(path)?).map_err(|e| InputError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load team-defense records from a JSON array. Every player id must be a
/// team code.
pub fn load_defense_games(path: &Path) -> Result<Vec<PlayerGameRecord>, InputError> {
    let mut records = load_player_games(path)?;
    normalize_defense_ids(&mut records)?;
    Ok(records)
}

/// Load the league schedule from a CSV file.
pub fn load_schedule(path: &Path) -> Result<Vec<ScheduledGame>, InputError> {
    let games = load_schedule_from_reader(open(path)?).map_err(|e| InputError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if games.is_empty() {
        return Err(InputError::Validation(format!(
            "schedule {} produced zero valid rows",
            path.display()
        )));
    }
    Ok(games)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
