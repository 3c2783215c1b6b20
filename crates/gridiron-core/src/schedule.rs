// Schedule annotation: fills season, week, team and home/away on records that
// arrive with only a game id and an opponent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ScheduleError;
use crate::model::PlayerGameRecord;
use crate::team::normalize_team_code;

/// One game on the league schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledGame {
    #[serde(alias = "gameID")]
    pub game_id: String,
    #[serde(alias = "home")]
    pub home_team: String,
    #[serde(alias = "away")]
    pub away_team: String,
    pub season: i32,
    pub week: u32,
}

impl ScheduledGame {
    /// The participant that is not `opponent`, normalized.
    fn team_facing(&self, opponent: &str) -> String {
        if opponent == normalize_team_code(&self.home_team) {
            normalize_team_code(&self.away_team)
        } else {
            normalize_team_code(&self.home_team)
        }
    }
}

/// Annotate every record from the schedule.
///
/// Fails on the first record whose game is not on the schedule; records before
/// it may already have been updated.
pub fn annotate_with_schedule(
    records: &mut [PlayerGameRecord],
    games: &[ScheduledGame],
) -> Result<(), ScheduleError> {
    let by_id: HashMap<&str, &ScheduledGame> =
        games.iter().map(|g| (g.game_id.as_str(), g)).collect();

    for record in records.iter_mut() {
        let game = by_id
            .get(record.game_id.as_str())
            .ok_or_else(|| ScheduleError::GameNotFound {
                game_id: record.game_id.clone(),
                player_id: record.player_id.clone(),
            })?;

        let opponent = normalize_team_code(&record.opponent_team_id);
        record.season = game.season;
        record.week = game.week;
        record.is_home = opponent != normalize_team_code(&game.home_team);
        record.team = Some(game.team_facing(&opponent));
        record.opponent_team_id = opponent;
    }

    debug!(records = records.len(), games = games.len(), "schedule annotation applied");
    Ok(())
}
