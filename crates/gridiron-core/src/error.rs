// Error types for ranking, feature assembly and schedule annotation.

use thiserror::Error;

/// Fatal for a whole ranking run; no partial output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    #[error("invalid week `{week}`: {reason}")]
    InvalidWeek { week: String, reason: String },
}

impl RankError {
    pub(crate) fn invalid_week(week: impl ToString, reason: impl Into<String>) -> Self {
        RankError::InvalidWeek {
            week: week.to_string(),
            reason: reason.into(),
        }
    }
}

/// Fatal for a whole feature-assembly call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("player {player_id} has no eligible positions")]
    UnresolvedPosition { player_id: String },

    #[error("player {player_id} resolved to unsupported position `{position}`")]
    InvalidPosition { player_id: String, position: String },
}

/// Why a single player-game produced no feature row. These never cross the
/// assembler boundary as errors; they are counted in the report instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowSkip {
    #[error("no defense record for opponent {opponent} in game {game_id}")]
    OpponentGameNotFound { game_id: String, opponent: String },

    #[error("no ranked stat group for {position} in game {game_id}")]
    UncomputableCategoryRank { game_id: String, position: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("game {game_id} for player {player_id} is not on the schedule")]
    GameNotFound { game_id: String, player_id: String },
}
