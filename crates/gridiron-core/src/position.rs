// Fantasy positions and primary-position resolution for multi-eligible players.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::model::{GameStats, PlayerProfile};

/// Positions the feature table knows how to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    RunningBack,
    Fullback,
    WideReceiver,
    TightEnd,
    Kicker,
    Defense,
}

impl Position {
    /// Parse a provider abbreviation (`"QB"`, `"RB"`, `"DEF"`, ...).
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "FB" => Some(Position::Fullback),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" => Some(Position::Kicker),
            "DEF" | "DST" | "D/ST" => Some(Position::Defense),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::Fullback => "FB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DEF",
        }
    }

    /// Numeric encoding written to the feature table.
    pub fn feature_index(&self) -> u8 {
        match self {
            Position::Quarterback => 0,
            Position::RunningBack => 1,
            Position::Fullback => 2,
            Position::WideReceiver => 3,
            Position::TightEnd => 4,
            Position::Kicker => 5,
            Position::Defense => 6,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

fn eligible(profile: &PlayerProfile, abbreviation: &str) -> bool {
    profile
        .positions
        .iter()
        .any(|p| p.trim().eq_ignore_ascii_case(abbreviation))
}

/// Pick the position a player effectively played in one game.
///
/// A single eligible position is used as-is. With several, the default is the
/// listed primary, then each of passing, rushing and receiving yardage may
/// claim the game in that order when it is at least as large as the other
/// two. Later checks overwrite earlier ones, so a tie goes to the later
/// category (receiving over rushing over passing).
pub fn resolve_primary_position(
    profile: &PlayerProfile,
    stats: &GameStats,
) -> Result<Position, FeatureError> {
    let Some(first) = profile.positions.first() else {
        return Err(FeatureError::UnresolvedPosition {
            player_id: profile.id.clone(),
        });
    };

    let mut chosen: &str = first.as_str();

    if profile.positions.len() > 1 {
        let pass = stats.pass_yds();
        let rush = stats.rush_yds();
        let rec = stats.rec_yds();

        if pass >= rush && pass >= rec && eligible(profile, "QB") {
            chosen = "QB";
        }
        if rush >= pass && rush >= rec && eligible(profile, "RB") {
            chosen = "RB";
        }
        if rec >= rush && rec >= pass {
            if eligible(profile, "WR") {
                chosen = "WR";
            } else if eligible(profile, "TE") {
                chosen = "TE";
            }
        }
    }

    Position::from_str_pos(chosen).ok_or_else(|| FeatureError::InvalidPosition {
        player_id: profile.id.clone(),
        position: chosen.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PassingStats, ReceivingStats, RushingStats};

    fn yards(pass: i64, rush: i64, rec: i64) -> GameStats {
        GameStats {
            passing: Some(PassingStats {
                pass_yds: pass,
                ..Default::default()
            }),
            rushing: Some(RushingStats {
                rush_yds: rush,
                ..Default::default()
            }),
            receiving: Some(ReceivingStats {
                rec_yds: rec,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn single_position_used_directly() {
        let profile = PlayerProfile::new("1", &["TE"]);
        let pos = resolve_primary_position(&profile, &yards(300, 0, 0)).unwrap();
        assert_eq!(pos, Position::TightEnd);
    }

    #[test]
    fn rb_wr_with_more_receiving_resolves_to_wr() {
        let profile = PlayerProfile::new("1", &["RB", "WR"]);
        let pos = resolve_primary_position(&profile, &yards(0, 40, 60)).unwrap();
        assert_eq!(pos, Position::WideReceiver);
    }

    #[test]
    fn rb_wr_with_more_rushing_resolves_to_rb() {
        let profile = PlayerProfile::new("1", &["WR", "RB"]);
        let pos = resolve_primary_position(&profile, &yards(0, 90, 12)).unwrap();
        assert_eq!(pos, Position::RunningBack);
    }

    #[test]
    fn tie_between_rushing_and_receiving_goes_to_receiving() {
        let profile = PlayerProfile::new("1", &["RB", "TE"]);
        let pos = resolve_primary_position(&profile, &yards(0, 50, 50)).unwrap();
        assert_eq!(pos, Position::TightEnd);
    }

    #[test]
    fn qb_eligible_passer_resolves_to_qb() {
        let profile = PlayerProfile::new("1", &["TE", "QB"]);
        let pos = resolve_primary_position(&profile, &yards(210, 15, 0)).unwrap();
        assert_eq!(pos, Position::Quarterback);
    }

    #[test]
    fn no_yardage_lines_fall_back_to_last_matching_check() {
        // All zeros: every check passes; WR beats RB beats the listed primary.
        let profile = PlayerProfile::new("1", &["RB", "WR"]);
        let pos = resolve_primary_position(&profile, &GameStats::default()).unwrap();
        assert_eq!(pos, Position::WideReceiver);
    }

    #[test]
    fn empty_positions_is_unresolved() {
        let profile = PlayerProfile::new("ghost", &[]);
        let err = resolve_primary_position(&profile, &GameStats::default()).unwrap_err();
        assert_eq!(
            err,
            FeatureError::UnresolvedPosition {
                player_id: "ghost".into()
            }
        );
    }

    #[test]
    fn unsupported_position_is_invalid() {
        let profile = PlayerProfile::new("p", &["LB"]);
        let err = resolve_primary_position(&profile, &GameStats::default()).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidPosition { ref position, .. } if position == "LB"));
    }

    #[test]
    fn parses_defense_aliases() {
        assert_eq!(Position::from_str_pos("DEF"), Some(Position::Defense));
        assert_eq!(Position::from_str_pos("dst"), Some(Position::Defense));
        assert_eq!(Position::from_str_pos("K"), Some(Position::Kicker));
        assert_eq!(Position::from_str_pos("P"), None);
    }
}
