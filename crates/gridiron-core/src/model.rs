// Player-game records, per-group stat lines, and the rank annotations derived
// from them.

use serde::{Deserialize, Deserializer, Serialize};

use crate::category::{Category, CategoryGroup, RecordKind};
use crate::team;
use crate::week;

/// A 1-based league rank, or [`NO_HISTORY_RANK`].
pub type Rank = i32;

/// Rank given in week 1 to a player with no accumulated history.
pub const NO_HISTORY_RANK: Rank = -1;

/// Stand-in for an absent external (Tank) player identifier.
pub const NO_TANK_ID: &str = "-1";

// ---------------------------------------------------------------------------
// Stat groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassingStats {
    pub pass_attempts: i64,
    pub pass_yds: i64,
    #[serde(rename = "passTD")]
    pub pass_td: i64,
    #[serde(alias = "int")]
    pub interceptions: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RushingStats {
    pub carries: i64,
    pub rush_yds: i64,
    #[serde(rename = "rushTD")]
    pub rush_td: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceivingStats {
    pub targets: i64,
    pub receptions: i64,
    pub rec_yds: i64,
    #[serde(rename = "recTD")]
    pub rec_td: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KickingStats {
    pub fg_attempts: i64,
    pub fg_made: i64,
    pub xp_attempts: i64,
    pub xp_made: i64,
}

/// A team defense's line for one game. Only present on team-defense records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefenseStats {
    pub yds_allowed: i64,
    pub pts_allowed: i64,
    pub fumbles_recovered: i64,
    pub defensive_interceptions: i64,
    pub pass_yds_allowed: i64,
    #[serde(rename = "passTDsAllowed")]
    pub pass_tds_allowed: i64,
    pub rush_yds_allowed: i64,
    #[serde(rename = "rushTDsAllowed")]
    pub rush_tds_allowed: i64,
    pub fg_allowed: i64,
    pub xp_allowed: i64,
    pub sacks: i64,
    #[serde(rename = "defTD")]
    pub def_td: i64,
    pub safeties: i64,
    pub forced_fumbles: i64,
}

impl DefenseStats {
    /// Fumble recoveries plus interceptions.
    pub fn takeaways(&self) -> i64 {
        self.fumbles_recovered + self.defensive_interceptions
    }
}

/// Sparse set of stat groups; a group is present only when it applies to the
/// player's role in that game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    #[serde(rename = "Passing", default, skip_serializing_if = "Option::is_none")]
    pub passing: Option<PassingStats>,
    #[serde(rename = "Rushing", default, skip_serializing_if = "Option::is_none")]
    pub rushing: Option<RushingStats>,
    #[serde(rename = "Receiving", default, skip_serializing_if = "Option::is_none")]
    pub receiving: Option<ReceivingStats>,
    #[serde(rename = "Kicking", default, skip_serializing_if = "Option::is_none")]
    pub kicking: Option<KickingStats>,
    #[serde(rename = "Defense", default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<DefenseStats>,
}

impl GameStats {
    pub fn has_offense(&self) -> bool {
        self.passing.is_some()
            || self.rushing.is_some()
            || self.receiving.is_some()
            || self.kicking.is_some()
    }

    pub fn pass_yds(&self) -> i64 {
        self.passing.map_or(0, |p| p.pass_yds)
    }

    pub fn rush_yds(&self) -> i64 {
        self.rushing.map_or(0, |r| r.rush_yds)
    }

    pub fn rec_yds(&self) -> i64 {
        self.receiving.map_or(0, |r| r.rec_yds)
    }
}

// ---------------------------------------------------------------------------
// Rank groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassingRank {
    pub pass_attempts: Rank,
    pub pass_yds: Rank,
    #[serde(rename = "passTD")]
    pub pass_td: Rank,
    pub interceptions: Rank,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RushingRank {
    pub rush_yds: Rank,
    pub carries: Rank,
    #[serde(rename = "rushTD")]
    pub rush_td: Rank,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivingRank {
    pub rec_yds: Rank,
    #[serde(rename = "recTD")]
    pub rec_td: Rank,
    pub receptions: Rank,
    pub targets: Rank,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickingRank {
    pub fg_made: Rank,
    pub xp_made: Rank,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseRank {
    pub yds_allowed: Rank,
    pub pts_allowed: Rank,
    pub takeaways: Rank,
    pub pass_yds_allowed: Rank,
    #[serde(rename = "passTDsAllowed")]
    pub pass_tds_allowed: Rank,
    pub rush_yds_allowed: Rank,
    #[serde(rename = "rushTDsAllowed")]
    pub rush_tds_allowed: Rank,
    pub fg_allowed: Rank,
    pub xp_allowed: Rank,
}

/// Per-category ranks for one record, in the same group shape as [`GameStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatRank {
    #[serde(rename = "Passing", default, skip_serializing_if = "Option::is_none")]
    pub passing: Option<PassingRank>,
    #[serde(rename = "Rushing", default, skip_serializing_if = "Option::is_none")]
    pub rushing: Option<RushingRank>,
    #[serde(rename = "Receiving", default, skip_serializing_if = "Option::is_none")]
    pub receiving: Option<ReceivingRank>,
    #[serde(rename = "Kicking", default, skip_serializing_if = "Option::is_none")]
    pub kicking: Option<KickingRank>,
    #[serde(rename = "Defense", default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<DefenseRank>,
}

impl StatRank {
    pub fn is_empty(&self) -> bool {
        self.passing.is_none()
            && self.rushing.is_none()
            && self.receiving.is_none()
            && self.kicking.is_none()
            && self.defense.is_none()
    }

    /// Write a category's rank, creating its group if needed.
    pub fn set(&mut self, category: Category, rank: Rank) {
        match category {
            Category::PassAttempts => self.passing.get_or_insert_with(Default::default).pass_attempts = rank,
            Category::PassYds => self.passing.get_or_insert_with(Default::default).pass_yds = rank,
            Category::PassTd => self.passing.get_or_insert_with(Default::default).pass_td = rank,
            Category::Interceptions => self.passing.get_or_insert_with(Default::default).interceptions = rank,
            Category::RushYds => self.rushing.get_or_insert_with(Default::default).rush_yds = rank,
            Category::Carries => self.rushing.get_or_insert_with(Default::default).carries = rank,
            Category::RushTd => self.rushing.get_or_insert_with(Default::default).rush_td = rank,
            Category::RecYds => self.receiving.get_or_insert_with(Default::default).rec_yds = rank,
            Category::RecTd => self.receiving.get_or_insert_with(Default::default).rec_td = rank,
            Category::Receptions => self.receiving.get_or_insert_with(Default::default).receptions = rank,
            Category::Targets => self.receiving.get_or_insert_with(Default::default).targets = rank,
            Category::FgMade => self.kicking.get_or_insert_with(Default::default).fg_made = rank,
            Category::XpMade => self.kicking.get_or_insert_with(Default::default).xp_made = rank,
            Category::YdsAllowed => self.defense.get_or_insert_with(Default::default).yds_allowed = rank,
            Category::PtsAllowed => self.defense.get_or_insert_with(Default::default).pts_allowed = rank,
            Category::Takeaways => self.defense.get_or_insert_with(Default::default).takeaways = rank,
            Category::PassYdsAllowed => {
                self.defense.get_or_insert_with(Default::default).pass_yds_allowed = rank
            }
            Category::PassTdsAllowed => {
                self.defense.get_or_insert_with(Default::default).pass_tds_allowed = rank
            }
            Category::RushYdsAllowed => {
                self.defense.get_or_insert_with(Default::default).rush_yds_allowed = rank
            }
            Category::RushTdsAllowed => {
                self.defense.get_or_insert_with(Default::default).rush_tds_allowed = rank
            }
            Category::FgAllowed => self.defense.get_or_insert_with(Default::default).fg_allowed = rank,
            Category::XpAllowed => self.defense.get_or_insert_with(Default::default).xp_allowed = rank,
        }
    }

    /// Read a category's rank. `None` when its group was never ranked.
    pub fn get(&self, category: Category) -> Option<Rank> {
        match category {
            Category::PassAttempts => self.passing.map(|g| g.pass_attempts),
            Category::PassYds => self.passing.map(|g| g.pass_yds),
            Category::PassTd => self.passing.map(|g| g.pass_td),
            Category::Interceptions => self.passing.map(|g| g.interceptions),
            Category::RushYds => self.rushing.map(|g| g.rush_yds),
            Category::Carries => self.rushing.map(|g| g.carries),
            Category::RushTd => self.rushing.map(|g| g.rush_td),
            Category::RecYds => self.receiving.map(|g| g.rec_yds),
            Category::RecTd => self.receiving.map(|g| g.rec_td),
            Category::Receptions => self.receiving.map(|g| g.receptions),
            Category::Targets => self.receiving.map(|g| g.targets),
            Category::FgMade => self.kicking.map(|g| g.fg_made),
            Category::XpMade => self.kicking.map(|g| g.xp_made),
            Category::YdsAllowed => self.defense.map(|g| g.yds_allowed),
            Category::PtsAllowed => self.defense.map(|g| g.pts_allowed),
            Category::Takeaways => self.defense.map(|g| g.takeaways),
            Category::PassYdsAllowed => self.defense.map(|g| g.pass_yds_allowed),
            Category::PassTdsAllowed => self.defense.map(|g| g.pass_tds_allowed),
            Category::RushYdsAllowed => self.defense.map(|g| g.rush_yds_allowed),
            Category::RushTdsAllowed => self.defense.map(|g| g.rush_tds_allowed),
            Category::FgAllowed => self.defense.map(|g| g.fg_allowed),
            Category::XpAllowed => self.defense.map(|g| g.xp_allowed),
        }
    }

    /// Unweighted mean of the listed categories' ranks.
    ///
    /// Returns `None` when none of them has been ranked.
    pub fn mean_of(&self, categories: &[Category]) -> Option<f64> {
        let ranks: Vec<Rank> = categories.iter().filter_map(|&c| self.get(c)).collect();
        if ranks.is_empty() {
            return None;
        }
        let total: i64 = ranks.iter().map(|&r| r as i64).sum();
        Some(total as f64 / ranks.len() as f64)
    }

    /// Mean over every category in a group; `None` if the group is absent.
    pub fn group_mean(&self, group: CategoryGroup) -> Option<f64> {
        self.mean_of(group.categories())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One player's statistical line for one game.
///
/// Team defenses are represented as synthetic players whose `player_id` is the
/// team code (e.g. `"KC"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGameRecord {
    #[serde(alias = "playerID")]
    pub player_id: String,
    #[serde(alias = "gameID")]
    pub game_id: String,
    #[serde(alias = "opponent")]
    pub opponent_team_id: String,
    /// The player's own team; filled from the schedule when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, deserialize_with = "deserialize_week")]
    pub week: u32,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub season: i32,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub points: f64,
    #[serde(default)]
    pub stats: GameStats,
    #[serde(default, alias = "statRankings", skip_serializing_if = "Option::is_none")]
    pub stat_rank: Option<StatRank>,
}

impl PlayerGameRecord {
    /// Identifier of this player-game pair.
    pub fn player_game_id(&self) -> String {
        format!("{}_{}", self.player_id, self.game_id)
    }

    /// Whether this is a team-defense line, keyed by team code.
    pub fn is_defense(&self) -> bool {
        team::is_team_code(&self.player_id)
    }

    pub fn kind(&self) -> RecordKind {
        if self.is_defense() {
            RecordKind::Defense
        } else if self.stats.kicking.is_some() {
            RecordKind::Kicker
        } else {
            RecordKind::Offense
        }
    }

    /// Sort key: season followed by the zero-padded week. Saturates for
    /// seasons too large to encode.
    pub fn season_week_key(&self) -> u32 {
        u32::try_from(self.season.max(0))
            .unwrap_or(0)
            .saturating_mul(100)
            .saturating_add(self.week)
    }
}

/// Identity and role metadata for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub id: String,
    /// Eligible fantasy positions, primary first.
    #[serde(default)]
    pub positions: Vec<String>,
    #[serde(default = "no_tank_id", alias = "tankID")]
    pub tank_external_id: String,
}

impl PlayerProfile {
    pub fn new(id: impl Into<String>, positions: &[&str]) -> Self {
        Self {
            id: id.into(),
            positions: positions.iter().map(|p| p.to_string()).collect(),
            tank_external_id: no_tank_id(),
        }
    }
}

fn no_tank_id() -> String {
    NO_TANK_ID.to_string()
}

/// One flattened training example for the points regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub player_game_id: String,
    pub player_id: String,
    pub season_week_key: u32,
    pub position_index: u8,
    pub is_home: u8,
    pub avg_points_this_season: f64,
    pub avg_points_last_5_games: f64,
    pub avg_category_rank_for_position: f64,
    pub opponent_avg_points_allowed_this_season: f64,
    pub opponent_avg_defensive_rank_against_position: f64,
    pub actual_points: f64,
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

/// Providers ship numbers both as JSON numbers and as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

fn deserialize_week<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Int(n) => week::validate_week(n).map_err(serde::de::Error::custom),
        NumberOrText::Float(f) if f.fract() == 0.0 => {
            week::validate_week(f as i64).map_err(serde::de::Error::custom)
        }
        NumberOrText::Float(f) => Err(serde::de::Error::custom(format!("invalid week: {f}"))),
        NumberOrText::Text(s) => week::parse_week(&s).map_err(serde::de::Error::custom),
    }
}

fn deserialize_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromNumber,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Int(n) => T::from_i64(n).map_err(serde::de::Error::custom),
        NumberOrText::Float(f) => T::from_f64(f).map_err(serde::de::Error::custom),
        NumberOrText::Text(s) if s.trim().is_empty() => {
            T::from_i64(0).map_err(serde::de::Error::custom)
        }
        NumberOrText::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("not a number: {s:?}")))
            .and_then(|f| T::from_f64(f).map_err(serde::de::Error::custom)),
    }
}

trait FromNumber: Sized {
    fn from_i64(n: i64) -> Result<Self, String>;
    fn from_f64(f: f64) -> Result<Self, String>;
}

impl FromNumber for f64 {
    fn from_i64(n: i64) -> Result<Self, String> {
        Ok(n as f64)
    }
    fn from_f64(f: f64) -> Result<Self, String> {
        Ok(f)
    }
}

impl FromNumber for i32 {
    fn from_i64(n: i64) -> Result<Self, String> {
        i32::try_from(n).map_err(|_| format!("integer out of range: {n}"))
    }
    fn from_f64(f: f64) -> Result<Self, String> {
        if f.fract() != 0.0 || f < f64::from(i32::MIN) || f > f64::from(i32::MAX) {
            return Err(format!("not an integer in range: {f}"));
        }
        Ok(f as i32)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
