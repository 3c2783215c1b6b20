// Feature assembly: turns ranked player-games into flat regression rows.
//
// Per player, games are sorted chronologically and every rolling value is
// computed from strictly earlier games only. The opponent side comes from the
// opposing team-defense record for the same game, looked up through an index
// built once per call.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::category::{Category, CategoryGroup};
use crate::error::{FeatureError, RowSkip};
use crate::model::{DefenseRank, FeatureRow, PlayerGameRecord, PlayerProfile, StatRank};
use crate::position::{resolve_primary_position, Position};

/// Games averaged by `avg_points_last_5_games`.
pub const RECENT_GAMES_WINDOW: usize = 5;

/// Running back composite: rushing vs. receiving rank weight.
const RB_RUSHING_WEIGHT: f64 = 0.6;
const RB_RECEIVING_WEIGHT: f64 = 0.4;

/// Opponent composite for running backs: pass defense vs. run defense.
const RB_VS_PASS_DEFENSE_WEIGHT: f64 = 0.4;
const RB_VS_RUN_DEFENSE_WEIGHT: f64 = 0.6;

const PASS_DEFENSE: [Category; 2] = [Category::PassTdsAllowed, Category::PassYdsAllowed];
const RUN_DEFENSE: [Category; 2] = [Category::RushTdsAllowed, Category::RushYdsAllowed];
const KICK_DEFENSE: [Category; 2] = [Category::FgAllowed, Category::XpAllowed];

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Rows produced by one assembly call plus the player-games that were left out.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub skipped: Vec<RowSkip>,
    /// Records whose player has no profile; they are not considered at all.
    pub unprofiled: usize,
}

impl FeatureTable {
    pub fn missing_opponent_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| matches!(s, RowSkip::OpponentGameNotFound { .. }))
            .count()
    }

    pub fn uncomputable_rank_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| matches!(s, RowSkip::UncomputableCategoryRank { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Rolling averages
// ---------------------------------------------------------------------------

/// Mean points over games before `index` in the same season as `games[index]`.
///
/// With no earlier game that season the divisor is 1, so the result is 0.
pub fn season_average_before(games: &[&PlayerGameRecord], index: usize) -> f64 {
    let season = games[index].season;
    let (total, count) = games[..index]
        .iter()
        .filter(|g| g.season == season)
        .fold((0.0, 0usize), |(total, count), g| (total + g.points, count + 1));
    total / count.max(1) as f64
}

/// Mean points over up to `window` games immediately before `index`, across
/// season boundaries. 0 for a player's first game.
pub fn recent_average_before(games: &[&PlayerGameRecord], index: usize, window: usize) -> f64 {
    let start = index.saturating_sub(window);
    let recent = &games[start..index];
    if recent.is_empty() {
        return 0.0;
    }
    recent.iter().map(|g| g.points).sum::<f64>() / recent.len() as f64
}

// ---------------------------------------------------------------------------
// Rank composites
// ---------------------------------------------------------------------------

/// Position-weighted mean of a record's own category ranks.
///
/// `None` when the groups the position depends on were never ranked. For
/// running backs an absent group contributes 0 to its weighted term.
pub fn category_rank_for_position(position: Position, rank: &StatRank) -> Option<f64> {
    match position {
        Position::Quarterback => rank.group_mean(CategoryGroup::Passing),
        Position::RunningBack | Position::Fullback => {
            let rushing = rank.group_mean(CategoryGroup::Rushing);
            let receiving = rank.group_mean(CategoryGroup::Receiving);
            if rushing.is_none() && receiving.is_none() {
                return None;
            }
            Some(
                RB_RUSHING_WEIGHT * rushing.unwrap_or(0.0)
                    + RB_RECEIVING_WEIGHT * receiving.unwrap_or(0.0),
            )
        }
        Position::WideReceiver | Position::TightEnd => rank.group_mean(CategoryGroup::Receiving),
        Position::Kicker => rank.group_mean(CategoryGroup::Kicking),
        Position::Defense => rank.group_mean(CategoryGroup::Defense),
    }
}

/// How the opposing defense ranks against what this position produces.
/// A defense facing a defense has no meaningful value and yields 0.
pub fn defensive_rank_against_position(position: Position, defense: &DefenseRank) -> f64 {
    let ranks = StatRank {
        defense: Some(*defense),
        ..Default::default()
    };
    let mean = |categories: &[Category]| ranks.mean_of(categories).unwrap_or(0.0);

    match position {
        Position::Quarterback | Position::WideReceiver | Position::TightEnd => mean(&PASS_DEFENSE),
        Position::RunningBack | Position::Fullback => {
            RB_VS_PASS_DEFENSE_WEIGHT * mean(&PASS_DEFENSE)
                + RB_VS_RUN_DEFENSE_WEIGHT * mean(&RUN_DEFENSE)
        }
        Position::Kicker => mean(&KICK_DEFENSE),
        Position::Defense => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Opponent index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct OpponentGame<'a> {
    record: &'a PlayerGameRecord,
    avg_points_this_season: f64,
}

/// Map (game id, team code) to that team's defense record for the game and
/// its season-to-date average entering it. Fully built before any lookup.
fn build_opponent_index(defensive: &[PlayerGameRecord]) -> HashMap<(&str, &str), OpponentGame<'_>> {
    let mut by_team: HashMap<&str, Vec<&PlayerGameRecord>> = HashMap::new();
    for record in defensive {
        by_team.entry(record.player_id.as_str()).or_default().push(record);
    }

    let mut index = HashMap::with_capacity(defensive.len());
    for games in by_team.values_mut() {
        games.sort_by_key(|g| (g.season, g.week));
        let games: &[&PlayerGameRecord] = games;
        for (i, game) in games.iter().enumerate() {
            index.insert(
                (game.game_id.as_str(), game.player_id.as_str()),
                OpponentGame {
                    record: game,
                    avg_points_this_season: season_average_before(games, i),
                },
            );
        }
    }
    index
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Build one feature row per rankable player-game.
///
/// Fails outright when a player's position cannot be resolved or is not one
/// the feature table supports. Rows without a computable category rank or
/// without an opposing defense record are skipped and reported.
pub fn assemble_features(
    profiles: &[PlayerProfile],
    offensive: &[PlayerGameRecord],
    defensive: &[PlayerGameRecord],
) -> Result<FeatureTable, FeatureError> {
    let profiles_by_id: HashMap<&str, &PlayerProfile> =
        profiles.iter().map(|p| (p.id.as_str(), p)).collect();
    let opponents = build_opponent_index(defensive);

    let mut table = FeatureTable::default();
    let mut by_player: BTreeMap<&str, Vec<&PlayerGameRecord>> = BTreeMap::new();
    for record in offensive {
        if profiles_by_id.contains_key(record.player_id.as_str()) {
            by_player.entry(record.player_id.as_str()).or_default().push(record);
        } else {
            debug!(player_id = %record.player_id, "no profile for player, skipping game");
            table.unprofiled += 1;
        }
    }

    for (player_id, games) in by_player.iter_mut() {
        games.sort_by_key(|g| (g.season, g.week));
        let games: &[&PlayerGameRecord] = games;
        let profile = profiles_by_id[player_id];

        for (index, game) in games.iter().enumerate() {
            let position = resolve_primary_position(profile, &game.stats)?;

            let category_rank = game
                .stat_rank
                .as_ref()
                .and_then(|rank| category_rank_for_position(position, rank));
            let Some(category_rank) = category_rank else {
                let skip = RowSkip::UncomputableCategoryRank {
                    game_id: game.game_id.clone(),
                    position: position.to_string(),
                };
                debug!(player_id, %skip, "dropping row");
                table.skipped.push(skip);
                continue;
            };

            let opponent = opponents
                .get(&(game.game_id.as_str(), game.opponent_team_id.as_str()))
                .and_then(|opp| {
                    let defense = opp.record.stat_rank.as_ref()?.defense?;
                    Some((opp, defense))
                });
            let Some((opponent, opponent_defense)) = opponent else {
                let skip = RowSkip::OpponentGameNotFound {
                    game_id: game.game_id.clone(),
                    opponent: game.opponent_team_id.clone(),
                };
                debug!(player_id, %skip, "dropping row");
                table.skipped.push(skip);
                continue;
            };

            table.rows.push(FeatureRow {
                player_game_id: game.player_game_id(),
                player_id: game.player_id.clone(),
                season_week_key: game.season_week_key(),
                position_index: position.feature_index(),
                is_home: u8::from(game.is_home),
                avg_points_this_season: season_average_before(games, index),
                avg_points_last_5_games: recent_average_before(games, index, RECENT_GAMES_WINDOW),
                avg_category_rank_for_position: category_rank,
                opponent_avg_points_allowed_this_season: opponent.avg_points_this_season,
                opponent_avg_defensive_rank_against_position: defensive_rank_against_position(
                    position,
                    &opponent_defense,
                ),
                actual_points: game.points,
            });
        }
    }

    info!(
        rows = table.rows.len(),
        missing_opponent = table.missing_opponent_count(),
        uncomputable_rank = table.uncomputable_rank_count(),
        unprofiled = table.unprofiled,
        "feature assembly complete"
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        GameStats, KickingRank, PassingRank, ReceivingRank, ReceivingStats, RushingRank,
        RushingStats,
    };

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn offense(player: &str, season: i32, week: u32, points: f64, opponent: &str) -> PlayerGameRecord {
        let mut rank = StatRank::default();
        rank.rushing = Some(RushingRank {
            rush_yds: 2,
            carries: 4,
            rush_td: 6,
        });
        rank.receiving = Some(ReceivingRank {
            rec_yds: 10,
            rec_td: 10,
            receptions: 10,
            targets: 10,
        });
        rank.passing = Some(PassingRank {
            pass_attempts: 1,
            pass_yds: 1,
            pass_td: 1,
            interceptions: 1,
        });
        PlayerGameRecord {
            player_id: player.into(),
            game_id: game_id(season, week, opponent),
            opponent_team_id: opponent.into(),
            team: None,
            week,
            season,
            is_home: week % 2 == 0,
            points,
            stats: GameStats {
                rushing: Some(RushingStats {
                    carries: 15,
                    rush_yds: 70,
                    rush_td: 0,
                }),
                receiving: Some(ReceivingStats {
                    targets: 3,
                    receptions: 2,
                    rec_yds: 15,
                    rec_td: 0,
                }),
                ..Default::default()
            },
            stat_rank: Some(rank),
        }
    }

    fn defense(team: &str, season: i32, week: u32, points: f64) -> PlayerGameRecord {
        let mut rank = StatRank::default();
        rank.defense = Some(DefenseRank {
            yds_allowed: 1,
            pts_allowed: 2,
            takeaways: 3,
            pass_yds_allowed: 4,
            pass_tds_allowed: 6,
            rush_yds_allowed: 10,
            rush_tds_allowed: 20,
            fg_allowed: 7,
            xp_allowed: 9,
        });
        PlayerGameRecord {
            player_id: team.into(),
            game_id: game_id(season, week, team),
            opponent_team_id: "ZZZ".into(),
            team: Some(team.into()),
            week,
            season,
            is_home: false,
            points,
            stats: GameStats::default(),
            stat_rank: Some(rank),
        }
    }

    fn game_id(season: i32, week: u32, defense_team: &str) -> String {
        format!("{season}_{week:02}_{defense_team}")
    }

    fn refs(records: &[PlayerGameRecord]) -> Vec<&PlayerGameRecord> {
        records.iter().collect()
    }

    #[test]
    fn season_average_uses_only_earlier_same_season_games() {
        let games = vec![
            offense("p", 2022, 17, 30.0, "KC"),
            offense("p", 2023, 1, 10.0, "KC"),
            offense("p", 2023, 2, 20.0, "KC"),
            offense("p", 2023, 3, 99.0, "KC"),
        ];
        let games = refs(&games);
        assert!(approx_eq(season_average_before(&games, 0), 0.0));
        assert!(approx_eq(season_average_before(&games, 1), 0.0));
        assert!(approx_eq(season_average_before(&games, 2), 10.0));
        assert!(approx_eq(season_average_before(&games, 3), 15.0));
    }

    #[test]
    fn recent_average_is_zero_for_first_game_and_excludes_current() {
        let games: Vec<PlayerGameRecord> = (1..=6)
            .map(|w| offense("p", 2023, w, w as f64 * 2.0, "KC"))
            .collect();
        let games = refs(&games);
        assert!(approx_eq(recent_average_before(&games, 0, 5), 0.0));
        // 6th game averages games 1-5: (2+4+6+8+10)/5
        assert!(approx_eq(recent_average_before(&games, 5, 5), 6.0));
        assert!(approx_eq(recent_average_before(&games, 2, 5), 3.0));
    }

    #[test]
    fn recent_average_crosses_seasons() {
        let games = vec![
            offense("p", 2022, 18, 20.0, "KC"),
            offense("p", 2023, 1, 5.0, "KC"),
        ];
        let games = refs(&games);
        assert!(approx_eq(recent_average_before(&games, 1, 5), 20.0));
    }

    #[test]
    fn category_composites_by_position() {
        let rank = offense("p", 2023, 1, 0.0, "KC").stat_rank.unwrap();
        assert_eq!(category_rank_for_position(Position::Quarterback, &rank), Some(1.0));
        // 0.6 * mean(2,4,6) + 0.4 * mean(10,10,10,10)
        assert!(approx_eq(
            category_rank_for_position(Position::RunningBack, &rank).unwrap(),
            6.4
        ));
        assert_eq!(category_rank_for_position(Position::TightEnd, &rank), Some(10.0));
        assert_eq!(category_rank_for_position(Position::Kicker, &rank), None);
        assert_eq!(category_rank_for_position(Position::Defense, &rank), None);
    }

    #[test]
    fn running_back_missing_group_contributes_zero() {
        let mut rank = StatRank::default();
        rank.rushing = Some(RushingRank {
            rush_yds: 3,
            carries: 3,
            rush_td: 3,
        });
        assert!(approx_eq(
            category_rank_for_position(Position::Fullback, &rank).unwrap(),
            1.8
        ));
        assert_eq!(
            category_rank_for_position(Position::RunningBack, &StatRank::default()),
            None
        );
    }

    #[test]
    fn kicker_composite_means_kicking_ranks() {
        let rank = StatRank {
            kicking: Some(KickingRank { fg_made: 1, xp_made: 4 }),
            ..Default::default()
        };
        assert_eq!(category_rank_for_position(Position::Kicker, &rank), Some(2.5));
    }

    #[test]
    fn defense_composite_means_all_nine() {
        let rank = defense("KC", 2023, 1, 0.0).stat_rank.unwrap();
        // (1+2+3+4+6+10+20+7+9) / 9
        assert!(approx_eq(
            category_rank_for_position(Position::Defense, &rank).unwrap(),
            62.0 / 9.0
        ));
    }

    #[test]
    fn defensive_rank_by_position() {
        let d = defense("KC", 2023, 1, 0.0).stat_rank.unwrap().defense.unwrap();
        assert!(approx_eq(defensive_rank_against_position(Position::WideReceiver, &d), 5.0));
        assert!(approx_eq(defensive_rank_against_position(Position::Quarterback, &d), 5.0));
        // 0.4 * 5 + 0.6 * 15
        assert!(approx_eq(defensive_rank_against_position(Position::RunningBack, &d), 11.0));
        assert!(approx_eq(defensive_rank_against_position(Position::Kicker, &d), 8.0));
        assert!(approx_eq(defensive_rank_against_position(Position::Defense, &d), 0.0));
    }

    #[test]
    fn assembles_rows_with_opponent_join() {
        let profiles = vec![PlayerProfile::new("rb1", &["RB"])];
        let offensive = vec![
            offense("rb1", 2023, 2, 20.0, "KC"),
            offense("rb1", 2023, 1, 10.0, "KC"),
        ];
        let defensive = vec![
            defense("KC", 2023, 1, 8.0),
            defense("KC", 2023, 2, 4.0),
        ];

        let table = assemble_features(&profiles, &offensive, &defensive).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table.skipped.is_empty());

        let first = &table.rows[0];
        assert_eq!(first.season_week_key, 202301);
        assert!(approx_eq(first.avg_points_this_season, 0.0));
        assert!(approx_eq(first.avg_points_last_5_games, 0.0));
        assert!(approx_eq(first.opponent_avg_points_allowed_this_season, 0.0));
        assert!(approx_eq(first.actual_points, 10.0));
        assert_eq!(first.is_home, 0);
        assert_eq!(first.position_index, Position::RunningBack.feature_index());

        let second = &table.rows[1];
        assert_eq!(second.season_week_key, 202302);
        assert_eq!(second.is_home, 1);
        assert!(approx_eq(second.avg_points_this_season, 10.0));
        assert!(approx_eq(second.avg_points_last_5_games, 10.0));
        assert!(approx_eq(second.opponent_avg_points_allowed_this_season, 8.0));
        assert!(approx_eq(second.avg_category_rank_for_position, 6.4));
        assert!(approx_eq(second.opponent_avg_defensive_rank_against_position, 11.0));
        assert_eq!(second.player_game_id, "rb1_2023_02_KC");
    }

    #[test]
    fn missing_opponent_skips_only_that_row() {
        let profiles = vec![PlayerProfile::new("wr1", &["WR"])];
        let offensive = vec![
            offense("wr1", 2023, 1, 10.0, "KC"),
            offense("wr1", 2023, 2, 12.0, "KC"),
        ];
        let defensive = vec![defense("KC", 2023, 2, 4.0)];

        let table = assemble_features(&profiles, &offensive, &defensive).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.missing_opponent_count(), 1);
        // Rolling values still see the skipped game.
        assert!(approx_eq(table.rows[0].avg_points_this_season, 10.0));
    }

    #[test]
    fn uncomputable_rank_drops_row() {
        let profiles = vec![PlayerProfile::new("k1", &["K"])];
        let offensive = vec![offense("k1", 2023, 1, 9.0, "KC")];
        let defensive = vec![defense("KC", 2023, 1, 4.0)];

        let table = assemble_features(&profiles, &offensive, &defensive).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.uncomputable_rank_count(), 1);
    }

    #[test]
    fn unranked_record_is_uncomputable() {
        let profiles = vec![PlayerProfile::new("qb1", &["QB"])];
        let mut record = offense("qb1", 2023, 1, 9.0, "KC");
        record.stat_rank = None;
        let table =
            assemble_features(&profiles, &[record], &[defense("KC", 2023, 1, 4.0)]).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.uncomputable_rank_count(), 1);
    }

    #[test]
    fn invalid_position_fails_whole_call() {
        let profiles = vec![
            PlayerProfile::new("rb1", &["RB"]),
            PlayerProfile::new("lb1", &["LB"]),
        ];
        let offensive = vec![
            offense("rb1", 2023, 1, 10.0, "KC"),
            offense("lb1", 2023, 1, 3.0, "KC"),
        ];
        let err = assemble_features(&profiles, &offensive, &[defense("KC", 2023, 1, 1.0)])
            .unwrap_err();
        assert!(matches!(err, FeatureError::InvalidPosition { .. }));
    }

    #[test]
    fn empty_positions_fails_whole_call() {
        let profiles = vec![PlayerProfile::new("x", &[])];
        let offensive = vec![offense("x", 2023, 1, 10.0, "KC")];
        let err = assemble_features(&profiles, &offensive, &[]).unwrap_err();
        assert!(matches!(err, FeatureError::UnresolvedPosition { .. }));
    }

    #[test]
    fn records_without_profile_are_ignored() {
        let table = assemble_features(&[], &[offense("p", 2023, 1, 1.0, "KC")], &[]).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.unprofiled, 1);
    }

    #[test]
    fn defense_player_rows_leave_opponent_rank_zero() {
        let profiles = vec![PlayerProfile::new("DET", &["DEF"])];
        let mut own = defense("DET", 2023, 1, 11.0);
        own.game_id = game_id(2023, 1, "KC");
        own.opponent_team_id = "KC".into();

        let table = assemble_features(&profiles, &[own], &[defense("KC", 2023, 1, 4.0)]).unwrap();
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert!(approx_eq(row.opponent_avg_defensive_rank_against_position, 0.0));
        assert!(approx_eq(row.avg_category_rank_for_position, 62.0 / 9.0));
        assert_eq!(row.position_index, 6);
    }

    #[test]
    fn no_row_is_emitted_without_category_rank() {
        let profiles = vec![
            PlayerProfile::new("a", &["QB"]),
            PlayerProfile::new("b", &["K"]),
            PlayerProfile::new("c", &["WR"]),
        ];
        let offensive = vec![
            offense("a", 2023, 1, 1.0, "KC"),
            offense("b", 2023, 1, 1.0, "KC"),
            offense("c", 2023, 1, 1.0, "KC"),
        ];
        let table = assemble_features(&profiles, &offensive, &[defense("KC", 2023, 1, 4.0)]).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table
            .rows
            .iter()
            .all(|r| r.avg_category_rank_for_position.is_finite()));
    }
}
