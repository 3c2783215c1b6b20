// Team-defense fantasy scoring.
//
// Yards and points allowed each land in exactly one bracket; every other
// category is a flat per-event value.

use serde::{Deserialize, Serialize};

use crate::model::DefenseStats;

/// League scoring table for team defenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseScoring {
    pub pts_allow_0: f64,
    pub pts_allow_1_6: f64,
    pub pts_allow_7_13: f64,
    pub pts_allow_14_20: f64,
    pub pts_allow_21_27: f64,
    pub pts_allow_28_34: f64,
    pub pts_allow_35p: f64,

    pub yds_allow_0_100: f64,
    pub yds_allow_100_199: f64,
    pub yds_allow_200_299: f64,
    pub yds_allow_300_349: f64,
    pub yds_allow_350_399: f64,
    pub yds_allow_400_449: f64,
    pub yds_allow_450_499: f64,
    pub yds_allow_500_549: f64,
    pub yds_allow_550p: f64,

    pub def_td: f64,
    pub sack: f64,
    pub int: f64,
    pub fum_rec: f64,
    pub safety: f64,
    pub ff: f64,
}

impl Default for DefenseScoring {
    fn default() -> Self {
        Self {
            pts_allow_0: 10.0,
            pts_allow_1_6: 7.0,
            pts_allow_7_13: 4.0,
            pts_allow_14_20: 1.0,
            pts_allow_21_27: 0.0,
            pts_allow_28_34: -1.0,
            pts_allow_35p: -4.0,

            yds_allow_0_100: 5.0,
            yds_allow_100_199: 3.0,
            yds_allow_200_299: 2.0,
            yds_allow_300_349: 0.0,
            yds_allow_350_399: -1.0,
            yds_allow_400_449: -3.0,
            yds_allow_450_499: -5.0,
            yds_allow_500_549: -6.0,
            yds_allow_550p: -7.0,

            def_td: 6.0,
            sack: 1.0,
            int: 2.0,
            fum_rec: 2.0,
            safety: 2.0,
            ff: 1.0,
        }
    }
}

impl DefenseScoring {
    /// Fantasy points for one team-defense game.
    pub fn score(&self, stats: &DefenseStats) -> f64 {
        self.points_allowed_value(stats.pts_allowed)
            + self.yards_allowed_value(stats.yds_allowed)
            + stats.def_td as f64 * self.def_td
            + stats.sacks as f64 * self.sack
            + stats.defensive_interceptions as f64 * self.int
            + stats.fumbles_recovered as f64 * self.fum_rec
            + stats.safeties as f64 * self.safety
            + stats.forced_fumbles as f64 * self.ff
    }

    fn points_allowed_value(&self, pts: i64) -> f64 {
        match pts {
            i64::MIN..=0 => self.pts_allow_0,
            1..=6 => self.pts_allow_1_6,
            7..=13 => self.pts_allow_7_13,
            14..=20 => self.pts_allow_14_20,
            21..=27 => self.pts_allow_21_27,
            28..=34 => self.pts_allow_28_34,
            _ => self.pts_allow_35p,
        }
    }

    fn yards_allowed_value(&self, yds: i64) -> f64 {
        match yds {
            i64::MIN..=99 => self.yds_allow_0_100,
            100..=199 => self.yds_allow_100_199,
            200..=299 => self.yds_allow_200_299,
            300..=349 => self.yds_allow_300_349,
            350..=399 => self.yds_allow_350_399,
            400..=449 => self.yds_allow_400_449,
            450..=499 => self.yds_allow_450_499,
            500..=549 => self.yds_allow_500_549,
            _ => self.yds_allow_550p,
        }
    }
}
