// Ranked stat categories: which group each belongs to, which direction is
// better, and how much a single game contributes to its running total.

use std::fmt;

use crate::model::GameStats;

/// Order in which a category's cumulative column is sorted before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Higher totals rank better (yardage, touchdowns, makes, takeaways).
    Descending,
    /// Lower totals rank better (interceptions thrown, everything "allowed").
    Ascending,
}

/// Stat group a category is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryGroup {
    Passing,
    Rushing,
    Receiving,
    Kicking,
    Defense,
}

impl CategoryGroup {
    /// Ranked categories in this group, in reporting order.
    pub fn categories(&self) -> &'static [Category] {
        match self {
            CategoryGroup::Passing => &[
                Category::PassAttempts,
                Category::PassYds,
                Category::PassTd,
                Category::Interceptions,
            ],
            CategoryGroup::Rushing => &[Category::RushYds, Category::Carries, Category::RushTd],
            CategoryGroup::Receiving => &[
                Category::RecYds,
                Category::RecTd,
                Category::Receptions,
                Category::Targets,
            ],
            CategoryGroup::Kicking => &[Category::FgMade, Category::XpMade],
            CategoryGroup::Defense => &[
                Category::YdsAllowed,
                Category::PtsAllowed,
                Category::Takeaways,
                Category::PassYdsAllowed,
                Category::PassTdsAllowed,
                Category::RushYdsAllowed,
                Category::RushTdsAllowed,
                Category::FgAllowed,
                Category::XpAllowed,
            ],
        }
    }
}

/// A single statistical measure, tracked and ranked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    RushYds,
    Carries,
    RushTd,
    PassAttempts,
    PassYds,
    PassTd,
    Interceptions,
    RecYds,
    RecTd,
    Receptions,
    Targets,
    FgMade,
    XpMade,
    YdsAllowed,
    PtsAllowed,
    Takeaways,
    PassYdsAllowed,
    PassTdsAllowed,
    RushYdsAllowed,
    RushTdsAllowed,
    FgAllowed,
    XpAllowed,
}

impl Category {
    pub const ALL: [Category; 22] = [
        Category::RushYds,
        Category::Carries,
        Category::RushTd,
        Category::PassAttempts,
        Category::PassYds,
        Category::PassTd,
        Category::Interceptions,
        Category::RecYds,
        Category::RecTd,
        Category::Receptions,
        Category::Targets,
        Category::FgMade,
        Category::XpMade,
        Category::YdsAllowed,
        Category::PtsAllowed,
        Category::Takeaways,
        Category::PassYdsAllowed,
        Category::PassTdsAllowed,
        Category::RushYdsAllowed,
        Category::RushTdsAllowed,
        Category::FgAllowed,
        Category::XpAllowed,
    ];

    pub fn group(&self) -> CategoryGroup {
        match self {
            Category::PassAttempts | Category::PassYds | Category::PassTd | Category::Interceptions => {
                CategoryGroup::Passing
            }
            Category::RushYds | Category::Carries | Category::RushTd => CategoryGroup::Rushing,
            Category::RecYds | Category::RecTd | Category::Receptions | Category::Targets => {
                CategoryGroup::Receiving
            }
            Category::FgMade | Category::XpMade => CategoryGroup::Kicking,
            _ => CategoryGroup::Defense,
        }
    }

    pub fn direction(&self) -> SortDirection {
        match self {
            Category::Interceptions
            | Category::YdsAllowed
            | Category::PtsAllowed
            | Category::PassYdsAllowed
            | Category::PassTdsAllowed
            | Category::RushYdsAllowed
            | Category::RushTdsAllowed
            | Category::FgAllowed
            | Category::XpAllowed => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }

    /// Key used for this category inside a serialized stat group.
    pub fn key(&self) -> &'static str {
        match self {
            Category::RushYds => "rushYds",
            Category::Carries => "carries",
            Category::RushTd => "rushTD",
            Category::PassAttempts => "passAttempts",
            Category::PassYds => "passYds",
            Category::PassTd => "passTD",
            Category::Interceptions => "interceptions",
            Category::RecYds => "recYds",
            Category::RecTd => "recTD",
            Category::Receptions => "receptions",
            Category::Targets => "targets",
            Category::FgMade => "fgMade",
            Category::XpMade => "xpMade",
            Category::YdsAllowed => "ydsAllowed",
            Category::PtsAllowed => "ptsAllowed",
            Category::Takeaways => "takeaways",
            Category::PassYdsAllowed => "passYdsAllowed",
            Category::PassTdsAllowed => "passTDsAllowed",
            Category::RushYdsAllowed => "rushYdsAllowed",
            Category::RushTdsAllowed => "rushTDsAllowed",
            Category::FgAllowed => "fgAllowed",
            Category::XpAllowed => "xpAllowed",
        }
    }

    /// This game's addition to the category's running total. Absent groups
    /// contribute 0.
    pub fn contribution(&self, stats: &GameStats) -> i64 {
        let passing = stats.passing.unwrap_or_default();
        let rushing = stats.rushing.unwrap_or_default();
        let receiving = stats.receiving.unwrap_or_default();
        let kicking = stats.kicking.unwrap_or_default();
        let defense = stats.defense.unwrap_or_default();

        match self {
            Category::RushYds => rushing.rush_yds,
            Category::Carries => rushing.carries,
            Category::RushTd => rushing.rush_td,
            Category::PassAttempts => passing.pass_attempts,
            Category::PassYds => passing.pass_yds,
            Category::PassTd => passing.pass_td,
            Category::Interceptions => passing.interceptions,
            Category::RecYds => receiving.rec_yds,
            Category::RecTd => receiving.rec_td,
            Category::Receptions => receiving.receptions,
            Category::Targets => receiving.targets,
            Category::FgMade => kicking.fg_made,
            Category::XpMade => kicking.xp_made,
            Category::YdsAllowed => defense.yds_allowed,
            Category::PtsAllowed => defense.pts_allowed,
            Category::Takeaways => defense.takeaways(),
            Category::PassYdsAllowed => defense.pass_yds_allowed,
            Category::PassTdsAllowed => defense.pass_tds_allowed,
            Category::RushYdsAllowed => defense.rush_yds_allowed,
            Category::RushTdsAllowed => defense.rush_tds_allowed,
            Category::FgAllowed => defense.fg_allowed,
            Category::XpAllowed => defense.xp_allowed,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which family of categories a record is ranked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Individual non-kicker: rushing, passing and receiving are all ranked,
    /// whether or not the record carries those groups.
    Offense,
    /// Individual with a kicking line.
    Kicker,
    /// Synthetic team-defense player.
    Defense,
}

impl RecordKind {
    pub fn groups(self) -> &'static [CategoryGroup] {
        match self {
            RecordKind::Offense => &[
                CategoryGroup::Rushing,
                CategoryGroup::Passing,
                CategoryGroup::Receiving,
            ],
            RecordKind::Kicker => &[CategoryGroup::Kicking],
            RecordKind::Defense => &[CategoryGroup::Defense],
        }
    }

    pub fn categories(self) -> impl Iterator<Item = Category> {
        self.groups()
            .iter()
            .flat_map(|g| g.categories().iter().copied())
    }
}
