// Week-by-week league ranking of cumulative season totals.
//
// Each week the running column for every category is sorted once, every
// record of that week is ranked against the sorted snapshot, and only then
// are the week's contributions folded into the totals. Week W therefore sees
// totals through week W-1 and nothing of its own games.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::category::{Category, SortDirection};
use crate::error::RankError;
use crate::model::{PlayerGameRecord, Rank, StatRank, NO_HISTORY_RANK};
use crate::week::{validate_weekly_groups, WeeklyGroups, REGULAR_SEASON_WEEKS};

// ---------------------------------------------------------------------------
// Per-category column
// ---------------------------------------------------------------------------

/// One player's running total in a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    pub player_id: String,
    pub cumulative: i64,
}

/// Running totals for one category, unique per player.
///
/// Positions are only meaningful right after [`StatColumnState::sort`];
/// folding never reorders entries, it only updates values or appends.
#[derive(Debug, Clone, Default)]
pub struct StatColumnState {
    entries: Vec<ColumnEntry>,
    positions: HashMap<String, usize>,
}

impl StatColumnState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ColumnEntry] {
        &self.entries
    }

    pub fn cumulative(&self, player_id: &str) -> Option<i64> {
        self.positions
            .get(player_id)
            .map(|&idx| self.entries[idx].cumulative)
    }

    /// Stable sort; ties keep their existing relative order.
    fn sort(&mut self, direction: SortDirection) {
        match direction {
            SortDirection::Descending => self.entries.sort_by(|a, b| b.cumulative.cmp(&a.cumulative)),
            SortDirection::Ascending => self.entries.sort_by(|a, b| a.cumulative.cmp(&b.cumulative)),
        }
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.player_id.clone(), idx))
            .collect();
    }

    fn position_of(&self, player_id: &str) -> Option<usize> {
        self.positions.get(player_id).copied()
    }

    fn fold(&mut self, player_id: &str, contribution: i64) {
        match self.positions.get(player_id) {
            Some(&idx) => self.entries[idx].cumulative += contribution,
            None => {
                self.positions
                    .insert(player_id.to_string(), self.entries.len());
                self.entries.push(ColumnEntry {
                    player_id: player_id.to_string(),
                    cumulative: contribution,
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Season accumulator
// ---------------------------------------------------------------------------

/// Every category's running column for a single season.
///
/// Owned by exactly one ranking run; start a fresh one per season so totals
/// never leak across seasons.
#[derive(Debug, Clone)]
pub struct SeasonAccumulator {
    columns: BTreeMap<Category, StatColumnState>,
}

impl Default for SeasonAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SeasonAccumulator {
    pub fn new() -> Self {
        Self {
            columns: Category::ALL
                .iter()
                .map(|&c| (c, StatColumnState::new()))
                .collect(),
        }
    }

    pub fn column(&self, category: Category) -> &StatColumnState {
        &self.columns[&category]
    }

    pub fn cumulative(&self, category: Category, player_id: &str) -> Option<i64> {
        self.column(category).cumulative(player_id)
    }

    /// Sort every column in its category's direction.
    fn snapshot(&mut self) {
        for (category, column) in self.columns.iter_mut() {
            column.sort(category.direction());
        }
    }

    /// Rank of `player_id` in the current snapshot.
    ///
    /// A player with no entry yet is unrankable in week 1 and tied for last
    /// (the column's length) afterwards.
    fn rank_of(&self, category: Category, player_id: &str, week: u32) -> Rank {
        let column = self.column(category);
        match column.position_of(player_id) {
            Some(idx) => idx as Rank + 1,
            None if week == 1 => NO_HISTORY_RANK,
            None => column.len() as Rank,
        }
    }

    fn rank_record(&self, record: &PlayerGameRecord, week: u32) -> StatRank {
        let mut rank = StatRank::default();
        if record.is_defense() && record.stats.defense.is_none() {
            return rank;
        }
        for category in record.kind().categories() {
            rank.set(category, self.rank_of(category, &record.player_id, week));
        }
        rank
    }

    fn fold_record(&mut self, record: &PlayerGameRecord) {
        if record.is_defense() && record.stats.defense.is_none() {
            return;
        }
        for category in record.kind().categories() {
            let contribution = category.contribution(&record.stats);
            if let Some(column) = self.columns.get_mut(&category) {
                column.fold(&record.player_id, contribution);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Output of one season's ranking run.
#[derive(Debug, Clone)]
pub struct RankedSeason {
    /// Every input record with `stat_rank` filled. Order is not meaningful.
    pub records: Vec<PlayerGameRecord>,
    /// Totals through the final week.
    pub accumulator: SeasonAccumulator,
}

/// Ranks one season's weekly groups.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    accumulator: SeasonAccumulator,
}

impl RankingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from existing totals instead of an empty season.
    pub fn with_accumulator(accumulator: SeasonAccumulator) -> Self {
        Self { accumulator }
    }

    /// Rank weeks 1 through 18 in order.
    ///
    /// The whole input is validated before any total is touched; a missing,
    /// empty, or out-of-range week fails the run.
    pub fn run(mut self, mut weekly: WeeklyGroups) -> Result<RankedSeason, RankError> {
        validate_weekly_groups(&weekly)?;

        let mut ranked = Vec::with_capacity(weekly.values().map(Vec::len).sum());
        for week in 1..=REGULAR_SEASON_WEEKS {
            let Some(mut games) = weekly.remove(&week) else {
                return Err(RankError::invalid_week(week, "missing from season"));
            };

            self.accumulator.snapshot();
            for game in games.iter_mut() {
                game.stat_rank = Some(self.accumulator.rank_record(game, week));
            }
            for game in &games {
                self.accumulator.fold_record(game);
            }

            debug!(week, records = games.len(), "ranked week");
            ranked.append(&mut games);
        }

        info!(records = ranked.len(), "season ranking complete");
        Ok(RankedSeason {
            records: ranked,
            accumulator: self.accumulator,
        })
    }
}

/// Rank a season from scratch.
pub fn rank(weekly: WeeklyGroups) -> Result<Vec<PlayerGameRecord>, RankError> {
    RankingEngine::new().run(weekly).map(|season| season.records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
