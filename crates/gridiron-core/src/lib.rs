// Season ranking and regression feature derivation for fantasy football
// player-game records.

pub mod category;
pub mod error;
pub mod features;
pub mod model;
pub mod position;
pub mod ranking;
pub mod schedule;
pub mod scoring;
pub mod team;
pub mod week;

pub use category::{Category, CategoryGroup, RecordKind, SortDirection};
pub use error::{FeatureError, RankError, RowSkip, ScheduleError};
pub use features::{assemble_features, FeatureTable};
pub use model::{FeatureRow, GameStats, PlayerGameRecord, PlayerProfile, StatRank};
pub use position::Position;
pub use ranking::{rank, RankedSeason, RankingEngine, SeasonAccumulator};
pub use schedule::{annotate_with_schedule, ScheduledGame};
pub use scoring::DefenseScoring;
pub use week::{group_by_week, WeeklyGroups};
