// Feature table CSV export.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use gridiron_core::model::FeatureRow;

/// Column order of the exported feature table.
pub const FEATURE_COLUMNS: [&str; 11] = [
    "player_game_id",
    "player_id",
    "season_week_key",
    "position_index",
    "is_home",
    "avg_points_this_season",
    "avg_points_last_5_games",
    "avg_category_rank_for_position",
    "opponent_avg_points_allowed_this_season",
    "opponent_avg_defensive_rank_against_position",
    "actual_points",
];

/// Write the header and one line per row. The header is written even when
/// there are no rows.
pub fn write_features<W: Write>(writer: W, rows: &[FeatureRow]) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(FEATURE_COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export rows to `path`, creating parent directories as needed.
pub fn export_features(path: &Path, rows: &[FeatureRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_features(file, rows).with_context(|| format!("failed to write {}", path.display()))
}
