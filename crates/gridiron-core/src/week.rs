// Week parsing, validation, and grouping of records into weekly buckets.

use std::collections::BTreeMap;

use crate::error::RankError;
use crate::model::PlayerGameRecord;

/// Regular-season weeks ranked per season.
pub const REGULAR_SEASON_WEEKS: u32 = 18;

/// Records for one season keyed by week number.
pub type WeeklyGroups = BTreeMap<u32, Vec<PlayerGameRecord>>;

/// Parse a provider week label. Accepts `"3"` and `"Week 3"`.
pub fn parse_week(label: &str) -> Result<u32, RankError> {
    let trimmed = label.trim();
    let number = match trimmed.split_once(' ') {
        Some((_, rest)) => rest.trim(),
        None => trimmed,
    };
    let week: i64 = number
        .parse()
        .map_err(|_| RankError::invalid_week(label, "not a number"))?;
    validate_week(week)
}

/// Check a week number lies within the regular season.
pub fn validate_week(week: i64) -> Result<u32, RankError> {
    if (1..=REGULAR_SEASON_WEEKS as i64).contains(&week) {
        Ok(week as u32)
    } else {
        Err(RankError::invalid_week(
            week,
            format!("outside 1..={REGULAR_SEASON_WEEKS}"),
        ))
    }
}

/// Bucket records by their `week` field, rejecting any out-of-range week.
pub fn group_by_week(records: Vec<PlayerGameRecord>) -> Result<WeeklyGroups, RankError> {
    let mut groups = WeeklyGroups::new();
    for record in records {
        let week = validate_week(record.week as i64)?;
        groups.entry(week).or_default().push(record);
    }
    Ok(groups)
}

/// Every week 1..=18 must be present and non-empty, and every record must sit
/// under the week it claims.
pub fn validate_weekly_groups(groups: &WeeklyGroups) -> Result<(), RankError> {
    for (&key, records) in groups {
        validate_week(key as i64)?;
        if let Some(stray) = records.iter().find(|r| r.week != key) {
            return Err(RankError::invalid_week(
                stray.week,
                format!(
                    "record {} is filed under week {key}",
                    stray.player_game_id()
                ),
            ));
        }
    }

    for week in 1..=REGULAR_SEASON_WEEKS {
        match groups.get(&week) {
            None => return Err(RankError::invalid_week(week, "missing from season")),
            Some(records) if records.is_empty() => {
                return Err(RankError::invalid_week(week, "has no records"))
            }
            Some(_) => {}
        }
    }
    Ok(())
}
