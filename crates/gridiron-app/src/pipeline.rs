// End-to-end run: load inputs, rank each season, assemble features, persist
// and export.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use gridiron_core::features::{assemble_features, FeatureTable};
use gridiron_core::model::{PlayerGameRecord, PlayerProfile};
use gridiron_core::ranking::rank;
use gridiron_core::schedule::{annotate_with_schedule, ScheduledGame};
use gridiron_core::scoring::DefenseScoring;
use gridiron_core::week::group_by_week;
use gridiron_core::RankError;
use tracing::{debug, info};

use crate::config::Config;
use crate::db::{Database, RunRecord};
use crate::export::export_features;
use crate::input;

/// Everything the pipeline reads before ranking.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub profiles: Vec<PlayerProfile>,
    pub player_games: Vec<PlayerGameRecord>,
    pub defense_games: Vec<PlayerGameRecord>,
    pub schedule: Option<Vec<ScheduledGame>>,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub run_id: i64,
    /// Ranked records, individual and team-defense together.
    pub records: usize,
    pub seasons: Vec<i32>,
    pub feature_rows: usize,
    pub skipped_missing_opponent: usize,
    pub skipped_uncomputable_rank: usize,
    pub unprofiled: usize,
    pub features_csv: PathBuf,
}

/// Read every configured input file.
pub fn load_inputs(config: &Config) -> Result<PipelineInputs> {
    let profiles = input::load_profiles(&config.inputs.profiles)
        .context("failed to load player profiles")?;
    let player_games = input::load_player_games(&config.inputs.player_games)
        .context("failed to load player games")?;
    let defense_games = input::load_defense_games(&config.inputs.defense_games)
        .context("failed to load defense games")?;
    let schedule = config
        .inputs
        .schedule
        .as_deref()
        .map(input::load_schedule)
        .transpose()
        .context("failed to load schedule")?;

    info!(
        profiles = profiles.len(),
        player_games = player_games.len(),
        defense_games = defense_games.len(),
        scheduled_games = schedule.as_ref().map_or(0, Vec::len),
        "inputs loaded"
    );
    Ok(PipelineInputs {
        profiles,
        player_games,
        defense_games,
        schedule,
    })
}

/// Score team-defense records that carry a defense line but no points.
/// Returns how many were filled.
///
/// Zero points counts as unscored, so a provider score of exactly 0 is
/// replaced by the table's score.
pub fn fill_defense_points(records: &mut [PlayerGameRecord], scoring: &DefenseScoring) -> usize {
    let mut filled = 0;
    for record in records.iter_mut() {
        let Some(line) = record.stats.defense.as_ref() else {
            continue;
        };
        if record.points == 0.0 {
            record.points = scoring.score(line);
            filled += 1;
        }
    }
    filled
}

/// Split ranked records into the opponent pool (every team defense) and the
/// records that get feature rows. A team defense with its own `DEF` profile
/// lands in both.
pub fn split_for_features(
    ranked: &[PlayerGameRecord],
    profiles: &[PlayerProfile],
) -> (Vec<PlayerGameRecord>, Vec<PlayerGameRecord>) {
    let profiled: HashSet<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
    let mut defensive = Vec::new();
    let mut players = Vec::new();
    for record in ranked {
        if !record.is_defense() {
            players.push(record.clone());
            continue;
        }
        if profiled.contains(record.player_id.as_str()) {
            players.push(record.clone());
        }
        defensive.push(record.clone());
    }
    (defensive, players)
}

/// Rank every season independently, each from an empty accumulator.
///
/// With a non-empty `only`, records from other seasons are dropped first.
/// Returns the ranked records and the seasons that were ranked, ascending.
pub fn rank_seasons(
    records: Vec<PlayerGameRecord>,
    only: &[i32],
) -> Result<(Vec<PlayerGameRecord>, Vec<i32>), RankError> {
    let mut by_season: BTreeMap<i32, Vec<PlayerGameRecord>> = BTreeMap::new();
    for record in records {
        if only.is_empty() || only.contains(&record.season) {
            by_season.entry(record.season).or_default().push(record);
        }
    }

    let seasons: Vec<i32> = by_season.keys().copied().collect();
    let mut ranked = Vec::new();
    for (season, season_records) in by_season {
        debug!(season, records = season_records.len(), "ranking season");
        ranked.extend(rank(group_by_week(season_records)?)?);
    }
    Ok((ranked, seasons))
}

/// Run with already-loaded inputs against an open database.
pub fn process(config: &Config, inputs: PipelineInputs, db: &Database) -> Result<PipelineSummary> {
    let started_at = Utc::now();
    let PipelineInputs {
        profiles,
        player_games,
        mut defense_games,
        schedule,
    } = inputs;

    let mut records = player_games;
    records.append(&mut defense_games);

    if let Some(games) = schedule.as_deref() {
        annotate_with_schedule(&mut records, games).context("schedule annotation failed")?;
    }
    if config.fill_missing_points {
        let filled = fill_defense_points(&mut records, &config.defense_scoring);
        info!(filled, "scored team-defense records without points");
    }

    let (ranked, seasons) =
        rank_seasons(records, &config.seasons).context("season ranking failed")?;
    info!(records = ranked.len(), ?seasons, "ranking complete");

    let (defensive, players) = split_for_features(&ranked, &profiles);
    let table: FeatureTable = assemble_features(&profiles, &players, &defensive)
        .context("feature assembly failed")?;

    db.upsert_profiles(&profiles)?;
    db.upsert_player_games(&ranked)?;
    db.upsert_features(&table.rows)?;
    export_features(&config.features_csv, &table.rows)?;

    let run_id = db.record_run(&RunRecord {
        started_at,
        finished_at: Utc::now(),
        seasons: seasons.clone(),
        records: ranked.len(),
        feature_rows: table.rows.len(),
        skipped_rows: table.skipped.len(),
    })?;

    let summary = PipelineSummary {
        run_id,
        records: ranked.len(),
        seasons,
        feature_rows: table.rows.len(),
        skipped_missing_opponent: table.missing_opponent_count(),
        skipped_uncomputable_rank: table.uncomputable_rank_count(),
        unprofiled: table.unprofiled,
        features_csv: config.features_csv.clone(),
    };
    info!(?summary, "pipeline run complete");
    Ok(summary)
}

/// Load inputs, open the configured database and run.
pub fn run(config: &Config) -> Result<PipelineSummary> {
    let inputs = load_inputs(config)?;

    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_path = config.db_path.to_string_lossy();
    let db = Database::open(&db_path).context("failed to open database")?;
    info!("Database opened at {}", db_path);

    process(config, inputs, &db)
}
