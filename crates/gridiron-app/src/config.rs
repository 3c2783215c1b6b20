// Pipeline configuration (config/pipeline.toml, seeded from defaults/).

use std::path::{Path, PathBuf};

use gridiron_core::scoring::DefenseScoring;
use serde::Deserialize;
use thiserror::Error;

/// File name of the pipeline configuration under `config/`.
pub const PIPELINE_FILE: &str = "pipeline.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

/// Fully resolved pipeline settings. All paths are absolute or relative to
/// the directory the config was loaded from.
#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: InputPaths,
    pub features_csv: PathBuf,
    pub db_path: PathBuf,
    /// Seasons to rank; empty means all.
    pub seasons: Vec<i32>,
    pub fill_missing_points: bool,
    pub defense_scoring: DefenseScoring,
}

#[derive(Debug, Clone)]
pub struct InputPaths {
    pub profiles: PathBuf,
    pub player_games: PathBuf,
    pub defense_games: PathBuf,
    pub schedule: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// pipeline.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    inputs: InputsSection,
    output: OutputSection,
    #[serde(default)]
    seasons: SeasonsSection,
    #[serde(default)]
    scoring: ScoringSection,
}

#[derive(Debug, Clone, Deserialize)]
struct InputsSection {
    profiles: String,
    player_games: String,
    defense_games: String,
    #[serde(default)]
    schedule: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputSection {
    features_csv: String,
    #[serde(default)]
    database: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SeasonsSection {
    #[serde(default)]
    only: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScoringSection {
    #[serde(default = "default_fill_missing_points")]
    fill_missing_points: bool,
    #[serde(default)]
    defense: DefenseScoring,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            fill_missing_points: default_fill_missing_points(),
            defense: DefenseScoring::default(),
        }
    }
}

fn default_fill_missing_points() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/pipeline.toml` under `base_dir`. Relative paths
/// in the file are resolved against `base_dir`.
///
/// Does not seed missing files; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(PIPELINE_FILE);
    let text = read_file(&path)?;
    let file: PipelineFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&file)?;

    let resolve = |p: &str| base_dir.join(p);
    let db_path = match file.output.database.as_deref() {
        Some(db) => resolve(db),
        None => default_database_path().unwrap_or_else(|| resolve("gridiron.db")),
    };

    Ok(Config {
        inputs: InputPaths {
            profiles: resolve(file.inputs.profiles.as_str()),
            player_games: resolve(file.inputs.player_games.as_str()),
            defense_games: resolve(file.inputs.defense_games.as_str()),
            schedule: file.inputs.schedule.as_deref().map(resolve),
        },
        features_csv: resolve(file.output.features_csv.as_str()),
        db_path,
        seasons: file.seasons.only,
        fill_missing_points: file.scoring.fill_missing_points,
        defense_scoring: file.scoring.defense,
    })
}

/// Copy any file in `defaults/` that is missing from `config/`. Returns the
/// paths that were created. Existing config files are never overwritten.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let source = entry.path();
        let Some(file_name) = source.file_name().filter(|_| source.is_file()) else {
            continue;
        };
        // Templates stay in defaults/ for the user to copy by hand.
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {}: {e}", source.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Seed and load config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

/// `<platform data dir>/gridiron.db`, when the platform has one.
pub fn default_database_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "gridiron").map(|dirs| dirs.data_dir().join("gridiron.db"))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(file: &PipelineFile) -> Result<(), ConfigError> {
    let required_paths: &[(&str, &str)] = &[
        ("inputs.profiles", file.inputs.profiles.as_str()),
        ("inputs.player_games", file.inputs.player_games.as_str()),
        ("inputs.defense_games", file.inputs.defense_games.as_str()),
        ("output.features_csv", file.output.features_csv.as_str()),
    ];
    for (name, value) in required_paths {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if let Some(season) = file.seasons.only.iter().find(|s| !(1920..=2100).contains(*s)) {
        return Err(ConfigError::ValidationError {
            field: "seasons.only".into(),
            message: format!("season {season} is out of range"),
        });
    }

    let d = &file.scoring.defense;
    let scoring_fields: &[(&str, f64)] = &[
        ("scoring.defense.pts_allow_0", d.pts_allow_0),
        ("scoring.defense.pts_allow_1_6", d.pts_allow_1_6),
        ("scoring.defense.pts_allow_7_13", d.pts_allow_7_13),
        ("scoring.defense.pts_allow_14_20", d.pts_allow_14_20),
        ("scoring.defense.pts_allow_21_27", d.pts_allow_21_27),
        ("scoring.defense.pts_allow_28_34", d.pts_allow_28_34),
        ("scoring.defense.pts_allow_35p", d.pts_allow_35p),
        ("scoring.defense.yds_allow_0_100", d.yds_allow_0_100),
        ("scoring.defense.yds_allow_100_199", d.yds_allow_100_199),
        ("scoring.defense.yds_allow_200_299", d.yds_allow_200_299),
        ("scoring.defense.yds_allow_300_349", d.yds_allow_300_349),
        ("scoring.defense.yds_allow_350_399", d.yds_allow_350_399),
        ("scoring.defense.yds_allow_400_449", d.yds_allow_400_449),
        ("scoring.defense.yds_allow_450_499", d.yds_allow_450_499),
        ("scoring.defense.yds_allow_500_549", d.yds_allow_500_549),
        ("scoring.defense.yds_allow_550p", d.yds_allow_550p),
        ("scoring.defense.def_td", d.def_td),
        ("scoring.defense.sack", d.sack),
        ("scoring.defense.int", d.int),
        ("scoring.defense.fum_rec", d.fum_rec),
        ("scoring.defense.safety", d.safety),
        ("scoring.defense.ff", d.ff),
    ];
    for (name, val) in scoring_fields {
        if !val.is_finite() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be finite, got {val}"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Crate root holding `defaults/`, whether tests run from the crate or
    /// the workspace root.
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/gridiron-app/defaults").exists() {
            cwd.join("crates/gridiron-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Fresh temp dir with `config/pipeline.toml` containing `text`.
    fn config_dir_with(name: &str, text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(PIPELINE_FILE), text).unwrap();
        tmp
    }

    fn default_text() -> String {
        fs::read_to_string(project_root().join("defaults").join(PIPELINE_FILE)).unwrap()
    }

    #[test]
    fn load_default_pipeline_file() {
        let tmp = config_dir_with("gridiron_config_defaults", &default_text());
        let config = load_config_from(&tmp).expect("defaults should load");

        assert_eq!(config.inputs.profiles, tmp.join("data/profiles.csv"));
        assert_eq!(config.inputs.defense_games, tmp.join("data/defense_games.json"));
        assert!(config.inputs.schedule.is_none());
        assert_eq!(config.features_csv, tmp.join("output/features.csv"));
        assert!(config.seasons.is_empty());
        assert!(config.fill_missing_points);
        assert_eq!(config.defense_scoring, DefenseScoring::default());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_database_and_schedule_are_resolved() {
        let text = r#"
[inputs]
profiles = "p.csv"
player_games = "g.json"
defense_games = "d.json"
schedule = "s.csv"

[output]
features_csv = "f.csv"
database = "db/run.db"

[seasons]
only = [2022, 2023]
"#;
        let tmp = config_dir_with("gridiron_config_explicit", text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.db_path, tmp.join("db/run.db"));
        assert_eq!(config.inputs.schedule, Some(tmp.join("s.csv")));
        assert_eq!(config.seasons, vec![2022, 2023]);
        // [scoring] omitted entirely
        assert!(config.fill_missing_points);
        assert!((config.defense_scoring.sack - 1.0).abs() < f64::EPSILON);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn partial_scoring_table_keeps_defaults() {
        let text = default_text().replace("sack = 1.0", "sack = 1.5");
        let tmp = config_dir_with("gridiron_config_partial_scoring", &text);
        let config = load_config_from(&tmp).unwrap();
        assert!((config.defense_scoring.sack - 1.5).abs() < f64::EPSILON);
        assert!((config.defense_scoring.pts_allow_0 - 10.0).abs() < f64::EPSILON);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_input_path() {
        let text = default_text().replace(
            "profiles = \"data/profiles.csv\"",
            "profiles = \"  \"",
        );
        let tmp = config_dir_with("gridiron_config_empty_path", &text);
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "inputs.profiles");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_out_of_range_season() {
        let text = default_text().replace("only = []", "only = [23]");
        let tmp = config_dir_with("gridiron_config_bad_season", &text);
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "seasons.only");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_pipeline_toml() {
        let tmp = std::env::temp_dir().join("gridiron_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with(PIPELINE_FILE));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = config_dir_with("gridiron_config_invalid_toml", "[inputs\nprofiles = ");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }), "got: {err}");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_seeds_and_preserves() {
        let tmp = std::env::temp_dir().join("gridiron_config_seed");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(PIPELINE_FILE), default_text()).unwrap();
        fs::write(tmp.join("defaults").join("pipeline.toml.example"), "# template\n").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config").join(PIPELINE_FILE)]);
        assert!(!tmp.join("config").join("pipeline.toml.example").exists());

        fs::write(tmp.join("config").join(PIPELINE_FILE), "# edited\n").unwrap();
        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        let kept = fs::read_to_string(tmp.join("config").join(PIPELINE_FILE)).unwrap();
        assert_eq!(kept, "# edited\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_without_any_directory_fails() {
        let tmp = std::env::temp_dir().join("gridiron_config_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultsCopyError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }
}
