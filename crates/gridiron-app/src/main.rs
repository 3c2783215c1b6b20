// Gridiron pipeline entry point.
//
// 1. Initialize tracing (log to file)
// 2. Load config, seeding config/ from defaults/ when needed
// 3. Run the pipeline: load, rank, assemble, persist, export
// 4. Print a one-line summary

use anyhow::Context;
use gridiron_app::config;
use gridiron_app::pipeline;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Gridiron pipeline starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: features -> {}, database -> {}",
        config.features_csv.display(),
        config.db_path.display()
    );

    let summary = match pipeline::run(&config) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Pipeline failed: {:#}", e);
            return Err(e);
        }
    };

    println!(
        "run {}: ranked {} records across seasons {:?}; wrote {} feature rows to {} \
         (skipped: {} missing opponent, {} uncomputable rank, {} without profile)",
        summary.run_id,
        summary.records,
        summary.seasons,
        summary.feature_rows,
        summary.features_csv.display(),
        summary.skipped_missing_opponent,
        summary.skipped_uncomputable_rank,
        summary.unprofiled,
    );
    info!("Gridiron pipeline finished");
    Ok(())
}

/// Initialize tracing to log to `logs/gridiron.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("gridiron.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridiron_app=info,gridiron_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
