//! voterscore - participation score recomputation
//!
//! Recomputes the 1.0-10.0 participation score of every voter in the
//! registry and writes it back, page by page. Progress is reported as
//! structured log lines. Exit code is non-zero only when the run could not
//! fetch a page (or was cancelled); per-record and per-row failures are
//! logged and counted.
//!
//! `voterscore average` prints the mean persisted score of a cohort.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voterscore_batch::config::{Overrides, TomlConfig};
use voterscore_batch::scoring::{average, parse_election_date, CohortInput, ScoreCalculator};
use voterscore_batch::services::{
    BatchScoreUpdater, DryRunWriter, FallbackScoreWriter, Pagination, SqliteVoterRegistry,
};
use voterscore_batch::{RunError, RunStats, VoterStatus};
use voterscore_common::config::{load_toml_config, resolve_config_path};
use voterscore_common::db::init_database;

/// Command-line arguments for voterscore
#[derive(Parser, Debug)]
#[command(name = "voterscore")]
#[command(about = "Recompute voter participation scores")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long, env = "VOTERSCORE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// SQLite voter registry
    #[arg(long, env = "VOTERSCORE_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VOTERSCORE_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the mean persisted score of a cohort
    Average(AverageArgs),
}

/// Options for the recomputation run (the default command)
#[derive(Args, Debug)]
struct RunArgs {
    /// Voters per page
    #[arg(long, env = "VOTERSCORE_BATCH_SIZE")]
    batch_size: Option<u32>,

    /// Page traversal strategy
    #[arg(long, value_enum)]
    pagination: Option<Pagination>,

    /// Evaluation date (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_as_of)]
    as_of: Option<NaiveDate>,

    /// Compute scores and statistics without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct AverageArgs {
    /// Restrict the cohort to one registration status
    #[arg(long, value_enum)]
    status: Option<StatusArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Active,
    Inactive,
}

impl From<StatusArg> for VoterStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => VoterStatus::Active,
            StatusArg::Inactive => VoterStatus::Inactive,
        }
    }
}

fn parse_as_of(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_election_date(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let file_config: TomlConfig =
        load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;
    let config = file_config.with_overrides(Overrides {
        database: cli.database.clone(),
        batch_size: cli.run.batch_size,
        pagination: cli.run.pagination,
        log_level: cli.log_level.clone(),
    });

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting voterscore v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using built-in defaults"),
    }

    config.validate().context("Invalid configuration")?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open voter registry")?;

    let registry = SqliteVoterRegistry::new(pool.clone(), config.batch.pagination);

    match cli.command {
        Some(Command::Average(args)) => run_average(&registry, args).await,
        None => run_recompute(&config, registry, cli.run).await,
    }
}

async fn run_recompute(config: &TomlConfig, registry: SqliteVoterRegistry, args: RunArgs) -> Result<()> {
    let as_of = args
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let calculator = ScoreCalculator::new(config.scoring.clone(), as_of);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let batch_size = config.batch.batch_size;
    let result = if args.dry_run {
        info!("Dry run: scores will not be written");
        BatchScoreUpdater::new(registry, DryRunWriter, calculator, batch_size)
            .with_cancellation(cancel)
            .run()
            .await
    } else {
        let writer =
            FallbackScoreWriter::sqlite(registry.pool().clone(), config.batch.bulk_update_timeout());
        BatchScoreUpdater::new(registry, writer, calculator, batch_size)
            .with_cancellation(cancel)
            .run()
            .await
    };

    match result {
        Ok(stats) => {
            report_summary(&stats, args.dry_run);
            Ok(())
        }
        Err(err) => {
            report_summary(err.stats(), args.dry_run);
            if let RunError::Fetch { .. } = err {
                warn!("Pages persisted before the failure remain committed");
            }
            Err(err.into())
        }
    }
}

async fn run_average(registry: &SqliteVoterRegistry, args: AverageArgs) -> Result<()> {
    let status = args.status.map(VoterStatus::from);
    let scores = registry
        .persisted_scores(status)
        .await
        .context("Failed to read persisted scores")?;

    let mean = average(CohortInput::Scores(&scores))?;
    let cohort = status.map(|s| s.as_str()).unwrap_or("all");

    match mean {
        Some(mean) => println!("{cohort}: {mean:.1} ({} voters)", scores.len()),
        None => println!("{cohort}: no scores"),
    }
    Ok(())
}

fn report_summary(stats: &RunStats, dry_run: bool) {
    info!(
        pages = stats.pages,
        processed = stats.processed,
        scored = stats.scored,
        updated = stats.updated,
        errored = stats.errored,
        validation_errors = stats.validation_errors,
        calculation_errors = stats.calculation_errors,
        failed_pages = stats.failed_pages,
        "Run summary"
    );

    if dry_run {
        info!("Dry run complete: {} scores computed, none written", stats.scored);
    } else if stats.is_clean() {
        info!("All {} voters scored and updated", stats.processed);
    } else {
        warn!(
            "Run completed with errors: {} of {} voters updated",
            stats.updated, stats.processed
        );
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM; the run stops before its next page
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, finishing current page"),
        _ = terminate => info!("Received terminate signal, finishing current page"),
    }

    token.cancel();
}
