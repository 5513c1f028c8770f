//! Comics ELT - incremental xkcd metadata pipeline

use anyhow::{Context, Result};
use clap::Parser;
use comics_common::logging::{init_logging, LogConfig, LogLevel};
use comics_elt::config::Config;
use comics_elt::db::{self, PgStore};
use comics_elt::extract::resolve_resume_point;
use comics_elt::historical::backfill;
use comics_elt::pipeline::EltPipeline;
use comics_elt::scheduler::Scheduler;
use comics_elt::source::XkcdClient;
use comics_elt::transform::Transformer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "comics-elt")]
#[command(author, version, about = "Incremental ELT pipeline for xkcd comic metadata")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run one extract, load and transform cycle
    Run,

    /// Run cycles on the configured cron schedule until Ctrl-C
    Schedule,

    /// Rebuild the dimension and fact tables from staging
    Transform,

    /// Rebuild staging from the first comic and export it to CSV
    Backfill {
        /// CSV output path (defaults to COMICS_EXPORT_PATH)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the database and show where the next run resumes
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("comics-elt")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = Config::load()?;
    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to the database")?;
    let store = Arc::new(PgStore::new(pool));

    match cli.command {
        Command::Run => {
            let source = Arc::new(XkcdClient::from_config(&config.source)?);
            let report = EltPipeline::new(source, store.clone(), store)
                .with_skip_id(config.source.skip_id)
                .with_chunk_size(config.pipeline.chunk_size)
                .run_once()
                .await?;
            info!(
                run_id = %report.run_id,
                fetched = report.fetched,
                staged = report.staging.rows_written,
                "Run finished"
            );
        },
        Command::Schedule => {
            let schedule = config.pipeline.cron_schedule()?;
            let source = Arc::new(XkcdClient::from_config(&config.source)?);
            let pipeline = EltPipeline::new(source, store.clone(), store)
                .with_skip_id(config.source.skip_id)
                .with_chunk_size(config.pipeline.chunk_size);

            info!(schedule = %config.pipeline.schedule, "Starting scheduler");
            Scheduler::new(Arc::new(pipeline), schedule)
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!(error = %e, "Failed to listen for Ctrl-C");
                    }
                })
                .await;
        },
        Command::Transform => {
            let report = Transformer::new(store.as_ref(), store.as_ref()).run().await?;
            info!(
                staged = report.staged_rows,
                dimension = ?report.dimension,
                fact = ?report.fact,
                "Transform finished"
            );
        },
        Command::Backfill { output } => {
            let output = output.unwrap_or_else(|| config.pipeline.export_path.clone());
            let source = XkcdClient::from_config(&config.source)?;
            let report = backfill(&source, store.as_ref(), config.source.skip_id, &output).await?;
            info!(
                fetched = report.fetched,
                path = %report.path.display(),
                "Backfill finished"
            );
        },
        Command::Status => {
            db::health_check(store.pool()).await?;
            let next = resolve_resume_point(store.as_ref()).await;
            info!(next_comic = next, "Database reachable");
        },
    }

    Ok(())
}
