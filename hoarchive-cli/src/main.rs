mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use hoarchive_ingest::pipeline::{Pipeline, RunMode};
use hoarchive_ingest::reports::RunReport;
use hoarchive_ingest::store::{CuratedStore, FsStore};
use hoarchive_telemetry::init_tracing;

use crate::config::load_app_config;

#[derive(Debug, Parser)]
#[command(name = "hoarchive", about = "Ingest historical basketball statistics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stage the raw CSV sources into persisted staging relations, without promoting.
    Ingest,
    /// Stage and validate without writing anything.
    Validate,
    /// Run the full pipeline and promote curated tables.
    Transform {
        /// Skip sources whose fingerprint is unchanged since the last run.
        #[arg(long)]
        incremental: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let app = load_app_config()?;
    app.pipeline
        .validate()
        .context("invalid pipeline configuration")?;

    let data_dir = app.pipeline.data_dir.clone();
    let store = FsStore::new(&data_dir);
    store
        .health_check()
        .await
        .context("data directory is not writable")?;

    let pipeline = Pipeline::new(Arc::new(app.pipeline), store);

    let shutdown = pipeline.shutdown_tx();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            shutdown.shutdown();
        }
    });

    let report = match cli.command {
        Command::Ingest => pipeline.ingest().await?,
        Command::Validate => pipeline.check().await?,
        Command::Transform { incremental } => {
            let mode = if incremental {
                RunMode::Incremental
            } else {
                RunMode::Full
            };
            pipeline.run(mode).await?
        }
    };

    emit_report(&data_dir, &report)?;
    Ok(())
}

/// Prints the run report to stdout and appends it to the run log directory.
fn emit_report(data_dir: &Path, report: &RunReport) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(report)?;
    println!("{rendered}");

    let runs_dir = data_dir.join("runs");
    std::fs::create_dir_all(&runs_dir)
        .with_context(|| format!("creating {}", runs_dir.display()))?;
    let path = runs_dir.join(format!("{}.json", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
    std::fs::write(&path, &rendered).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "run report written");
    Ok(())
}
