use anyhow::Context;
use api::{AppState, ServerConfig, core::telemetry};
use clap::{Parser, Subcommand};
use file_store::{IndicatifProgress, reindex::reconcile_all};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bizai-backend", version, about = "Retrieval-augmented chat over uploaded sheets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Rebuild the vector index from the record store and drain the retry queue.
    Reindex,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the environment.
    let dotenv = dotenvy::dotenv();

    telemetry::init();
    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!(error = %err, "ignoring unreadable .env file");
        }
    }

    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::Serve => api::start().await.context("server failed")?,
        Command::Reindex => reindex().await?,
    }
    Ok(())
}

async fn reindex() -> anyhow::Result<()> {
    let server = ServerConfig::from_env().context("invalid server settings")?;
    let state = AppState::from_env(&server)
        .await
        .context("failed to build application state")?;

    let progress = IndicatifProgress::bar(0);
    let report = reconcile_all(&state.catalog, state.reindex.batch, &progress)
        .await
        .context("reindex failed")?;

    info!(
        upserted = report.upserted,
        removed = report.removed,
        failed = report.failed,
        queue_synced = report.queue.synced,
        queue_failed = report.queue.failed,
        "reindex finished"
    );
    if report.failed > 0 || report.queue.failed > 0 {
        anyhow::bail!("{} file(s) could not be reindexed", report.failed + report.queue.failed);
    }
    Ok(())
}
