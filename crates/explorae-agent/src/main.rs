//! Explorae — ipSAE / pDockQ2 / PRODIGY aggregation over prediction runs.
//! Entry point for the `explorae` binary.

mod cli;
mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use explorae_common::ExploraeError;
use explorae_scoring::{run_batch, ProcessInvoker, RunProcessor};
use explorae_store::{is_workbook, merge_into_store, StoreError, TabularStore, WriteOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stdout)
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = Config::resolve(cli.config.as_deref(), &cwd)?;

    run(&cli, &config).await
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let store = absolute(&cli.store, ExploraeError::StoreNotFound(cli.store.clone()))?;
    let runs_root = absolute(&cli.runs_root, ExploraeError::RunsRootNotFound(cli.runs_root.clone()))?;

    let store_options = config.store_options()?;
    let headers = TabularStore::read_headers(&store, &store_options)
        .with_context(|| format!("Failed to read store {}", store.display()))?;
    if !headers.iter().any(|h| *h == store_options.id_column) {
        return Err(StoreError::MissingIdColumn(store_options.id_column.clone()))
            .with_context(|| format!("Cannot merge into {}", store.display()));
    }

    let contact = config.contact_scorer();
    contact.ensure_available()?;

    info!("Store: {}", store.display());
    if is_workbook(&store) {
        info!("Sheet: {}", store_options.sheet);
    }
    info!("Runs:  {}", runs_root.display());
    info!("ipSAE: {} (PAE {}, dist {})", contact.script().display(), config.contact.pae_cutoff, config.contact.dist_cutoff);

    let processor = RunProcessor::new(
        config.locator(),
        contact,
        config.affinity_estimator(),
        Arc::new(ProcessInvoker),
    );
    let batch = run_batch(&processor, &runs_root).await?;

    let report = merge_into_store(&store, &store_options, &batch.update)
        .with_context(|| format!("Failed to update store {}", store.display()))?;
    if let WriteOutcome::Retained(path) = &report.write {
        info!("Merged {} rows ({} missing) into {}", report.updated, report.missing, path.display());
    }
    Ok(())
}

fn absolute(path: &Path, missing: ExploraeError) -> anyhow::Result<std::path::PathBuf> {
    if !path.exists() {
        return Err(missing.into());
    }
    Ok(path.canonicalize()?)
}
