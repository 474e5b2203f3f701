//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Aggregate ipSAE, pDockQ2 and PRODIGY Kd for a batch of prediction runs
/// into the master table.
#[derive(Debug, Parser)]
#[command(name = "explorae", version)]
pub struct Cli {
    /// Master table (.xlsx workbook, or CSV/TSV by extension) with one row per interaction
    pub store: PathBuf,

    /// Directory holding one subdirectory per run
    pub runs_root: PathBuf,

    /// Configuration file (defaults to ./explorae.toml when present)
    #[arg(long, short, env = "EXPLORAE_CONFIG")]
    pub config: Option<PathBuf>,
}
