//! Sequential traversal of all run directories under a root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use explorae_common::AggregateUpdate;
use tracing::info;

use crate::locator::SkipReason;
use crate::processor::{RunOutcome, RunProcessor};

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Runs that reached the scoring stage, in directory name order.
    pub update: AggregateUpdate,
    /// Runs dropped at the locator stage.
    pub skipped: Vec<(String, SkipReason)>,
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn discover_runs(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to list runs directory: {:?}", root))?;

    let mut runs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            runs.push(path);
        }
    }
    runs.sort();
    Ok(runs)
}

/// Process every run one after another. Only listing the root can fail;
/// individual runs never abort the batch.
pub async fn run_batch(processor: &RunProcessor, root: &Path) -> Result<BatchOutcome> {
    let runs = discover_runs(root)?;
    info!("Found {} run directories in {:?}", runs.len(), root);

    let mut outcome = BatchOutcome::default();
    for run_dir in &runs {
        info!("");
        info!("=== {} ===", crate::processor::run_id(run_dir));

        let report = processor.process(run_dir).await;
        match report.outcome {
            RunOutcome::Scored(metrics) => outcome.update.insert(report.run_id, metrics),
            RunOutcome::Skipped(reason) => outcome.skipped.push((report.run_id, reason)),
        }
    }

    info!(
        "Batch complete: {} scored, {} skipped",
        outcome.update.len(),
        outcome.skipped.len()
    );
    Ok(outcome)
}
