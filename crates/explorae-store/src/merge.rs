//! Merging a batch's metrics into the store.

use std::path::Path;

use explorae_common::{AggregateUpdate, MetricKind};
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::table::{StoreOptions, TabularStore, WriteOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    /// Runs matched to a store row.
    pub updated: usize,
    /// Runs with no row carrying their identifier.
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub updated: usize,
    pub missing: usize,
    pub write: WriteOutcome,
}

/// Add any missing metric column, filled with empty cells.
pub fn ensure_metric_columns(table: &mut TabularStore) {
    for kind in MetricKind::ALL {
        table.ensure_column(kind.column());
    }
}

/// Apply `update` to the table in memory.
///
/// Only present metrics are written; an absent metric never clears a value
/// recorded by an earlier batch.
pub fn apply_update(table: &mut TabularStore, id_column: &str, update: &AggregateUpdate) -> Result<MergeCounts> {
    let id_index = table
        .column_index(id_column)
        .ok_or_else(|| StoreError::MissingIdColumn(id_column.to_string()))?;
    ensure_metric_columns(table);

    let mut counts = MergeCounts::default();
    for entry in update.iter() {
        let Some(row) = table.find_row(id_index, &entry.run_id) else {
            counts.missing += 1;
            warn!("ID '{}' not found in store", entry.run_id);
            continue;
        };
        for (kind, value) in entry.metrics.present() {
            let column = table.ensure_column(kind.column());
            table.set_cell(row, column, kind.format_value(value));
        }
        counts.updated += 1;
    }
    Ok(counts)
}

/// Load the store at `path`, merge `update`, and write it back atomically.
pub fn merge_into_store(path: &Path, options: &StoreOptions, update: &AggregateUpdate) -> Result<MergeReport> {
    let mut table = TabularStore::load(path, options)?;
    let counts = apply_update(&mut table, &options.id_column, update)?;
    let write = table.write_atomic(path)?;

    if write == WriteOutcome::Replaced {
        info!("Store updated ({} rows, {} missing)", counts.updated, counts.missing);
    }
    Ok(MergeReport { updated: counts.updated, missing: counts.missing, write })
}
