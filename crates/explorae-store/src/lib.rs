//! explorae-store — the persistent table that accumulates metrics across batches.
//!
//! The store is an `.xlsx` workbook (one selected sheet holds the table) or a
//! delimited text table with a header row. It is read once, updated in memory
//! and written back through a temporary file that is renamed over the
//! original, so the canonical file is never half-written.

mod delimited;
pub mod error;
pub mod merge;
pub mod table;
mod workbook;

pub use error::{Result, StoreError};
pub use merge::{apply_update, merge_into_store, MergeCounts, MergeReport};
pub use table::{is_workbook, SheetSelector, StoreOptions, TabularStore, WriteOutcome};
