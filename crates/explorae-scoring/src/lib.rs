//! Explorae Scoring - per-run metrics extraction.
//!
//! For every run directory produced by the structure-prediction pipeline:
//! 1. Locate the top-ranked model and its artifacts
//! 2. Score the interface with ipSAE (summary file side effect)
//! 3. Estimate binding affinity with PRODIGY (text output)
//! 4. Collect the resulting metric sets across the batch

pub mod locator;
pub mod invoker;
pub mod extract;
pub mod contact;
pub mod affinity;
pub mod processor;
pub mod batch;

pub use affinity::AffinityEstimator;
pub use batch::{run_batch, BatchOutcome};
pub use contact::{ContactScorer, ContactScores};
pub use invoker::{ProcessInvoker, ToolInvocation, ToolInvoker, ToolOutput};
pub use locator::{ArtifactLocator, ExpectedArtifacts, RunLayout, SkipReason};
pub use processor::{RunOutcome, RunProcessor, RunReport};
