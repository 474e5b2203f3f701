//! explorae-common — Shared metric types and errors used across all Explorae crates.

pub mod error;
pub mod metrics;

// Re-export commonly used types
pub use error::{ExploraeError, Result};
pub use metrics::{AggregateUpdate, MetricKind, MetricSet, RunMetrics};
