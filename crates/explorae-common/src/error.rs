use std::path::PathBuf;

use thiserror::Error;

/// Setup errors that stop a batch before any run is touched.
#[derive(Debug, Error)]
pub enum ExploraeError {
    #[error("Store file not found: {}", .0.display())]
    StoreNotFound(PathBuf),

    #[error("Runs directory not found: {}", .0.display())]
    RunsRootNotFound(PathBuf),

    #[error("Contact scorer script not found: {}", .0.display())]
    ScorerScriptNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ExploraeError>;
