//! Top-model selection and artifact path resolution for a run directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Placeholder substituted with the top model name in file templates.
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// File naming convention of the upstream prediction pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub ranking_file: String,
    pub structure_template: String,
    pub data_template: String,
}

impl Default for RunLayout {
    fn default() -> Self {
        Self {
            ranking_file: "ranking_debug.json".to_string(),
            structure_template: "unrelaxed_{model}.pdb".to_string(),
            data_template: "result_{model}.pkl".to_string(),
        }
    }
}

impl RunLayout {
    pub fn structure_path(&self, run_dir: &Path, model: &str) -> PathBuf {
        run_dir.join(self.structure_template.replace(MODEL_PLACEHOLDER, model))
    }

    pub fn data_path(&self, run_dir: &Path, model: &str) -> PathBuf {
        run_dir.join(self.data_template.replace(MODEL_PLACEHOLDER, model))
    }
}

#[derive(Debug, Deserialize)]
struct RankingMetadata {
    #[serde(default)]
    order: Option<Vec<String>>,
}

/// Structure and auxiliary data files of a run's top-ranked model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedArtifacts {
    pub top_model: String,
    pub structure: PathBuf,
    pub data: PathBuf,
}

/// Why a run cannot be scored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("no ranking: {} missing or without 'order'", .path.display())]
    NoRanking { path: PathBuf },

    #[error("no ranking: {} unreadable: {message}", .path.display())]
    UnreadableRanking { path: PathBuf, message: String },

    #[error(
        "missing files for {top_model}: structure={structure_present} ({}) data={data_present} ({})",
        .structure.display(),
        .data.display()
    )]
    MissingFiles {
        top_model: String,
        structure: PathBuf,
        structure_present: bool,
        data: PathBuf,
        data_present: bool,
    },
}

/// Resolves the artifacts of a run directory without touching them.
#[derive(Debug, Clone, Default)]
pub struct ArtifactLocator {
    layout: RunLayout,
}

impl ArtifactLocator {
    pub fn new(layout: RunLayout) -> Self {
        Self { layout }
    }

    /// Read the ranking, pick the top model, and check both artifacts exist.
    pub fn locate(&self, run_dir: &Path) -> Result<ExpectedArtifacts, SkipReason> {
        let top_model = self.top_model(run_dir)?;
        let structure = self.layout.structure_path(run_dir, &top_model);
        let data = self.layout.data_path(run_dir, &top_model);

        let structure_present = structure.is_file();
        let data_present = data.is_file();
        if !structure_present || !data_present {
            return Err(SkipReason::MissingFiles {
                top_model,
                structure,
                structure_present,
                data,
                data_present,
            });
        }

        debug!("Top model {} in {:?}", top_model, run_dir);
        Ok(ExpectedArtifacts { top_model, structure, data })
    }

    fn top_model(&self, run_dir: &Path) -> Result<String, SkipReason> {
        let path = run_dir.join(&self.layout.ranking_file);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SkipReason::NoRanking { path });
            }
            Err(e) => {
                return Err(SkipReason::UnreadableRanking { path, message: e.to_string() });
            }
        };

        let ranking: RankingMetadata = serde_json::from_str(&content).map_err(|e| {
            SkipReason::UnreadableRanking { path: path.clone(), message: e.to_string() }
        })?;

        match ranking.order.unwrap_or_default().into_iter().next() {
            Some(model) if !model.is_empty() => Ok(model),
            _ => Err(SkipReason::NoRanking { path }),
        }
    }
}
