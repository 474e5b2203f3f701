//! Interface-contact scoring with ipSAE.
//!
//! ipSAE does not print its scores; it writes a summary table named
//! `<structure stem>_<pae>_<dist>.txt` next to where it runs. Each chain
//! pair contributes `asym` lines (one per direction) and a `max` line.

use std::path::{Path, PathBuf};

use explorae_common::{ExploraeError, MetricKind, MetricSet};
use tracing::{debug, error};

use crate::invoker::{ToolInvocation, ToolInvoker};
use crate::locator::ExpectedArtifacts;

/// Token holding the chain-pair type (`max` / `asym`).
const TYPE_TOKEN: usize = 4;
const IPSAE_TOKEN: usize = 5;
const PDOCKQ2_TOKEN: usize = 12;

/// The two metrics produced by one ipSAE run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactScores {
    pub ipsae: Option<f64>,
    pub pdockq2: Option<f64>,
}

impl ContactScores {
    pub fn apply_to(&self, metrics: &mut MetricSet) {
        metrics.set(MetricKind::Ipsae, self.ipsae);
        metrics.set(MetricKind::Pdockq2, self.pdockq2);
    }
}

/// Runs the ipSAE script through an interpreter.
#[derive(Debug, Clone)]
pub struct ContactScorer {
    interpreter: String,
    script: PathBuf,
    pae_cutoff: u32,
    dist_cutoff: u32,
}

impl ContactScorer {
    pub fn new<P: AsRef<Path>>(interpreter: &str, script: P, pae_cutoff: u32, dist_cutoff: u32) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            script: script.as_ref().to_path_buf(),
            pae_cutoff,
            dist_cutoff,
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Nothing can be scored without the script.
    pub fn ensure_available(&self) -> explorae_common::Result<()> {
        if self.script.is_file() {
            Ok(())
        } else {
            Err(ExploraeError::ScorerScriptNotFound(self.script.clone()))
        }
    }

    pub fn invocation(&self, artifacts: &ExpectedArtifacts, workdir: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.interpreter, workdir)
            .arg(&self.script)
            .arg(&artifacts.data)
            .arg(&artifacts.structure)
            .arg(self.pae_cutoff.to_string())
            .arg(self.dist_cutoff.to_string())
    }

    /// `<stem>_<pae:02>_<dist:02>.txt` for the given structure file.
    pub fn summary_file_name(&self, structure: &Path) -> Option<String> {
        let stem = structure.file_stem()?.to_string_lossy();
        Some(format!("{}_{:02}_{:02}.txt", stem, self.pae_cutoff, self.dist_cutoff))
    }

    /// Where the summary may appear: the working directory first, then
    /// next to the structure file.
    pub fn summary_candidates(&self, structure: &Path, workdir: &Path) -> Vec<PathBuf> {
        let Some(name) = self.summary_file_name(structure) else {
            return Vec::new();
        };
        let mut candidates = vec![workdir.join(&name)];
        if let Some(parent) = structure.parent() {
            let beside = parent.join(&name);
            if !candidates.contains(&beside) {
                candidates.push(beside);
            }
        }
        candidates
    }

    /// Run ipSAE in `workdir` and read back its summary. Every failure
    /// leaves both metrics absent.
    pub async fn score(
        &self,
        invoker: &dyn ToolInvoker,
        artifacts: &ExpectedArtifacts,
        workdir: &Path,
    ) -> ContactScores {
        if let Err(e) = self.ensure_available() {
            error!("{}", e);
            return ContactScores::default();
        }

        let invocation = self.invocation(artifacts, workdir);
        let output = invoker.invoke(&invocation).await;
        if !output.success {
            error!(
                "ipSAE failed in {:?} (exit {:?})\nSTDERR: {}",
                workdir, output.exit_code, output.stderr
            );
            return ContactScores::default();
        }

        let candidates = self.summary_candidates(&artifacts.structure, workdir);
        let Some(summary) = candidates.iter().find(|p| p.is_file()) else {
            error!("ipSAE summary not found: {:?}", candidates);
            return ContactScores::default();
        };

        debug!("Reading ipSAE summary {:?}", summary);
        match tokio::fs::read_to_string(summary).await {
            Ok(text) => parse_summary(&text),
            Err(e) => {
                error!("Could not read ipSAE summary {:?}: {}", summary, e);
                ContactScores::default()
            }
        }
    }
}

/// Extract ipSAE / pDockQ2 from a summary table.
///
/// `max` lines are preferred; `asym` lines are only used when no `max` line
/// parsed. Each metric is the maximum over the parsed lines.
pub fn parse_summary(text: &str) -> ContactScores {
    let max_rows = collect_rows(text, |line, tokens| {
        line.contains(" max ") && tokens.get(TYPE_TOKEN) == Some(&"max")
    });
    let rows = if max_rows.is_empty() {
        collect_rows(text, |line, _| line.contains(" asym "))
    } else {
        max_rows
    };

    ContactScores {
        ipsae: max_of(rows.iter().map(|r| r.0)),
        pdockq2: max_of(rows.iter().map(|r| r.1)),
    }
}

fn collect_rows<F>(text: &str, accept: F) -> Vec<(f64, f64)>
where
    F: Fn(&str, &[&str]) -> bool,
{
    text.lines()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if !accept(line, &tokens) {
                return None;
            }
            let ipsae = finite_token(&tokens, IPSAE_TOKEN)?;
            let pdockq2 = finite_token(&tokens, PDOCKQ2_TOKEN)?;
            Some((ipsae, pdockq2))
        })
        .collect()
}

fn finite_token(tokens: &[&str], index: usize) -> Option<f64> {
    tokens
        .get(index)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| match acc {
        Some(best) if best >= v => Some(best),
        _ => Some(v),
    })
}
