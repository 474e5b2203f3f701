//! Scores one run: locate → ipSAE → PRODIGY.

use std::path::Path;
use std::sync::Arc;

use explorae_common::{MetricKind, MetricSet};
use tracing::{info, warn};

use crate::affinity::AffinityEstimator;
use crate::contact::ContactScorer;
use crate::invoker::ToolInvoker;
use crate::locator::{ArtifactLocator, SkipReason};

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The run never reached the scoring tools.
    Skipped(SkipReason),
    /// Artifacts were found; each metric is present only if its tool delivered.
    Scored(MetricSet),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Metrics of the run; all absent when it was skipped.
    pub fn metrics(&self) -> MetricSet {
        match &self.outcome {
            RunOutcome::Scored(metrics) => *metrics,
            RunOutcome::Skipped(_) => MetricSet::absent(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, RunOutcome::Skipped(_))
    }
}

pub struct RunProcessor {
    locator: ArtifactLocator,
    contact: ContactScorer,
    affinity: AffinityEstimator,
    invoker: Arc<dyn ToolInvoker>,
}

impl RunProcessor {
    pub fn new(
        locator: ArtifactLocator,
        contact: ContactScorer,
        affinity: AffinityEstimator,
        invoker: Arc<dyn ToolInvoker>,
    ) -> Self {
        Self { locator, contact, affinity, invoker }
    }

    /// Never fails: every problem degrades to a skip or absent metrics.
    pub async fn process(&self, run_dir: &Path) -> RunReport {
        let run_id = run_id(run_dir);

        let artifacts = match self.locator.locate(run_dir) {
            Ok(a) => a,
            Err(reason) => {
                warn!("{} -> skip", reason);
                return RunReport { run_id, outcome: RunOutcome::Skipped(reason) };
            }
        };

        let mut metrics = MetricSet::absent();

        let contact = self.contact.score(self.invoker.as_ref(), &artifacts, run_dir).await;
        contact.apply_to(&mut metrics);

        let kd = self.affinity.estimate(self.invoker.as_ref(), &artifacts.structure).await;
        metrics.set(MetricKind::ProdigyKd, kd);

        if let Some(v) = metrics.get(MetricKind::Ipsae) {
            info!("ipSAE   : {:.6}", v);
        }
        if let Some(v) = metrics.get(MetricKind::Pdockq2) {
            info!("pDockQ2 : {:.6}", v);
        }
        if let Some(v) = metrics.get(MetricKind::ProdigyKd) {
            info!("PRODIGY Kd (M): {:.3e}", v);
        }

        RunReport { run_id, outcome: RunOutcome::Scored(metrics) }
    }
}

/// Run identifier: the directory name.
pub fn run_id(run_dir: &Path) -> String {
    run_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| run_dir.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::{ToolInvocation, ToolOutput};
    use async_trait::async_trait;
    use std::fs;
    use tempfile::tempdir;

    const MAX_LINE: &str = "A    B     10   10   max    0.82  0.5 0.5 0.6 0.6 0.4 0.3 0.71 100 200 150 5.1 6.2 5.8 80 90 70 75 unrelaxed_model_1";

    /// Stands in for both tools: ipSAE is recognised by its script argument.
    struct FakeTools {
        prodigy_stdout: String,
    }

    #[async_trait]
    impl ToolInvoker for FakeTools {
        async fn invoke(&self, invocation: &ToolInvocation) -> ToolOutput {
            let is_ipsae = invocation
                .args
                .first()
                .map(|a| a.to_string_lossy().ends_with("ipsae.py"))
                .unwrap_or(false);
            if is_ipsae {
                fs::write(invocation.cwd.join("unrelaxed_model_1_10_10.txt"), MAX_LINE).unwrap();
                ToolOutput { success: true, exit_code: Some(0), ..Default::default() }
            } else {
                ToolOutput {
                    success: true,
                    exit_code: Some(0),
                    stdout: self.prodigy_stdout.clone(),
                    ..Default::default()
                }
            }
        }
    }

    fn processor(root: &Path, prodigy_stdout: &str) -> RunProcessor {
        let script = root.join("ipsae.py");
        fs::write(&script, "# stub").unwrap();
        RunProcessor::new(
            ArtifactLocator::default(),
            ContactScorer::new("python3", script, 10, 10),
            AffinityEstimator::new(vec!["prodigy".to_string()], Some("--showall".to_string())),
            Arc::new(FakeTools { prodigy_stdout: prodigy_stdout.to_string() }),
        )
    }

    fn complete_run(root: &Path, id: &str) -> std::path::PathBuf {
        let run = root.join(id);
        fs::create_dir(&run).unwrap();
        fs::write(run.join("ranking_debug.json"), r#"{"order": ["model_1", "model_2"]}"#).unwrap();
        fs::write(run.join("unrelaxed_model_1.pdb"), "ATOM").unwrap();
        fs::write(run.join("result_model_1.pkl"), "pkl").unwrap();
        run
    }

    #[tokio::test]
    async fn test_happy_path_collects_all_three_metrics() {
        let dir = tempdir().unwrap();
        let run = complete_run(dir.path(), "R1");
        let p = processor(dir.path(), "[+] Predicted dissociation constant (M) at 25.0C: 3.4e-07");

        let report = p.process(&run).await;
        assert_eq!(report.run_id, "R1");
        assert_eq!(report.outcome, RunOutcome::Scored(MetricSet::new(Some(0.82), Some(0.71), Some(3.4e-7))));
    }

    #[tokio::test]
    async fn test_unparsable_affinity_keeps_contact_metrics() {
        let dir = tempdir().unwrap();
        let run = complete_run(dir.path(), "R1");
        let p = processor(dir.path(), "[+] Reading structure file\n[+] Parsed 2 chains");

        let metrics = p.process(&run).await.metrics();
        assert_eq!(metrics.get(MetricKind::Ipsae), Some(0.82));
        assert_eq!(metrics.get(MetricKind::Pdockq2), Some(0.71));
        assert_eq!(metrics.get(MetricKind::ProdigyKd), None);
    }

    #[tokio::test]
    async fn test_run_without_ranking_is_skipped_with_absent_metrics() {
        let dir = tempdir().unwrap();
        let run = dir.path().join("R3");
        fs::create_dir(&run).unwrap();
        let p = processor(dir.path(), "");

        let report = p.process(&run).await;
        assert!(report.is_skipped());
        assert!(report.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_missing_structure_is_skipped() {
        let dir = tempdir().unwrap();
        let run = complete_run(dir.path(), "R2");
        fs::remove_file(run.join("unrelaxed_model_1.pdb")).unwrap();
        let p = processor(dir.path(), "");

        let report = p.process(&run).await;
        match report.outcome {
            RunOutcome::Skipped(SkipReason::MissingFiles { structure_present, data_present, .. }) => {
                assert!(!structure_present);
                assert!(data_present);
            }
            other => panic!("expected MissingFiles skip, got {other:?}"),
        }
    }
}
