//! End-to-end batch: run directories → metrics → master table.
//!
//! The two scoring tools are replaced by an in-process fake that mimics
//! their observable behaviour (ipSAE summary file, PRODIGY text output).

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use explorae_common::{MetricKind, MetricSet};
use explorae_scoring::{
    run_batch, AffinityEstimator, ArtifactLocator, ContactScorer, RunProcessor, SkipReason,
    ToolInvocation, ToolInvoker, ToolOutput,
};
use explorae_store::{merge_into_store, StoreOptions, TabularStore, WriteOutcome};
use tempfile::tempdir;

const PRODIGY_OK: &str = "[+] Reading structure file: unrelaxed_model_1.pdb\n\
[+] Predicted binding affinity (kcal.mol-1):     -8.8\n\
[+] Predicted dissociation constant (M) at 25.0C:  3.4e-07\n";

struct FakeTools {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolInvoker for FakeTools {
    async fn invoke(&self, invocation: &ToolInvocation) -> ToolOutput {
        let run = invocation.cwd.file_name().unwrap().to_string_lossy().into_owned();
        let is_ipsae = invocation.args.first().map(|a| a.to_string_lossy().ends_with("ipsae.py")) == Some(true);
        self.calls.lock().unwrap().push(format!("{}:{}", run, if is_ipsae { "ipsae" } else { "prodigy" }));

        if is_ipsae {
            let line = match run.as_str() {
                "R1" => "A B 10 10 max 0.82 0 0 0 0 0 0 0.71 x\nA B 10 10 max 0.40 0 0 0 0 0 0 0.20 x",
                _ => "A B 10 10 max 0.30 0 0 0 0 0 0 0.10 x",
            };
            fs::write(invocation.cwd.join("unrelaxed_model_1_10_10.txt"), line).unwrap();
            return ToolOutput { success: true, exit_code: Some(0), ..Default::default() };
        }

        let stdout = if run == "R4" { "[+] No contacts found" } else { PRODIGY_OK };
        ToolOutput { success: true, exit_code: Some(0), stdout: stdout.to_string(), ..Default::default() }
    }
}

fn make_run(root: &Path, id: &str, ranking: Option<&str>, with_structure: bool) {
    let run = root.join(id);
    fs::create_dir_all(&run).unwrap();
    if let Some(json) = ranking {
        fs::write(run.join("ranking_debug.json"), json).unwrap();
    }
    if with_structure {
        fs::write(run.join("unrelaxed_model_1.pdb"), "ATOM").unwrap();
    }
    fs::write(run.join("result_model_1.pkl"), "pkl").unwrap();
}

#[tokio::test]
async fn test_batch_merges_scored_runs_only() {
    let work = tempdir().unwrap();
    let runs = work.path().join("interactions");
    let order = Some(r#"{"order": ["model_1", "model_4"]}"#);
    make_run(&runs, "R4", order, true);
    make_run(&runs, "R1", order, true);
    make_run(&runs, "R2", order, false);
    make_run(&runs, "R3", None, true);

    let script = work.path().join("ipsae.py");
    fs::write(&script, "# stub").unwrap();
    let tools = Arc::new(FakeTools { calls: Mutex::new(Vec::new()) });
    let processor = RunProcessor::new(
        ArtifactLocator::default(),
        ContactScorer::new("python3", &script, 10, 10),
        AffinityEstimator::new(vec!["prodigy".to_string()], Some("--showall".to_string())),
        tools.clone(),
    );

    let outcome = run_batch(&processor, &runs).await.unwrap();

    // Sequential, sorted, each scored run touched once per tool.
    assert_eq!(
        *tools.calls.lock().unwrap(),
        ["R1:ipsae", "R1:prodigy", "R4:ipsae", "R4:prodigy"]
    );
    let ids: Vec<_> = outcome.update.iter().map(|e| e.run_id.as_str()).collect();
    assert_eq!(ids, ["R1", "R4"]);
    assert_eq!(outcome.update.get("R1"), Some(&MetricSet::new(Some(0.82), Some(0.71), Some(3.4e-7))));
    assert_eq!(outcome.update.get("R4").unwrap().get(MetricKind::ProdigyKd), None);

    assert_eq!(outcome.skipped.len(), 2);
    assert!(matches!(outcome.skipped[0], (ref id, SkipReason::MissingFiles { .. }) if id == "R2"));
    assert!(matches!(outcome.skipped[1], (ref id, SkipReason::NoRanking { .. }) if id == "R3"));

    let store = work.path().join("master.csv");
    fs::write(&store, "jobs,target\nR1,KRAS\nR2,EGFR\nR3,TP53\nR4,MYC\n").unwrap();
    // A score recorded by an earlier batch for a now-skipped run.
    let mut table = TabularStore::load(&store, &StoreOptions::default()).unwrap();
    let col = table.ensure_column("ipsae");
    table.set_cell(2, col, "0.66".to_string());
    assert_eq!(table.write_atomic(&store).unwrap(), WriteOutcome::Replaced);

    let report = merge_into_store(&store, &StoreOptions::default(), &outcome.update).unwrap();
    assert_eq!((report.updated, report.missing), (2, 0));

    let table = TabularStore::load(&store, &StoreOptions::default()).unwrap();
    assert_eq!(table.lookup("jobs", "R1", "ipsae"), Some("0.82"));
    assert_eq!(table.lookup("jobs", "R1", "pdockq2"), Some("0.71"));
    assert_eq!(table.lookup("jobs", "R1", "prodigy_kd"), Some("3.4e-7"));
    assert_eq!(table.lookup("jobs", "R2", "ipsae"), Some(""));
    assert_eq!(table.lookup("jobs", "R3", "ipsae"), Some("0.66"));
    assert_eq!(table.lookup("jobs", "R4", "ipsae"), Some("0.3"));
    assert_eq!(table.lookup("jobs", "R4", "prodigy_kd"), Some(""));
    assert_eq!(table.lookup("jobs", "R4", "target"), Some("MYC"));
}
