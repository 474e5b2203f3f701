//! Binding-affinity estimation with PRODIGY.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::extract::{first_found, Strategy};
use crate::invoker::{ToolInvocation, ToolInvoker};

/// Lines of tool output logged when no Kd could be found.
pub const EXCERPT_LINES: usize = 40;

/// Known phrasings of the dissociation constant, most specific first.
/// e.g. "Predicted dissociation constant (M) at 25.0˚C:  1.23e-06"
const KD_PATTERNS: [(&str, &str); 3] = [
    ("dissociation-constant", r"dissociation\s+constant.*?:\s*([0-9.+\-eE]+)"),
    ("kd-val", r"\bkd[_\s]*val\b[^0-9eE+\-]*([0-9.+\-eE]+)"),
    ("kd-molar", r"\bKd\s*\(M\)\s*[:=]\s*([0-9.+\-eE]+)"),
];

pub fn default_strategies() -> Vec<Strategy> {
    KD_PATTERNS
        .into_iter()
        .map(|(name, pattern)| Strategy::new(name, pattern).expect("built-in Kd pattern compiles"))
        .collect()
}

/// Wrapper for the PRODIGY command line.
#[derive(Debug, Clone)]
pub struct AffinityEstimator {
    command: Vec<String>,
    verbose_flag: Option<String>,
    strategies: Vec<Strategy>,
}

impl AffinityEstimator {
    /// `command` is the program followed by any fixed leading arguments.
    pub fn new(command: Vec<String>, verbose_flag: Option<String>) -> Self {
        Self {
            command,
            verbose_flag,
            strategies: default_strategies(),
        }
    }

    /// Replace the extraction chain, e.g. to support another output dialect.
    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn invocation(&self, structure: &Path) -> Option<ToolInvocation> {
        let (program, leading) = self.command.split_first()?;
        let cwd = structure.parent().unwrap_or_else(|| Path::new("."));
        Some(
            ToolInvocation::new(program, cwd)
                .args(leading)
                .args(self.verbose_flag.iter())
                .arg(structure),
        )
    }

    /// Run PRODIGY on the structure and pull the Kd (M) out of its output.
    pub async fn estimate(&self, invoker: &dyn ToolInvoker, structure: &Path) -> Option<f64> {
        if !structure.is_file() {
            warn!("Structure not found for PRODIGY: {:?}", structure);
            return None;
        }
        let Some(invocation) = self.invocation(structure) else {
            warn!("No PRODIGY command configured");
            return None;
        };

        let output = invoker.invoke(&invocation).await;
        if !output.success {
            warn!(
                "PRODIGY failed on {} (exit {:?})\nSTDOUT:\n{}\nSTDERR:\n{}",
                file_name(structure),
                output.exit_code,
                output.stdout,
                output.stderr
            );
            return None;
        }

        let text = output.combined();
        let kd = self.parse_output(&text);
        if kd.is_none() {
            info!(
                "Kd not found in PRODIGY output for {}. Output excerpt:\n{}\n--- end excerpt ---",
                file_name(structure),
                excerpt(&text, EXCERPT_LINES)
            );
        }
        kd
    }

    pub fn parse_output(&self, text: &str) -> Option<f64> {
        let result = first_found(&self.strategies, text);
        for (name, raw) in &result.malformed {
            debug!("Kd pattern {} matched unparsable value {:?}", name, raw);
        }
        result.found.map(|(name, value)| {
            debug!("Kd matched by {}", name);
            value
        })
    }
}

/// First `lines` lines of `text`.
pub fn excerpt(text: &str, lines: usize) -> String {
    text.lines().take(lines).collect::<Vec<_>>().join("\n")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::ToolOutput;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::tempdir;

    fn estimator() -> AffinityEstimator {
        AffinityEstimator::new(vec!["prodigy".to_string()], Some("--showall".to_string()))
    }

    #[test]
    fn test_parses_dissociation_constant_line() {
        let text = "[+] Predicted binding affinity (kcal.mol-1):     -8.8\n\
                    [+] Predicted dissociation constant (M) at 25.0˚C:  3.4e-07\n";
        assert_eq!(estimator().parse_output(text), Some(3.4e-7));
    }

    #[test]
    fn test_parses_alternative_phrasings() {
        assert_eq!(estimator().parse_output("KD_VAL 1.2e-05"), Some(1.2e-5));
        assert_eq!(estimator().parse_output("kd val: 4e-9"), Some(4e-9));
        assert_eq!(estimator().parse_output("Kd (M) = 5.5E-08"), Some(5.5e-8));
    }

    #[test]
    fn test_unrecognised_output_is_absent() {
        assert_eq!(estimator().parse_output("[+] Reading structure file\n[+] Done"), None);
    }

    #[test]
    fn test_malformed_capture_falls_through() {
        let text = "dissociation constant: e\nKd (M) = 2.0e-6";
        assert_eq!(estimator().parse_output(text), Some(2.0e-6));
    }

    #[test]
    fn test_custom_strategy_extends_the_chain() {
        let mut strategies = default_strategies();
        strategies.push(Strategy::new("binding-kd", r"binding\s+kd\s*=\s*([0-9.+\-eE]+)").unwrap());
        let est = estimator().with_strategies(strategies);

        assert_eq!(est.parse_output("Binding Kd = 6.0e-9 M"), Some(6.0e-9));
        assert_eq!(estimator().parse_output("Binding Kd = 6.0e-9 M"), None);
        // Built-in phrasings still take precedence.
        assert_eq!(est.parse_output("Kd (M) = 1e-7\nbinding kd = 6.0e-9"), Some(1e-7));
    }

    #[test]
    fn test_invocation_places_flag_before_structure() {
        let est = AffinityEstimator::new(
            vec!["python3".to_string(), "cli.py".to_string()],
            Some("--showall".to_string()),
        );
        let inv = est.invocation(Path::new("/runs/R1/unrelaxed_model_1.pdb")).unwrap();
        assert_eq!(inv.display(), "python3 cli.py --showall /runs/R1/unrelaxed_model_1.pdb");
        assert_eq!(inv.cwd, Path::new("/runs/R1"));
    }

    #[test]
    fn test_excerpt_limits_lines() {
        let text: String = (0..100).map(|i| format!("line {i}\n")).collect();
        let head = excerpt(&text, EXCERPT_LINES);
        assert_eq!(head.lines().count(), 40);
        assert!(head.ends_with("line 39"));
    }

    struct Replies(ToolOutput);

    #[async_trait]
    impl ToolInvoker for Replies {
        async fn invoke(&self, _invocation: &ToolInvocation) -> ToolOutput {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_estimate_searches_stderr_too() {
        let dir = tempdir().unwrap();
        let pdb = dir.path().join("unrelaxed_model_1.pdb");
        fs::write(&pdb, "ATOM").unwrap();

        let invoker = Replies(ToolOutput {
            success: true,
            exit_code: Some(0),
            stdout: "[+] Reading structure file".to_string(),
            stderr: "Kd (M) = 7.1e-10".to_string(),
        });
        assert_eq!(estimator().estimate(&invoker, &pdb).await, Some(7.1e-10));
    }

    #[tokio::test]
    async fn test_missing_structure_skips_invocation() {
        struct Unreachable;
        #[async_trait]
        impl ToolInvoker for Unreachable {
            async fn invoke(&self, _invocation: &ToolInvocation) -> ToolOutput {
                panic!("must not be invoked");
            }
        }

        let dir = tempdir().unwrap();
        let pdb = dir.path().join("missing.pdb");
        assert_eq!(estimator().estimate(&Unreachable, &pdb).await, None);
    }

    #[tokio::test]
    async fn test_failed_run_is_absent() {
        let dir = tempdir().unwrap();
        let pdb = dir.path().join("unrelaxed_model_1.pdb");
        fs::write(&pdb, "ATOM").unwrap();

        let invoker = Replies(ToolOutput {
            success: false,
            exit_code: Some(1),
            stdout: "Kd (M) = 7.1e-10".to_string(),
            stderr: "boom".to_string(),
        });
        assert_eq!(estimator().estimate(&invoker, &pdb).await, None);
    }
}
