//! External scoring tool execution.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// A fully specified external tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl ToolInvocation {
    pub fn new(program: impl Into<OsString>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command line rendered for logs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a tool call. A failed spawn is reported as an
/// unsuccessful output with the spawn error in `stderr`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn spawn_failure(invocation: &ToolInvocation, error: &std::io::Error) -> Self {
        Self {
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: format!("failed to start {}: {}", invocation.program.to_string_lossy(), error),
        }
    }

    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Runs external tools. Implementations never fail; problems are folded
/// into [`ToolOutput`].
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, invocation: &ToolInvocation) -> ToolOutput;
}

/// Invoker backed by real child processes. Each call blocks until the child exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, invocation: &ToolInvocation) -> ToolOutput {
        debug!("Running {} in {:?}", invocation.display(), invocation.cwd);

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => ToolOutput {
                success: output.status.success(),
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => ToolOutput::spawn_failure(invocation, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_invocation_display() {
        let inv = ToolInvocation::new("python3", "/tmp")
            .arg("ipsae.py")
            .args(["a.pkl", "b.pdb", "10", "10"]);
        assert_eq!(inv.display(), "python3 ipsae.py a.pkl b.pdb 10 10");
    }

    #[tokio::test]
    async fn test_missing_program_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let inv = ToolInvocation::new("explorae-definitely-not-a-real-tool", dir.path());
        let out = ProcessInvoker.invoke(&inv).await;
        assert!(!out.success);
        assert_eq!(out.exit_code, None);
        assert!(out.stderr.contains("failed to start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_streams_and_exit_status() {
        let dir = tempdir().unwrap();
        let inv = ToolInvocation::new("sh", dir.path())
            .arg("-c")
            .arg("echo out; echo err >&2; touch side_effect.txt; exit 3");
        let out = ProcessInvoker.invoke(&inv).await;

        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(dir.path().join("side_effect.txt").exists());
    }
}
