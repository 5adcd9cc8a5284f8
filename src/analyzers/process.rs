//! Shared subprocess plumbing for analyzer adapters.
//!
//! Every external tool runs through [`run_tool`], which enforces a timeout
//! and classifies the two failure modes the adapters care about: the binary
//! being absent and the invocation running out of time.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Captured output of a completed tool invocation.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    /// Decoded stdout
    pub stdout: String,
    /// Decoded stderr
    pub stderr: String,
    /// Exit code, when the process terminated normally
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Failure modes of a tool invocation.
#[derive(Debug)]
pub(crate) enum ToolError {
    /// Binary not found on PATH
    NotFound,
    /// Invocation exceeded its timeout
    Timeout,
    /// Other spawn or I/O failure
    Io(std::io::Error),
}

/// Run `program` with `args` in `cwd`, killing it after `timeout_secs`.
pub(crate) async fn run_tool(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout_secs: u64,
) -> Result<ToolOutput, ToolError> {
    let future = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), future).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::NotFound);
        }
        Ok(Err(err)) => return Err(ToolError::Io(err)),
        Err(_) => return Err(ToolError::Timeout),
    };

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    })
}

/// Convert an absolute path to repo-relative, leaving it untouched when it
/// does not live under the repository.
pub(crate) fn to_relative(path: &str, repo_path: &Path) -> String {
    PathBuf::from(path)
        .strip_prefix(repo_path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_classified() {
        let result = run_tool(
            "gavel-test-no-such-binary",
            &[],
            Path::new("."),
            5,
        )
        .await;
        assert!(matches!(result, Err(ToolError::NotFound)));
    }

    #[test]
    fn to_relative_strips_repo_prefix() {
        let repo = Path::new("/repo");
        assert_eq!(to_relative("/repo/src/app.py", repo), "src/app.py");
        assert_eq!(to_relative("/elsewhere/app.py", repo), "/elsewhere/app.py");
    }
}
