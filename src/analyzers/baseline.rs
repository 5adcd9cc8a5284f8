//! Test-stability probe: run the suite N times unmutated to flag flaky tests.
//!
//! A test is flaky iff it fails in strictly between 1 and `N-1` runs; a test
//! failing every run is genuinely broken, not flaky. A run that exceeds its
//! timeout contributes the synthetic failure id `__timeout__`.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::analyzers::process::{run_tool, ToolError};
use crate::core::errors::{GavelError, Result};
use crate::core::models::BaselineResult;

/// Synthetic failure identifier recorded for a timed-out run.
pub const TIMEOUT_MARKER: &str = "__timeout__";

/// Run the test suite `run_count` times and identify flaky tests.
pub async fn run_baseline(
    repo_path: &Path,
    test_cmd: &str,
    run_count: u32,
    timeout_per_run: u64,
) -> Result<BaselineResult> {
    let mut all_failures: Vec<BTreeSet<String>> = Vec::with_capacity(run_count as usize);

    for run in 0..run_count {
        let failures = run_tests_once(repo_path, test_cmd, timeout_per_run).await?;
        debug!("baseline run {}/{run_count}: {} failures", run + 1, failures.len());
        all_failures.push(failures);
    }

    let mut all_test_ids: BTreeSet<String> = BTreeSet::new();
    for failures in &all_failures {
        all_test_ids.extend(failures.iter().cloned());
    }

    let flaky: Vec<String> = all_test_ids
        .iter()
        .filter(|test_id| {
            let fail_count = all_failures
                .iter()
                .filter(|failures| failures.contains(*test_id))
                .count() as u32;
            fail_count > 0 && fail_count < run_count
        })
        .cloned()
        .collect();

    let total_failures: usize = all_failures.iter().map(BTreeSet::len).sum();
    let pass_rate = if all_test_ids.is_empty() {
        1.0
    } else {
        let avg_failures = total_failures as f64 / f64::from(run_count.max(1));
        (1.0 - avg_failures / all_test_ids.len() as f64).max(0.0)
    };

    Ok(BaselineResult::new(
        repo_path.to_string_lossy(),
        test_cmd,
        run_count,
        flaky,
        round4(pass_rate),
    ))
}

/// Run the suite once and return the set of failing test identifiers.
async fn run_tests_once(
    repo_path: &Path,
    test_cmd: &str,
    timeout_secs: u64,
) -> Result<BTreeSet<String>> {
    let mut parts: Vec<&str> = test_cmd.split_whitespace().collect();
    let Some(&program) = parts.first() else {
        return Err(GavelError::validation("empty test command"));
    };
    // Verbose output is required to parse per-test identifiers.
    if program == "pytest" && !parts.contains(&"-v") {
        parts.push("-v");
    }

    let args = &parts[1..];
    match run_tool(program, args, repo_path, timeout_secs).await {
        Ok(output) => Ok(parse_test_failures(&output.stdout)),
        Err(ToolError::Timeout) => {
            let mut failures = BTreeSet::new();
            failures.insert(TIMEOUT_MARKER.to_string());
            Ok(failures)
        }
        Err(ToolError::NotFound) => Err(GavelError::ToolNotFound {
            tool: program.to_string(),
        }),
        Err(ToolError::Io(err)) => Err(GavelError::io("test command failed to run", err)),
    }
}

/// Extract failing test ids from verbose output: the token preceding
/// ` FAILED` on each line.
fn parse_test_failures(output: &str) -> BTreeSet<String> {
    let mut failures = BTreeSet::new();
    for line in output.lines() {
        if let Some(prefix) = line.split(" FAILED").next() {
            if prefix != line {
                let test_id = prefix.trim();
                if !test_id.is_empty() {
                    failures.insert(test_id.to_string());
                }
            }
        }
    }
    failures
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failures_from_verbose_output() {
        let output = "\
tests/test_foo.py::test_bar FAILED                               [ 50%]
tests/test_foo.py::test_ok PASSED                                [100%]
tests/test_baz.py::test_qux FAILED
";
        let failures = parse_test_failures(output);
        assert_eq!(failures.len(), 2);
        assert!(failures.contains("tests/test_foo.py::test_bar"));
        assert!(failures.contains("tests/test_baz.py::test_qux"));
    }

    #[test]
    fn parse_failures_ignores_clean_output() {
        assert!(parse_test_failures("all good\n3 passed in 0.1s\n").is_empty());
    }

    #[test]
    fn flaky_classification_boundaries() {
        // Reproduce the classification arithmetic: t_a fails in all 3 runs
        // (broken, not flaky), t_b fails in 2 of 3 (flaky).
        let all_failures: Vec<BTreeSet<String>> = vec![
            ["t_a", "t_b"].iter().map(|s| s.to_string()).collect(),
            ["t_a"].iter().map(|s| s.to_string()).collect(),
            ["t_a", "t_b"].iter().map(|s| s.to_string()).collect(),
        ];
        let run_count = 3u32;

        let mut ids: BTreeSet<String> = BTreeSet::new();
        for f in &all_failures {
            ids.extend(f.iter().cloned());
        }
        let flaky: Vec<&String> = ids
            .iter()
            .filter(|id| {
                let count = all_failures.iter().filter(|f| f.contains(*id)).count() as u32;
                count > 0 && count < run_count
            })
            .collect();

        assert_eq!(flaky, vec!["t_b"]);
    }

    #[tokio::test]
    async fn missing_test_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_baseline(dir.path(), "gavel-no-such-test-runner", 2, 10).await;
        assert!(matches!(result, Err(GavelError::ToolNotFound { .. })));
    }

    #[tokio::test]
    async fn echo_suite_reports_no_flakes() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = run_baseline(dir.path(), "echo all-passing", 3, 10)
            .await
            .unwrap();
        assert!(baseline.flaky_tests.is_empty());
        assert!((baseline.pass_rate - 1.0).abs() < 1e-9);
        assert_eq!(baseline.run_count, 3);
    }
}
