//! Static analysis aggregation over ruff and mypy.
//!
//! Both tools run on the changed Python files only. Findings are normalized
//! into [`StaticFinding`] records; tool-configuration presence is detected
//! separately so the pipeline can exclude findings from unconfigured tools
//! from scoring while still persisting them.

use std::path::Path;

use tracing::{debug, warn};

use crate::analyzers::process::{run_tool, to_relative, ToolError};
use crate::core::models::{AnalyzerKind, Severity, StaticFinding};

/// Which static tools have project-level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolConfigStatus {
    /// ruff.toml / .ruff.toml / `[tool.ruff]` in pyproject.toml
    pub ruff_configured: bool,
    /// mypy.ini / .mypy.ini / setup.cfg `[mypy]` / `[tool.mypy]`
    pub mypy_configured: bool,
}

/// Static analysis output with tool-configuration info.
#[derive(Debug, Clone, Default)]
pub struct StaticRunResult {
    /// Findings in tool emission order, ruff before mypy
    pub findings: Vec<StaticFinding>,
    /// Configuration presence per tool
    pub tool_config: ToolConfigStatus,
}

/// Detect whether ruff and mypy are configured for this project.
///
/// Checks for dedicated config files and for section-header strings in
/// pyproject.toml / setup.cfg without parsing the TOML.
pub fn detect_tool_config(repo_path: &Path) -> ToolConfigStatus {
    let mut status = ToolConfigStatus::default();

    if repo_path.join("mypy.ini").exists() || repo_path.join(".mypy.ini").exists() {
        status.mypy_configured = true;
    } else {
        let setup_cfg = repo_path.join("setup.cfg");
        if setup_cfg.exists() {
            if let Ok(content) = std::fs::read_to_string(&setup_cfg) {
                if content.contains("[mypy]") {
                    status.mypy_configured = true;
                }
            }
        }
    }

    if repo_path.join("ruff.toml").exists() || repo_path.join(".ruff.toml").exists() {
        status.ruff_configured = true;
    }

    let pyproject = repo_path.join("pyproject.toml");
    if pyproject.exists() {
        if let Ok(content) = std::fs::read_to_string(&pyproject) {
            if !status.mypy_configured && content.contains("[tool.mypy]") {
                status.mypy_configured = true;
            }
            if !status.ruff_configured && content.contains("[tool.ruff]") {
                status.ruff_configured = true;
            }
        }
    }

    status
}

/// Run ruff and mypy on the given files and aggregate their findings.
pub async fn run_static_analysis(
    repo_path: &Path,
    files: &[String],
    timeout_secs: u64,
) -> StaticRunResult {
    let tool_config = detect_tool_config(repo_path);

    let abs_files: Vec<String> = files
        .iter()
        .filter(|f| f.ends_with(".py"))
        .map(|f| repo_path.join(f).to_string_lossy().into_owned())
        .collect();
    if abs_files.is_empty() {
        return StaticRunResult {
            findings: Vec::new(),
            tool_config,
        };
    }

    let mut findings = Vec::new();
    findings.extend(run_ruff(repo_path, &abs_files, timeout_secs).await);
    findings.extend(run_mypy(repo_path, &abs_files, timeout_secs).await);

    StaticRunResult {
        findings,
        tool_config,
    }
}

/// Run ruff and parse its JSON output.
async fn run_ruff(repo_path: &Path, abs_files: &[String], timeout_secs: u64) -> Vec<StaticFinding> {
    let mut args = vec!["check", "--output-format=json", "--no-fix"];
    args.extend(abs_files.iter().map(String::as_str));

    // ruff exits 1 when it finds issues; only the JSON payload matters.
    let output = match run_tool("ruff", &args, repo_path, timeout_secs).await {
        Ok(output) => output,
        Err(ToolError::Timeout) => {
            warn!("ruff timed out after {timeout_secs}s");
            return Vec::new();
        }
        Err(ToolError::NotFound) => {
            warn!("ruff not found on PATH — install with: pip install ruff");
            return Vec::new();
        }
        Err(ToolError::Io(err)) => {
            debug!("ruff invocation failed: {err}");
            return Vec::new();
        }
    };

    let issues: Vec<serde_json::Value> = match serde_json::from_str(&output.stdout) {
        Ok(issues) => issues,
        Err(err) => {
            debug!("Failed to parse ruff JSON output: {err}");
            return Vec::new();
        }
    };

    issues
        .iter()
        .map(|issue| {
            let code = issue["code"].as_str().unwrap_or_default().to_string();
            StaticFinding {
                file_path: to_relative(
                    issue["filename"].as_str().unwrap_or_default(),
                    repo_path,
                ),
                line_number: issue["location"]["row"].as_u64().unwrap_or(0) as u32,
                column: issue["location"]["column"].as_u64().unwrap_or(0) as u32,
                severity: ruff_severity(&code),
                message: issue["message"].as_str().unwrap_or_default().to_string(),
                code,
                analyzer: AnalyzerKind::Ruff,
            }
        })
        .collect()
}

/// Run mypy and parse its colon-delimited output lines.
async fn run_mypy(repo_path: &Path, abs_files: &[String], timeout_secs: u64) -> Vec<StaticFinding> {
    let mut args = vec!["--no-color-output", "--no-error-summary"];
    args.extend(abs_files.iter().map(String::as_str));

    let output = match run_tool("mypy", &args, repo_path, timeout_secs).await {
        Ok(output) => output,
        Err(ToolError::Timeout) => {
            warn!("mypy timed out after {timeout_secs}s");
            return Vec::new();
        }
        Err(ToolError::NotFound) => {
            warn!("mypy not found on PATH — install with: pip install mypy");
            return Vec::new();
        }
        Err(ToolError::Io(err)) => {
            debug!("mypy invocation failed: {err}");
            return Vec::new();
        }
    };

    output
        .stdout
        .lines()
        .filter_map(|line| parse_mypy_line(line, repo_path))
        .collect()
}

/// Parse a single mypy line: `file:line: severity: message [code]`.
fn parse_mypy_line(line: &str, repo_path: &Path) -> Option<StaticFinding> {
    let parts: Vec<&str> = line.splitn(4, ':').collect();
    if parts.len() < 4 {
        return None;
    }

    let file_path = to_relative(parts[0].trim(), repo_path);
    let line_number: u32 = parts[1].trim().parse().ok()?;
    let rest = format!("{}:{}", parts[2].trim(), parts[3]);

    let mut severity = Severity::Medium;
    let mut message = rest.trim().to_string();
    for (prefix, mapped) in [
        ("error", Severity::High),
        ("warning", Severity::Medium),
        ("note", Severity::Info),
    ] {
        if rest.starts_with(prefix) {
            severity = mapped;
            message = rest
                .split_once(':')
                .map_or(rest.trim(), |(_, m)| m.trim())
                .to_string();
            break;
        }
    }

    // Trailing "[code]" marker, when present.
    let mut code = String::new();
    if message.ends_with(']') {
        if let Some(bracket) = message.rfind('[') {
            code = message[bracket + 1..message.len() - 1].to_string();
            message = message[..bracket].trim().to_string();
        }
    }

    Some(StaticFinding {
        file_path,
        line_number,
        column: 0,
        code,
        message,
        severity,
        analyzer: AnalyzerKind::Mypy,
    })
}

/// Map ruff rule codes to severity levels.
fn ruff_severity(code: &str) -> Severity {
    // Security-related rules
    if code.starts_with('S') {
        return Severity::High;
    }
    // Error-prone rules
    if code.starts_with("E9") || code.starts_with('F') {
        return Severity::High;
    }
    // Convention / style
    if code.starts_with('E') || code.starts_with('W') {
        return Severity::Low;
    }
    Severity::Medium
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ruff_severity_by_code_prefix() {
        assert_eq!(ruff_severity("S608"), Severity::High);
        assert_eq!(ruff_severity("F401"), Severity::High);
        assert_eq!(ruff_severity("E902"), Severity::High);
        assert_eq!(ruff_severity("E501"), Severity::Low);
        assert_eq!(ruff_severity("W605"), Severity::Low);
        assert_eq!(ruff_severity("B008"), Severity::Medium);
    }

    #[test]
    fn mypy_line_parses_error_with_code() {
        let repo = Path::new("/repo");
        let finding = parse_mypy_line(
            "/repo/src/app.py:42: error: Incompatible return value type [return-value]",
            repo,
        )
        .unwrap();
        assert_eq!(finding.file_path, "src/app.py");
        assert_eq!(finding.line_number, 42);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.code, "return-value");
        assert_eq!(finding.message, "Incompatible return value type");
        assert_eq!(finding.analyzer, AnalyzerKind::Mypy);
    }

    #[test]
    fn mypy_line_maps_note_to_info() {
        let finding =
            parse_mypy_line("src/app.py:7: note: See docs for details", Path::new("/r")).unwrap();
        assert_eq!(finding.severity, Severity::Info);
        assert_eq!(finding.code, "");
    }

    #[test]
    fn mypy_garbage_lines_are_skipped() {
        let repo = Path::new("/repo");
        assert!(parse_mypy_line("Success: no issues found", repo).is_none());
        assert!(parse_mypy_line("src/app.py:not-a-line: error: nope", repo).is_none());
        assert!(parse_mypy_line("", repo).is_none());
    }

    #[test]
    fn tool_config_detected_from_pyproject() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.ruff]\nline-length = 100\n\n[tool.mypy]\nstrict = true\n",
        )
        .unwrap();

        let status = detect_tool_config(dir.path());
        assert!(status.ruff_configured);
        assert!(status.mypy_configured);
    }

    #[test]
    fn tool_config_detected_from_dedicated_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ruff.toml"), "line-length = 100\n").unwrap();
        std::fs::write(dir.path().join("mypy.ini"), "[mypy]\n").unwrap();

        let status = detect_tool_config(dir.path());
        assert!(status.ruff_configured);
        assert!(status.mypy_configured);
    }

    #[test]
    fn tool_config_absent_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let status = detect_tool_config(dir.path());
        assert!(!status.ruff_configured);
        assert!(!status.mypy_configured);
    }

    #[tokio::test]
    async fn no_python_files_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            run_static_analysis(dir.path(), &["README.md".to_string()], 30).await;
        assert!(result.findings.is_empty());
    }
}
