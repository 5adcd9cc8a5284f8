//! Security analysis over bandit, semgrep, and detect-secrets.
//!
//! The three scanners run concurrently; their findings are collected in a
//! fixed order (bandit, semgrep, detect-secrets), normalized to carry a CWE
//! id and a translated severity, and passed through a syntactic post-filter
//! that suppresses the most common false-positive shapes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{debug, warn};

use crate::analyzers::process::{run_tool, to_relative, ToolError};
use crate::core::config::SecurityConfig;
use crate::core::models::{AnalyzerKind, SecurityFinding, Severity};

/// Security analysis output with per-tool availability.
#[derive(Debug, Clone, Default)]
pub struct SecurityRunResult {
    /// Post-filtered findings: bandit, then semgrep, then detect-secrets
    pub findings: Vec<SecurityFinding>,
    /// `(tool, available)` for every scanner that was enabled
    pub tools_available: Vec<(String, bool)>,
}

// ── Bandit CWE map ──────────────────────────────────────────────

fn bandit_cwe_map() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            // Injection
            ("B608", "CWE-89"),
            ("B609", "CWE-78"),
            ("B602", "CWE-78"),
            ("B603", "CWE-78"),
            ("B604", "CWE-78"),
            ("B605", "CWE-78"),
            ("B606", "CWE-78"),
            ("B607", "CWE-78"),
            ("B601", "CWE-94"),
            // Crypto
            ("B303", "CWE-327"),
            ("B304", "CWE-327"),
            ("B305", "CWE-327"),
            // Hardcoded credentials
            ("B105", "CWE-259"),
            ("B106", "CWE-259"),
            ("B107", "CWE-259"),
            // Other secrets
            ("B104", "CWE-798"),
            ("B108", "CWE-798"),
            // XSS / template injection
            ("B701", "CWE-79"),
            ("B702", "CWE-79"),
            ("B703", "CWE-79"),
            // Input validation
            ("B301", "CWE-20"),
            ("B302", "CWE-20"),
            ("B308", "CWE-20"),
            ("B611", "CWE-20"),
            ("B506", "CWE-20"),
            // Exec
            ("B102", "CWE-94"),
            ("B307", "CWE-94"),
            // Random
            ("B311", "CWE-330"),
            // Try/except pass
            ("B110", "CWE-390"),
            // Assert
            ("B101", "CWE-703"),
        ])
    })
}

fn bandit_severity(raw: &str) -> Severity {
    match raw {
        "HIGH" => Severity::High,
        "LOW" => Severity::Low,
        _ => Severity::Medium,
    }
}

fn semgrep_severity(raw: &str) -> Severity {
    match raw {
        "ERROR" => Severity::High,
        "INFO" => Severity::Low,
        _ => Severity::Medium,
    }
}

/// Secret-type severity; unknown types default to high.
fn detect_secrets_severity(secret_type: &str) -> Severity {
    match secret_type {
        "Hex High Entropy String" | "Base64 High Entropy String" => Severity::Medium,
        _ => Severity::High,
    }
}

// ── Post-filter heuristics ──────────────────────────────────────

// Bandit test IDs for hardcoded credential checks (CWE-259)
const CWE259_CODES: &[&str] = &["B105", "B106", "B107"];

// Source-line shapes that indicate a non-credential context: comparisons,
// dict lookups, env reads, empty/None defaults, truthiness and length checks
fn cwe259_fp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)[!=]=|\.get\s*\(|\.pop\s*\(|\.setdefault\s*\(|getenv\s*\(|environ\b|=\s*["']["']|=\s*None\b|\bif\s+|\bassert\b|\braise\b|\blen\s*\("#,
        )
        .unwrap()
    })
}

// Context words that indicate non-cryptographic use of random()
fn random_benign_context_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)jitter|retry|backoff|sleep").unwrap())
}

// File-name patterns indicating demo/test/seed data
fn random_benign_files_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(^|/)demo|seed|test").unwrap())
}

/// Remove likely false positives based on source context and configuration.
pub fn filter_findings(
    findings: Vec<SecurityFinding>,
    config: &SecurityConfig,
) -> Vec<SecurityFinding> {
    findings
        .into_iter()
        .filter(|f| {
            if config.bandit_skip.iter().any(|code| code == &f.code) {
                return false;
            }

            if CWE259_CODES.contains(&f.code.as_str()) && cwe259_fp_re().is_match(&f.source_line)
            {
                return false;
            }

            if f.code == "B311" {
                if random_benign_files_re().is_match(&f.file_path) {
                    return false;
                }
                if random_benign_context_re().is_match(&f.source_line) {
                    return false;
                }
            }

            true
        })
        .collect()
}

/// Build the exclusion matcher for detect-secrets input files.
///
/// A trailing `/` marks a directory prefix and becomes `<pattern>*`; a
/// leading `**/` additionally matches at the repository root.
fn build_exclusion_set(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let effective = if pattern.ends_with('/') {
            format!("{pattern}*")
        } else {
            pattern.clone()
        };
        if let Ok(glob) = Glob::new(&effective) {
            builder.add(glob);
        }
        if let Some(stripped) = effective.strip_prefix("**/") {
            if let Ok(glob) = Glob::new(stripped) {
                builder.add(glob);
            }
        }
    }
    builder.build().ok()
}

/// Remove excluded files before passing the list to detect-secrets.
fn filter_files_for_detect_secrets(
    abs_files: &[String],
    repo_path: &Path,
    exclude_patterns: &[String],
) -> Vec<String> {
    let Some(exclusions) = build_exclusion_set(exclude_patterns) else {
        return abs_files.to_vec();
    };
    abs_files
        .iter()
        .filter(|abs| !exclusions.is_match(to_relative(abs, repo_path)))
        .cloned()
        .collect()
}

// ── Scanner runners ─────────────────────────────────────────────

/// Run bandit and parse its JSON output. Returns `(findings, available)`.
async fn run_bandit(
    repo_path: &Path,
    abs_files: &[String],
    timeout_secs: u64,
) -> (Vec<SecurityFinding>, bool) {
    let mut args = vec!["-f", "json", "-q"];
    args.extend(abs_files.iter().map(String::as_str));

    let output = match run_tool("bandit", &args, repo_path, timeout_secs).await {
        Ok(output) => output,
        Err(ToolError::Timeout) => {
            warn!("bandit timed out after {timeout_secs}s");
            return (Vec::new(), true);
        }
        Err(ToolError::NotFound) => {
            warn!("bandit not found on PATH — install with: pip install bandit");
            return (Vec::new(), false);
        }
        Err(ToolError::Io(err)) => {
            debug!("bandit invocation failed: {err}");
            return (Vec::new(), true);
        }
    };

    let payload = if output.stdout.is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    let data: serde_json::Value = match serde_json::from_str(payload) {
        Ok(data) => data,
        Err(_) => {
            debug!("Failed to parse bandit JSON output");
            return (Vec::new(), true);
        }
    };

    let findings = data["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .map(|issue| {
                    let test_id = issue["test_id"].as_str().unwrap_or_default().to_string();
                    SecurityFinding {
                        file_path: to_relative(
                            issue["filename"].as_str().unwrap_or_default(),
                            repo_path,
                        ),
                        line_number: issue["line_number"].as_u64().unwrap_or(0) as u32,
                        column: issue["col_offset"].as_u64().unwrap_or(0) as u32,
                        message: issue["issue_text"].as_str().unwrap_or_default().to_string(),
                        severity: bandit_severity(
                            issue["issue_severity"].as_str().unwrap_or("MEDIUM"),
                        ),
                        analyzer: AnalyzerKind::Bandit,
                        cwe_id: bandit_cwe_map()
                            .get(test_id.as_str())
                            .map(|cwe| (*cwe).to_string())
                            .unwrap_or_default(),
                        confidence: issue["issue_confidence"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                        source_line: issue["code"].as_str().unwrap_or_default().trim().to_string(),
                        code: test_id,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    (findings, true)
}

/// Extract the first CWE ID from a semgrep result.
///
/// Semgrep reports CWEs either as dicts `{"id": "CWE-94", ...}` or as
/// strings `"CWE-94: Code Injection"`.
fn extract_semgrep_cwe(result: &serde_json::Value) -> String {
    let Some(cwe_list) = result["extra"]["metadata"]["cwe"].as_array() else {
        return String::new();
    };
    for item in cwe_list {
        if let Some(id) = item["id"].as_str() {
            if !id.is_empty() {
                return id.to_string();
            }
        }
        if let Some(text) = item.as_str() {
            if text.starts_with("CWE-") {
                return text.split(':').next().unwrap_or(text).to_string();
            }
        }
    }
    String::new()
}

/// Run semgrep and parse its JSON output. Returns `(findings, available)`.
async fn run_semgrep(
    repo_path: &Path,
    abs_files: &[String],
    timeout_secs: u64,
    rules: &str,
) -> (Vec<SecurityFinding>, bool) {
    let mut args = vec!["--json", "--config", rules];
    args.extend(abs_files.iter().map(String::as_str));

    let output = match run_tool("semgrep", &args, repo_path, timeout_secs).await {
        Ok(output) => output,
        Err(ToolError::Timeout) => {
            warn!("semgrep timed out after {timeout_secs}s");
            return (Vec::new(), true);
        }
        Err(ToolError::NotFound) => {
            warn!("semgrep not found on PATH — install with: pip install semgrep");
            return (Vec::new(), false);
        }
        Err(ToolError::Io(err)) => {
            debug!("semgrep invocation failed: {err}");
            return (Vec::new(), true);
        }
    };

    let data: serde_json::Value = match serde_json::from_str(&output.stdout) {
        Ok(data) => data,
        Err(_) => {
            debug!("Failed to parse semgrep JSON output");
            return (Vec::new(), true);
        }
    };

    let findings = data["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .map(|r| SecurityFinding {
                    file_path: to_relative(r["path"].as_str().unwrap_or_default(), repo_path),
                    line_number: r["start"]["line"].as_u64().unwrap_or(0) as u32,
                    column: r["start"]["col"].as_u64().unwrap_or(0) as u32,
                    code: r["check_id"].as_str().unwrap_or_default().to_string(),
                    message: r["extra"]["message"].as_str().unwrap_or_default().to_string(),
                    severity: semgrep_severity(
                        r["extra"]["severity"].as_str().unwrap_or("WARNING"),
                    ),
                    analyzer: AnalyzerKind::Semgrep,
                    cwe_id: extract_semgrep_cwe(r),
                    confidence: String::new(),
                    source_line: String::new(),
                })
                .collect()
        })
        .unwrap_or_default();

    (findings, true)
}

/// Run detect-secrets and parse its JSON output. Returns `(findings, available)`.
async fn run_detect_secrets(
    repo_path: &Path,
    abs_files: &[String],
    timeout_secs: u64,
) -> (Vec<SecurityFinding>, bool) {
    let mut args = vec!["scan"];
    args.extend(abs_files.iter().map(String::as_str));

    let output = match run_tool("detect-secrets", &args, repo_path, timeout_secs).await {
        Ok(output) => output,
        Err(ToolError::Timeout) => {
            warn!("detect-secrets timed out after {timeout_secs}s");
            return (Vec::new(), true);
        }
        Err(ToolError::NotFound) => {
            warn!("detect-secrets not found on PATH — install with: pip install detect-secrets");
            return (Vec::new(), false);
        }
        Err(ToolError::Io(err)) => {
            debug!("detect-secrets invocation failed: {err}");
            return (Vec::new(), true);
        }
    };

    let data: serde_json::Value = match serde_json::from_str(&output.stdout) {
        Ok(data) => data,
        Err(_) => {
            debug!("Failed to parse detect-secrets JSON output");
            return (Vec::new(), true);
        }
    };

    let mut findings = Vec::new();
    if let Some(results) = data["results"].as_object() {
        for (file_path, secrets) in results {
            let Some(secrets) = secrets.as_array() else {
                continue;
            };
            for secret in secrets {
                let secret_type = secret["type"].as_str().unwrap_or_default().to_string();
                findings.push(SecurityFinding {
                    file_path: to_relative(file_path, repo_path),
                    line_number: secret["line_number"].as_u64().unwrap_or(0) as u32,
                    column: 0,
                    message: format!(
                        "Possible secret: {}",
                        if secret_type.is_empty() {
                            "unknown"
                        } else {
                            &secret_type
                        }
                    ),
                    severity: detect_secrets_severity(&secret_type),
                    analyzer: AnalyzerKind::DetectSecrets,
                    cwe_id: "CWE-798".to_string(),
                    confidence: String::new(),
                    source_line: String::new(),
                    code: secret_type,
                });
            }
        }
    }

    (findings, true)
}

// ── Orchestrator ────────────────────────────────────────────────

/// Run all enabled security scanners on the changed Python files.
pub async fn run_security_analysis(
    repo_path: &Path,
    files: &[String],
    config: &SecurityConfig,
    timeout_secs: u64,
) -> SecurityRunResult {
    let abs_files: Vec<String> = files
        .iter()
        .filter(|f| f.ends_with(".py"))
        .map(|f| repo_path.join(f).to_string_lossy().into_owned())
        .collect();
    if abs_files.is_empty() {
        return SecurityRunResult::default();
    }

    let ds_files =
        filter_files_for_detect_secrets(&abs_files, repo_path, &config.detect_secrets_exclude);

    let bandit_fut = async {
        if config.bandit_enabled {
            Some(run_bandit(repo_path, &abs_files, timeout_secs).await)
        } else {
            None
        }
    };
    let semgrep_fut = async {
        if config.semgrep_enabled {
            Some(run_semgrep(repo_path, &abs_files, timeout_secs, &config.semgrep_rules).await)
        } else {
            None
        }
    };
    let secrets_fut = async {
        if config.detect_secrets_enabled {
            if ds_files.is_empty() {
                // Everything excluded counts as a clean, available run.
                Some((Vec::new(), true))
            } else {
                Some(run_detect_secrets(repo_path, &ds_files, timeout_secs).await)
            }
        } else {
            None
        }
    };

    let (bandit, semgrep, secrets) = tokio::join!(bandit_fut, semgrep_fut, secrets_fut);

    let mut result = SecurityRunResult::default();
    for (tool, outcome) in [
        ("bandit", bandit),
        ("semgrep", semgrep),
        ("detect-secrets", secrets),
    ] {
        if let Some((findings, available)) = outcome {
            result.findings.extend(findings);
            result.tools_available.push((tool.to_string(), available));
        }
    }

    result.findings = filter_findings(result.findings, config);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(code: &str, source_line: &str, file_path: &str) -> SecurityFinding {
        SecurityFinding {
            file_path: file_path.into(),
            line_number: 1,
            column: 0,
            code: code.into(),
            message: "test".into(),
            severity: Severity::High,
            analyzer: AnalyzerKind::Bandit,
            cwe_id: String::new(),
            confidence: String::new(),
            source_line: source_line.into(),
        }
    }

    #[test]
    fn hardcoded_credential_comparison_suppressed() {
        let config = SecurityConfig::default();
        let kept = filter_findings(
            vec![finding("B105", "if password != \"\":", "src/auth.py")],
            &config,
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn hardcoded_credential_assignment_kept() {
        let config = SecurityConfig::default();
        let kept = filter_findings(
            vec![finding("B105", "password = \"hunter2\"", "src/auth.py")],
            &config,
        );
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn credential_env_and_lookup_contexts_suppressed() {
        let config = SecurityConfig::default();
        for line in [
            "token = os.getenv(\"TOKEN\")",
            "secret = config.get(\"secret\")",
            "password = \"\"",
            "password = None",
            "assert password",
            "if len(password) < 8:",
        ] {
            let kept = filter_findings(vec![finding("B106", line, "src/auth.py")], &config);
            assert!(kept.is_empty(), "expected suppression for {line:?}");
        }
    }

    #[test]
    fn weak_random_suppressed_in_test_paths_and_benign_context() {
        let config = SecurityConfig::default();

        let kept = filter_findings(
            vec![finding("B311", "x = random.random()", "tests/test_seed.py")],
            &config,
        );
        assert!(kept.is_empty());

        let kept = filter_findings(
            vec![finding("B311", "delay = base + random.random() * jitter", "src/net.py")],
            &config,
        );
        assert!(kept.is_empty());

        let kept = filter_findings(
            vec![finding("B311", "token = random.random()", "src/auth.py")],
            &config,
        );
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn configured_skip_list_applies() {
        let config = SecurityConfig {
            bandit_skip: vec!["B608".to_string()],
            ..Default::default()
        };
        let kept = filter_findings(
            vec![finding("B608", "query = f\"SELECT {x}\"", "src/db.py")],
            &config,
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn exclusion_globs_filter_detect_secrets_input() {
        let repo = Path::new("/repo");
        let files = vec![
            "/repo/src/app.py".to_string(),
            "/repo/tests/test_app.py".to_string(),
            "/repo/pkg/migrations/0001_init.py".to_string(),
        ];
        let patterns = vec!["tests/".to_string(), "**/migrations/".to_string()];

        let kept = filter_files_for_detect_secrets(&files, repo, &patterns);
        assert_eq!(kept, vec!["/repo/src/app.py".to_string()]);
    }

    #[test]
    fn no_patterns_keeps_everything() {
        let repo = Path::new("/repo");
        let files = vec!["/repo/tests/test_app.py".to_string()];
        assert_eq!(filter_files_for_detect_secrets(&files, repo, &[]), files);
    }

    #[test]
    fn semgrep_cwe_extraction_handles_both_shapes() {
        let as_dict = serde_json::json!({
            "extra": {"metadata": {"cwe": [{"id": "CWE-94", "title": "Code Injection"}]}}
        });
        assert_eq!(extract_semgrep_cwe(&as_dict), "CWE-94");

        let as_string = serde_json::json!({
            "extra": {"metadata": {"cwe": ["CWE-89: SQL Injection"]}}
        });
        assert_eq!(extract_semgrep_cwe(&as_string), "CWE-89");

        let missing = serde_json::json!({"extra": {}});
        assert_eq!(extract_semgrep_cwe(&missing), "");
    }

    #[test]
    fn detect_secrets_severity_defaults_high() {
        assert_eq!(detect_secrets_severity("Private Key"), Severity::High);
        assert_eq!(
            detect_secrets_severity("Hex High Entropy String"),
            Severity::Medium
        );
        assert_eq!(detect_secrets_severity("Never Seen Before"), Severity::High);
    }

    #[test]
    fn bandit_cwe_map_covers_credential_codes() {
        let map = bandit_cwe_map();
        assert_eq!(map.get("B105"), Some(&"CWE-259"));
        assert_eq!(map.get("B608"), Some(&"CWE-89"));
        assert_eq!(map.get("B101"), Some(&"CWE-703"));
    }
}
