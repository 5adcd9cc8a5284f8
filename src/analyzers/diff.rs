//! Git diff extraction and unified-diff parsing.
//!
//! Shells out to the git binary with a zero-context diff and parses the
//! structural lines into per-file change records. Missing binary, timeouts,
//! and repositories without a `HEAD` all degrade instead of erroring.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analyzers::process::{run_tool, ToolError};

/// A single file with its changed line ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the repository root (the post-change side)
    pub path: String,
    /// `(start_line, length)` ranges added, in hunk order
    pub added_lines: Vec<(u32, u32)>,
    /// `(start_line, length)` ranges removed, in hunk order
    pub deleted_lines: Vec<(u32, u32)>,
    /// File was created by this change set
    pub is_new: bool,
    /// File was deleted by this change set
    pub is_deleted: bool,
}

/// Parsed diff for one change set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// File records in diff order
    pub files: Vec<FileChange>,
    /// Change-set lower bound, when given
    pub ref_before: Option<String>,
    /// Change-set upper bound, when given
    pub ref_after: Option<String>,
}

impl DiffResult {
    /// All changed paths, in diff order.
    pub fn file_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Changed Python source paths, in diff order.
    pub fn python_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.path.ends_with(".py"))
            .map(|f| f.path.clone())
            .collect()
    }
}

fn hunk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap())
}

fn diff_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").unwrap())
}

/// Run `git diff --unified=0` for a change set and parse the output.
///
/// Ref semantics: both refs → `before..after`; only `ref_before` →
/// `before..HEAD`; neither → working tree against `HEAD`. When the first
/// invocation fails because no `HEAD` exists yet (fresh repository), falls
/// back to a staged-only diff.
pub async fn parse_diff(
    repo_path: &Path,
    ref_before: Option<&str>,
    ref_after: Option<&str>,
    timeout_secs: u64,
) -> DiffResult {
    let range = match (ref_before, ref_after) {
        (Some(before), Some(after)) => format!("{before}..{after}"),
        (Some(before), None) => format!("{before}..HEAD"),
        _ => "HEAD".to_string(),
    };

    let output = match run_tool(
        "git",
        &["diff", "--unified=0", range.as_str()],
        repo_path,
        timeout_secs,
    )
    .await
    {
        Ok(output) => {
            if !output.success() && output.stderr.contains("HEAD") {
                // Fresh repo without a HEAD commit: diff staged files only.
                match run_tool(
                    "git",
                    &["diff", "--unified=0", "--cached"],
                    repo_path,
                    timeout_secs,
                )
                .await
                {
                    Ok(cached) => cached,
                    Err(_) => return empty_result(ref_before, ref_after),
                }
            } else {
                output
            }
        }
        Err(ToolError::Timeout) => {
            debug!("git diff timed out for {}", repo_path.display());
            return empty_result(ref_before, ref_after);
        }
        Err(ToolError::NotFound) => {
            warn!("git not found on PATH");
            return empty_result(ref_before, ref_after);
        }
        Err(ToolError::Io(err)) => {
            debug!("git diff failed for {}: {err}", repo_path.display());
            return empty_result(ref_before, ref_after);
        }
    };

    let mut result = parse_diff_text(&output.stdout);
    result.ref_before = ref_before.map(ToOwned::to_owned);
    result.ref_after = ref_after.map(ToOwned::to_owned);
    result
}

fn empty_result(ref_before: Option<&str>, ref_after: Option<&str>) -> DiffResult {
    DiffResult {
        files: Vec::new(),
        ref_before: ref_before.map(ToOwned::to_owned),
        ref_after: ref_after.map(ToOwned::to_owned),
    }
}

/// Parse raw unified-diff text directly.
pub fn parse_diff_text(text: &str) -> DiffResult {
    let mut result = DiffResult::default();

    for line in text.lines() {
        if let Some(captures) = diff_file_re().captures(line) {
            result.files.push(FileChange {
                path: captures[2].to_string(),
                ..Default::default()
            });
            continue;
        }

        let Some(current) = result.files.last_mut() else {
            continue;
        };

        if line.starts_with("new file mode") {
            current.is_new = true;
            continue;
        }
        if line.starts_with("deleted file mode") {
            current.is_deleted = true;
            continue;
        }

        if let Some(captures) = hunk_re().captures(line) {
            let old_start: u32 = captures[1].parse().unwrap_or(0);
            let old_count: u32 = captures
                .get(2)
                .map_or(1, |m| m.as_str().parse().unwrap_or(1));
            let new_start: u32 = captures[3].parse().unwrap_or(0);
            let new_count: u32 = captures
                .get(4)
                .map_or(1, |m| m.as_str().parse().unwrap_or(1));

            if old_count > 0 {
                current.deleted_lines.push((old_start, old_count));
            }
            if new_count > 0 {
                current.added_lines.push((new_start, new_count));
            }
        }
    }

    result
}
