//! Mutation testing via the mutmut runner.
//!
//! Each changed Python file gets its own `mutmut run` invocation under a
//! per-file timeout. Results are read preferentially from mutmut's on-disk
//! SQLite result cache; failing that, from the `mutmut results` bucket
//! output (which carries no operator metadata, recorded as `"unknown"`).

use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::analyzers::process::{run_tool, ToolError};
use crate::core::config::TimeoutsConfig;
use crate::core::models::{MutantStatus, MutationResult};

/// Mutation run output with tool availability.
#[derive(Debug, Clone, Default)]
pub struct MutationRunResult {
    /// One entry per mutant, in per-file invocation order
    pub results: Vec<MutationResult>,
    /// True when mutmut was found and executed at least once
    pub tool_available: bool,
}

/// Run mutmut on each changed Python file and collect mutation results.
pub async fn run_mutations(
    repo_path: &Path,
    files: &[String],
    timeouts: &TimeoutsConfig,
) -> MutationRunResult {
    let mut run = MutationRunResult::default();

    for file_path in files {
        if !file_path.ends_with(".py") {
            continue;
        }
        if !repo_path.join(file_path).exists() {
            continue;
        }

        let (results, available) = mutate_single_file(repo_path, file_path, timeouts).await;
        run.results.extend(results);
        if available {
            run.tool_available = true;
        }
    }

    run
}

/// Run mutmut on a single file and parse its results.
async fn mutate_single_file(
    repo_path: &Path,
    file_path: &str,
    timeouts: &TimeoutsConfig,
) -> (Vec<MutationResult>, bool) {
    let args = ["run", "--paths-to-mutate", file_path, "--no-progress"];
    match run_tool("mutmut", &args, repo_path, timeouts.mutation_per_file).await {
        Ok(_) => (
            parse_results(repo_path, file_path, timeouts.mutmut_results).await,
            true,
        ),
        Err(ToolError::Timeout) => (
            vec![MutationResult::new(
                file_path,
                "timeout",
                "all",
                None,
                MutantStatus::Timeout,
            )],
            true,
        ),
        Err(ToolError::NotFound) => {
            warn!("mutmut not found on PATH — install with: pip install mutmut");
            (Vec::new(), false)
        }
        Err(ToolError::Io(err)) => {
            debug!("mutmut failed for {file_path}: {err}");
            (Vec::new(), true)
        }
    }
}

/// Prefer the on-disk result cache; fall back to `mutmut results`.
async fn parse_results(
    repo_path: &Path,
    file_path: &str,
    results_timeout: u64,
) -> Vec<MutationResult> {
    let cache_path = repo_path.join(".mutmut-cache");
    if cache_path.exists() {
        return parse_from_cache(&cache_path, file_path);
    }
    parse_from_command(repo_path, file_path, results_timeout).await
}

/// Read mutants for one source file from mutmut's SQLite cache.
fn parse_from_cache(cache_path: &Path, file_path: &str) -> Vec<MutationResult> {
    let db_path = if cache_path.is_dir() {
        cache_path.join("db.sqlite3")
    } else {
        cache_path.to_path_buf()
    };

    let mut results = Vec::new();
    let conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            debug!("Failed to open mutmut cache at {}: {err}", db_path.display());
            return results;
        }
    };

    let query = "SELECT * FROM mutant WHERE source_file = ?1";
    let outcome = conn.prepare(query).and_then(|mut stmt| {
        let rows = stmt.query_map([file_path], |row| {
            // The cache schema varies across mutmut versions; read every
            // column defensively.
            let mutant_id: i64 = row.get("id").unwrap_or_default();
            let status: String = row
                .get("status")
                .unwrap_or_else(|_| "unknown".to_string());
            let operator: String = row
                .get("operator")
                .unwrap_or_else(|_| "unknown".to_string());
            let line_number: Option<i64> = row.get("line_number").unwrap_or(None);
            Ok(MutationResult::new(
                file_path,
                mutant_id.to_string(),
                operator,
                line_number.and_then(|n| u32::try_from(n).ok()),
                map_mutmut_status(&status),
            ))
        })?;
        for row in rows {
            results.push(row?);
        }
        Ok(())
    });

    if let Err(err) = outcome {
        debug!("Failed to parse mutmut cache at {}: {err}", db_path.display());
    }
    results
}

/// Parse `mutmut results` bucket output (Survived/Killed/Timeout headers
/// followed by comma-separated mutant id lines).
async fn parse_from_command(
    repo_path: &Path,
    file_path: &str,
    timeout_secs: u64,
) -> Vec<MutationResult> {
    let output = match run_tool("mutmut", &["results"], repo_path, timeout_secs).await {
        Ok(output) => output,
        Err(ToolError::Timeout) => {
            debug!("mutmut results timed out for {file_path}");
            return Vec::new();
        }
        Err(_) => {
            debug!("mutmut results unavailable for {file_path}");
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    let mut current_status = MutantStatus::Survived;

    for line in output.stdout.lines() {
        let line = line.trim();
        if line.starts_with("Survived") {
            current_status = MutantStatus::Survived;
        } else if line.starts_with("Killed") {
            current_status = MutantStatus::Killed;
        } else if line.starts_with("Timeout") {
            current_status = MutantStatus::Timeout;
        } else if line.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            for mutant_id in line.split(',') {
                let mutant_id = mutant_id.trim();
                if !mutant_id.is_empty() && mutant_id.chars().all(|c| c.is_ascii_digit()) {
                    results.push(MutationResult::new(
                        file_path,
                        mutant_id,
                        "unknown",
                        None,
                        current_status,
                    ));
                }
            }
        }
    }

    results
}

/// Map a mutmut status string onto the internal status set.
fn map_mutmut_status(status: &str) -> MutantStatus {
    let status = status.to_lowercase();
    if status.contains("killed") || status.contains("ok") {
        MutantStatus::Killed
    } else if status.contains("survived") || status.contains("bad") {
        MutantStatus::Survived
    } else if status.contains("timeout") {
        MutantStatus::Timeout
    } else if status.contains("skipped") {
        MutantStatus::Skipped
    } else {
        MutantStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_mutmut_vocabulary() {
        assert_eq!(map_mutmut_status("ok_killed"), MutantStatus::Killed);
        assert_eq!(map_mutmut_status("bad_survived"), MutantStatus::Survived);
        assert_eq!(map_mutmut_status("TIMEOUT"), MutantStatus::Timeout);
        assert_eq!(map_mutmut_status("skipped"), MutantStatus::Skipped);
        assert_eq!(map_mutmut_status("something-else"), MutantStatus::Error);
    }

    #[test]
    fn cache_parse_reads_mutants_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(".mutmut-cache");
        let conn = Connection::open(&cache).unwrap();
        conn.execute_batch(
            "CREATE TABLE mutant (
                id INTEGER PRIMARY KEY,
                source_file TEXT,
                operator TEXT,
                line_number INTEGER,
                status TEXT
            );
            INSERT INTO mutant VALUES (1, 'src/app.py', 'negate', 12, 'ok_killed');
            INSERT INTO mutant VALUES (2, 'src/app.py', 'remove', 30, 'bad_survived');
            INSERT INTO mutant VALUES (3, 'src/other.py', 'negate', 5, 'ok_killed');",
        )
        .unwrap();
        drop(conn);

        let results = parse_from_cache(&cache, "src/app.py");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].mutant_id, "1");
        assert_eq!(results[0].status, MutantStatus::Killed);
        assert_eq!(results[0].operator, "negate");
        assert_eq!(results[0].line_number, Some(12));
        assert_eq!(results[1].status, MutantStatus::Survived);
    }

    #[test]
    fn cache_parse_handles_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(".mutmut-cache");
        let conn = Connection::open(&cache).unwrap();
        conn.execute_batch(
            "CREATE TABLE mutant (id INTEGER PRIMARY KEY, source_file TEXT, status TEXT);
             INSERT INTO mutant VALUES (7, 'src/app.py', 'ok_killed');",
        )
        .unwrap();
        drop(conn);

        let results = parse_from_cache(&cache, "src/app.py");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].operator, "unknown");
        assert_eq!(results[0].line_number, None);
    }

    #[test]
    fn unreadable_cache_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join(".mutmut-cache");
        std::fs::write(&cache, "not a database").unwrap();
        assert!(parse_from_cache(&cache, "src/app.py").is_empty());
    }

    #[tokio::test]
    async fn non_python_and_missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec!["README.md".to_string(), "ghost.py".to_string()];
        let run = run_mutations(dir.path(), &files, &TimeoutsConfig::default()).await;
        assert!(run.results.is_empty());
        assert!(!run.tool_available);
    }
}
