//! Sentinel knowledge oracle.
//!
//! Reads the sibling Sentinel database at `<repo>/.sentinel/sentinel.db` for
//! project risk signals: recorded pitfalls, hot-file churn metrics, and
//! historical co-change partners. The oracle silently stays unavailable when
//! the database is missing or cannot be opened; every query degrades to an
//! empty answer on error. The connection is released on drop.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::core::models::{
    HotFileInfo, MissingCoChange, PitfallMatch, PitfallMatchKind, SentinelSignals,
};

/// Bounded fetch size for the pitfall table.
const PITFALL_FETCH_LIMIT: u32 = 200;

/// Read-only handle onto a repository's Sentinel knowledge database.
pub struct SentinelOracle {
    repo_path: PathBuf,
    conn: Option<Connection>,
}

/// One pitfall row as recorded by Sentinel.
#[derive(Debug, Clone)]
struct PitfallRow {
    id: String,
    description: String,
    severity: String,
    how_to_prevent: String,
    code_pattern: String,
    file_paths: Vec<String>,
}

impl SentinelOracle {
    /// Open the oracle for a repository.
    ///
    /// Never fails: a missing database or failed open simply leaves the
    /// oracle unavailable.
    pub fn open(repo_path: &Path) -> Self {
        let db_path = repo_path.join(".sentinel").join("sentinel.db");
        let conn = if db_path.exists() {
            match Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
                Ok(conn) => Some(conn),
                Err(err) => {
                    debug!("Failed to open Sentinel db at {}: {err}", db_path.display());
                    None
                }
            }
        } else {
            None
        };

        Self {
            repo_path: repo_path.to_path_buf(),
            conn,
        }
    }

    /// Whether a Sentinel database was found and opened.
    pub fn available(&self) -> bool {
        self.conn.is_some()
    }

    /// Query all risk signals for the changed-file list.
    pub fn risk_signals(&self, changed_files: &[String]) -> SentinelSignals {
        if !self.available() {
            return SentinelSignals::default();
        }

        SentinelSignals {
            available: true,
            pitfall_matches: self.match_pitfalls(changed_files),
            hot_files: self.hot_files(changed_files),
            missing_co_changes: self.missing_co_changes(changed_files),
        }
    }

    /// Match recorded pitfalls against the changed files.
    ///
    /// For each pitfall the file-path set is tried first; on a hit one match
    /// is recorded and the pitfall is done. Otherwise the pitfall's source
    /// pattern is compiled (invalid patterns are skipped silently, compiled
    /// ones cached for the call) and searched against each changed file's
    /// contents; the first hit wins.
    fn match_pitfalls(&self, changed_files: &[String]) -> Vec<PitfallMatch> {
        let mut matches = Vec::new();
        let changed_set: HashSet<&str> = changed_files.iter().map(String::as_str).collect();
        let mut pattern_cache: HashMap<String, Option<Regex>> = HashMap::new();

        for pitfall in self.fetch_pitfalls() {
            if let Some(hit) = pitfall
                .file_paths
                .iter()
                .find(|path| changed_set.contains(path.as_str()))
            {
                matches.push(PitfallMatch {
                    pitfall_id: pitfall.id.clone(),
                    description: pitfall.description.clone(),
                    severity: pitfall.severity.clone(),
                    how_to_prevent: pitfall.how_to_prevent.clone(),
                    matched_file: hit.clone(),
                    match_type: PitfallMatchKind::FilePath,
                });
                continue;
            }

            if pitfall.code_pattern.is_empty() {
                continue;
            }
            let regex = pattern_cache
                .entry(pitfall.code_pattern.clone())
                .or_insert_with(|| Regex::new(&pitfall.code_pattern).ok());
            let Some(regex) = regex else {
                continue;
            };

            for file_path in changed_files {
                let full_path = self.repo_path.join(file_path);
                let Ok(bytes) = std::fs::read(&full_path) else {
                    continue;
                };
                let content = String::from_utf8_lossy(&bytes);
                if regex.is_match(&content) {
                    matches.push(PitfallMatch {
                        pitfall_id: pitfall.id.clone(),
                        description: pitfall.description.clone(),
                        severity: pitfall.severity.clone(),
                        how_to_prevent: pitfall.how_to_prevent.clone(),
                        matched_file: file_path.clone(),
                        match_type: PitfallMatchKind::CodePattern,
                    });
                    break;
                }
            }
        }

        matches
    }

    /// Bounded fetch of recorded pitfalls.
    fn fetch_pitfalls(&self) -> Vec<PitfallRow> {
        let Some(conn) = &self.conn else {
            return Vec::new();
        };

        let outcome = conn
            .prepare(
                "SELECT id, description, severity, how_to_prevent, code_pattern, file_paths
                 FROM pitfalls LIMIT ?1",
            )
            .and_then(|mut stmt| {
                let rows = stmt.query_map([PITFALL_FETCH_LIMIT], |row| {
                    let file_paths_json: String = row.get(5).unwrap_or_default();
                    Ok(PitfallRow {
                        id: row.get(0).unwrap_or_default(),
                        description: row.get(1).unwrap_or_default(),
                        severity: row
                            .get(2)
                            .unwrap_or_else(|_| "medium".to_string()),
                        how_to_prevent: row.get(3).unwrap_or_default(),
                        code_pattern: row.get(4).unwrap_or_default(),
                        file_paths: serde_json::from_str(&file_paths_json).unwrap_or_default(),
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            });

        match outcome {
            Ok(pitfalls) => pitfalls,
            Err(err) => {
                debug!("Sentinel pitfall query failed: {err}");
                Vec::new()
            }
        }
    }

    /// Churn records for each changed file that Sentinel tracks.
    fn hot_files(&self, changed_files: &[String]) -> Vec<HotFileInfo> {
        let Some(conn) = &self.conn else {
            return Vec::new();
        };

        let mut hot = Vec::new();
        for file_path in changed_files {
            let row = conn.query_row(
                "SELECT file_path, churn_score, change_count, bug_fix_count, revert_count
                 FROM hot_files WHERE file_path = ?1",
                [file_path],
                |row| {
                    Ok(HotFileInfo {
                        file_path: row.get(0)?,
                        churn_score: row.get(1).unwrap_or(0.0),
                        change_count: row.get(2).unwrap_or(0),
                        bug_fix_count: row.get(3).unwrap_or(0),
                        revert_count: row.get(4).unwrap_or(0),
                    })
                },
            );
            match row {
                Ok(info) => hot.push(info),
                Err(rusqlite::Error::QueryReturnedNoRows) => {}
                Err(err) => {
                    debug!("Sentinel hot-file query failed: {err}");
                    return hot;
                }
            }
        }
        hot
    }

    /// Historical co-change partners absent from the diff, de-duplicated by
    /// partner path and sorted by change count descending (ties broken by
    /// partner path).
    fn missing_co_changes(&self, changed_files: &[String]) -> Vec<MissingCoChange> {
        let Some(conn) = &self.conn else {
            return Vec::new();
        };

        let changed_set: HashSet<&str> = changed_files.iter().map(String::as_str).collect();
        let mut seen_partners: HashSet<String> = HashSet::new();
        let mut missing = Vec::new();

        for file_path in changed_files {
            let outcome = conn
                .prepare(
                    "SELECT file_a, file_b, change_count FROM co_changes
                     WHERE file_a = ?1 OR file_b = ?1",
                )
                .and_then(|mut stmt| {
                    let rows = stmt.query_map([file_path], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u32>(2).unwrap_or(0),
                        ))
                    })?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()
                });

            let rows = match outcome {
                Ok(rows) => rows,
                Err(err) => {
                    debug!("Sentinel co-change query failed: {err}");
                    return missing;
                }
            };

            for (file_a, file_b, change_count) in rows {
                let partner = if file_a == *file_path { file_b } else { file_a };
                if changed_set.contains(partner.as_str()) || seen_partners.contains(&partner) {
                    continue;
                }
                seen_partners.insert(partner.clone());
                missing.push(MissingCoChange {
                    source_file: file_path.clone(),
                    partner_file: partner,
                    change_count,
                });
            }
        }

        missing.sort_by(|a, b| {
            b.change_count
                .cmp(&a.change_count)
                .then_with(|| a.partner_file.cmp(&b.partner_file))
        });
        missing
    }
}
