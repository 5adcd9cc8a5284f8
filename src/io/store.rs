//! SQLite persistence for assessments, mutation cache, baselines, and feedback.
//!
//! One database file per repository. Sessions run with WAL journaling and
//! foreign-key enforcement. The schema is versioned through a meta row and
//! advanced by forward-only migrations; retention pruning deletes child rows
//! before their parent assessments and reclaims space afterwards.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info};

use crate::core::errors::{GavelError, Result};
use crate::core::models::{
    AssessmentReport, BaselineResult, Feedback, MutationResult, StoredAssessment, StoredBaseline,
    StoredFeedback, StoredMutation,
};

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 2;

const BASE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assessments (
    id                TEXT PRIMARY KEY,
    repo_path         TEXT NOT NULL,
    ref_before        TEXT,
    ref_after         TEXT,
    files_changed     TEXT NOT NULL,
    mutation_score    REAL,
    static_issues     INTEGER,
    sentinel_warnings INTEGER,
    baseline_flaky    INTEGER DEFAULT 0,
    grade             TEXT NOT NULL,
    report_json       TEXT NOT NULL,
    created_at        TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS baselines (
    id          TEXT PRIMARY KEY,
    repo_path   TEXT NOT NULL,
    test_cmd    TEXT NOT NULL,
    run_count   INTEGER NOT NULL DEFAULT 3,
    flaky_tests TEXT,
    pass_rate   REAL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS mutation_cache (
    id            TEXT PRIMARY KEY,
    assessment_id TEXT NOT NULL REFERENCES assessments(id),
    file_path     TEXT NOT NULL,
    mutant_id     TEXT NOT NULL,
    operator      TEXT NOT NULL,
    line_number   INTEGER,
    status        TEXT NOT NULL,
    created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS feedback (
    id            TEXT PRIMARY KEY,
    assessment_id TEXT NOT NULL REFERENCES assessments(id),
    outcome       TEXT NOT NULL,
    context       TEXT,
    created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);
";

/// Per-table deletion counts from a retention prune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneCounts {
    /// Deleted assessment rows
    pub assessments: usize,
    /// Deleted baseline rows
    pub baselines: usize,
    /// Deleted mutation-cache rows
    pub mutation_cache: usize,
    /// Deleted feedback rows
    pub feedback: usize,
}

impl PruneCounts {
    /// Total rows deleted across all tables.
    pub fn total(&self) -> usize {
        self.assessments + self.baselines + self.mutation_cache + self.feedback
    }
}

/// Aggregate row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// assessments rows
    pub assessments: i64,
    /// baselines rows
    pub baselines: i64,
    /// mutation_cache rows
    pub mutation_cache: i64,
    /// feedback rows
    pub feedback: i64,
}

/// SQLite-backed storage for gavel data.
pub struct AssessmentStore {
    conn: Connection,
    path: PathBuf,
}

impl AssessmentStore {
    /// Open (or create) the database at `path`, applying pragmas, the base
    /// schema, and any pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GavelError::io(
                    format!("Failed to create store directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        let conn = Connection::open(path).map_err(|e| GavelError::Store {
            message: format!("Cannot open database at {}", path.display()),
            operation: Some("open".to_string()),
            source: Some(e),
        })?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;

        let mut store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored schema version from the meta row.
    pub fn schema_version(&self) -> Result<i64> {
        let value: String = self.conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        value
            .parse()
            .map_err(|_| GavelError::store(format!("Corrupt schema version: {value}")))
    }

    /// Create the base schema and bring the database to [`SCHEMA_VERSION`].
    fn init_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(BASE_SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1')",
            [],
        )?;

        let stored = self.schema_version()?;
        if stored > SCHEMA_VERSION {
            return Err(GavelError::store(format!(
                "Database schema version {stored} is newer than supported {SCHEMA_VERSION}"
            )));
        }
        if stored < SCHEMA_VERSION {
            self.migrate(stored)?;
        }
        Ok(())
    }

    /// Run the forward-only migration chain from `from_version` to the
    /// current version inside a single transaction. Versions without a
    /// registered migration are skipped (no-ops by construction).
    fn migrate(&mut self, from_version: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        for version in from_version..SCHEMA_VERSION {
            if let Some(migration) = migration_for(version) {
                debug!("Running store migration v{} -> v{}", version, version + 1);
                migration(&tx)?;
            }
        }
        tx.execute(
            "UPDATE meta SET value = ?1 WHERE key = 'schema_version'",
            [SCHEMA_VERSION.to_string()],
        )?;
        tx.commit()?;
        info!("Store migrated to schema v{SCHEMA_VERSION}");
        Ok(())
    }

    // ── Assessments ─────────────────────────────────────────────

    /// Persist a report and its child rows as a single transaction.
    pub fn save_assessment(&mut self, report: &AssessmentReport) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO assessments
               (id, repo_path, ref_before, ref_after, files_changed,
                mutation_score, static_issues, sentinel_warnings,
                baseline_flaky, grade, report_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                report.id,
                report.repo_path,
                report.ref_before,
                report.ref_after,
                serde_json::to_string(&report.files_changed)?,
                report.mutation_score,
                report.static_issues as i64,
                report.sentinel_warnings as i64,
                report.baseline_flaky as i64,
                report.overall_grade.as_str(),
                report.to_json(),
                report.created_at,
            ],
        )?;

        for mutation in &report.mutations {
            Self::insert_mutation(&tx, mutation, &report.id)?;
        }
        if let Some(baseline) = &report.baseline {
            Self::insert_baseline(&tx, baseline)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Fetch one assessment by id.
    pub fn get_assessment(&self, assessment_id: &str) -> Result<Option<StoredAssessment>> {
        let row = self.conn.query_row(
            "SELECT id, repo_path, ref_before, ref_after, files_changed,
                    mutation_score, static_issues, sentinel_warnings,
                    baseline_flaky, grade, report_json, created_at
             FROM assessments WHERE id = ?1",
            [assessment_id],
            Self::map_assessment_row,
        );
        match row {
            Ok(assessment) => Ok(Some(assessment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Page through stored assessments, newest first, optionally filtered
    /// by repository path.
    pub fn get_assessments(
        &self,
        limit: u32,
        offset: u32,
        repo_path: Option<&str>,
    ) -> Result<Vec<StoredAssessment>> {
        let mut results = Vec::new();
        if let Some(repo) = repo_path {
            let mut stmt = self.conn.prepare(
                "SELECT id, repo_path, ref_before, ref_after, files_changed,
                        mutation_score, static_issues, sentinel_warnings,
                        baseline_flaky, grade, report_json, created_at
                 FROM assessments WHERE repo_path = ?1
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(params![repo, limit, offset], Self::map_assessment_row)?;
            for row in rows {
                results.push(row?);
            }
        } else {
            let mut stmt = self.conn.prepare(
                "SELECT id, repo_path, ref_before, ref_after, files_changed,
                        mutation_score, static_issues, sentinel_warnings,
                        baseline_flaky, grade, report_json, created_at
                 FROM assessments ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit, offset], Self::map_assessment_row)?;
            for row in rows {
                results.push(row?);
            }
        }
        Ok(results)
    }

    fn map_assessment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredAssessment> {
        let files_json: String = row.get(4)?;
        Ok(StoredAssessment {
            id: row.get(0)?,
            repo_path: row.get(1)?,
            ref_before: row.get(2)?,
            ref_after: row.get(3)?,
            files_changed: serde_json::from_str(&files_json).unwrap_or_default(),
            mutation_score: row.get(5)?,
            static_issues: row.get(6)?,
            sentinel_warnings: row.get(7)?,
            baseline_flaky: row.get(8)?,
            grade: row.get(9)?,
            report_json: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    // ── Mutations ───────────────────────────────────────────────

    fn insert_mutation(
        tx: &Transaction<'_>,
        mutation: &MutationResult,
        assessment_id: &str,
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO mutation_cache
               (id, assessment_id, file_path, mutant_id, operator,
                line_number, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                mutation.id,
                assessment_id,
                mutation.file_path,
                mutation.mutant_id,
                mutation.operator,
                mutation.line_number,
                mutation.status.as_str(),
                mutation.created_at,
            ],
        )?;
        Ok(())
    }

    /// Fetch cached mutation rows for an assessment, ordered by file path.
    pub fn get_mutations(&self, assessment_id: &str) -> Result<Vec<StoredMutation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, assessment_id, file_path, mutant_id, operator,
                    line_number, status, created_at
             FROM mutation_cache WHERE assessment_id = ?1 ORDER BY file_path",
        )?;
        let rows = stmt.query_map([assessment_id], |row| {
            Ok(StoredMutation {
                id: row.get(0)?,
                assessment_id: row.get(1)?,
                file_path: row.get(2)?,
                mutant_id: row.get(3)?,
                operator: row.get(4)?,
                line_number: row.get(5)?,
                status: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // ── Baselines ───────────────────────────────────────────────

    fn insert_baseline(tx: &Transaction<'_>, baseline: &BaselineResult) -> Result<()> {
        tx.execute(
            "INSERT INTO baselines
               (id, repo_path, test_cmd, run_count, flaky_tests, pass_rate, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                baseline.id,
                baseline.repo_path,
                baseline.test_cmd,
                baseline.run_count,
                serde_json::to_string(&baseline.flaky_tests)
                    .map_err(GavelError::from)?,
                baseline.pass_rate,
                baseline.created_at,
            ],
        )?;
        Ok(())
    }

    /// Most recent baseline for a repository, when one exists.
    pub fn get_latest_baseline(&self, repo_path: &str) -> Result<Option<StoredBaseline>> {
        let row = self.conn.query_row(
            "SELECT id, repo_path, test_cmd, run_count, flaky_tests, pass_rate, created_at
             FROM baselines WHERE repo_path = ?1
             ORDER BY created_at DESC LIMIT 1",
            [repo_path],
            |row| {
                let flaky_json: Option<String> = row.get(4)?;
                Ok(StoredBaseline {
                    id: row.get(0)?,
                    repo_path: row.get(1)?,
                    test_cmd: row.get(2)?,
                    run_count: row.get(3)?,
                    flaky_tests: flaky_json
                        .and_then(|json| serde_json::from_str(&json).ok())
                        .unwrap_or_default(),
                    pass_rate: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        );
        match row {
            Ok(baseline) => Ok(Some(baseline)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    // ── Feedback ────────────────────────────────────────────────

    /// Persist one feedback row.
    pub fn save_feedback(&mut self, feedback: &Feedback) -> Result<()> {
        self.conn.execute(
            "INSERT INTO feedback (id, assessment_id, outcome, context, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feedback.id,
                feedback.assessment_id,
                feedback.outcome.as_str(),
                feedback.context,
                feedback.created_at,
            ],
        )?;
        Ok(())
    }

    /// Fetch feedback rows for an assessment, newest first.
    pub fn get_feedback(&self, assessment_id: &str) -> Result<Vec<StoredFeedback>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, assessment_id, outcome, context, created_at
             FROM feedback WHERE assessment_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([assessment_id], |row| {
            let context: Option<String> = row.get(3)?;
            Ok(StoredFeedback {
                id: row.get(0)?,
                assessment_id: row.get(1)?,
                outcome: row.get(2)?,
                context: context.unwrap_or_default(),
                created_at: row.get(4)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // ── Retention ───────────────────────────────────────────────

    /// Delete data older than `retention_days`, child tables first, and
    /// reclaim file space when anything was removed.
    pub fn prune(&mut self, retention_days: u32) -> Result<PruneCounts> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(i64::from(retention_days)))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        let mut counts = PruneCounts::default();
        {
            let tx = self.conn.transaction()?;

            let stale_ids: Vec<String> = {
                let mut stmt =
                    tx.prepare("SELECT id FROM assessments WHERE created_at < ?1")?;
                let rows = stmt.query_map([&cutoff], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };

            if stale_ids.is_empty() {
                // Baselines are keyed by their own timestamp, but with no
                // stale assessments the original short-circuits entirely.
                return Ok(counts);
            }

            let placeholders = vec!["?"; stale_ids.len()].join(",");

            counts.feedback = tx.execute(
                &format!("DELETE FROM feedback WHERE assessment_id IN ({placeholders})"),
                rusqlite::params_from_iter(stale_ids.iter()),
            )?;
            counts.mutation_cache = tx.execute(
                &format!("DELETE FROM mutation_cache WHERE assessment_id IN ({placeholders})"),
                rusqlite::params_from_iter(stale_ids.iter()),
            )?;
            counts.baselines =
                tx.execute("DELETE FROM baselines WHERE created_at < ?1", [&cutoff])?;
            counts.assessments = tx.execute(
                &format!("DELETE FROM assessments WHERE id IN ({placeholders})"),
                rusqlite::params_from_iter(stale_ids.iter()),
            )?;

            tx.commit()?;
        }

        if counts.total() > 0 {
            self.conn.execute_batch("VACUUM;")?;
        }
        Ok(counts)
    }

    // ── Stats ───────────────────────────────────────────────────

    /// Row counts per table.
    pub fn stats(&self) -> Result<StoreStats> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?)
        };
        Ok(StoreStats {
            assessments: count("assessments")?,
            baselines: count("baselines")?,
            mutation_cache: count("mutation_cache")?,
            feedback: count("feedback")?,
        })
    }
}

// ── Migrations ──────────────────────────────────────────────────

type Migration = fn(&Transaction<'_>) -> rusqlite::Result<()>;

/// Migration from `version` to `version + 1`, when one is registered.
fn migration_for(version: i64) -> Option<Migration> {
    match version {
        1 => Some(migrate_v1_to_v2),
        _ => None,
    }
}

/// v1 → v2: query indices for history, drill-down, and retention scans.
fn migrate_v1_to_v2(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_assessments_repo_created
             ON assessments(repo_path, created_at DESC);
         CREATE INDEX IF NOT EXISTS idx_assessments_created
             ON assessments(created_at DESC);
         CREATE INDEX IF NOT EXISTS idx_mutation_cache_assessment
             ON mutation_cache(assessment_id, file_path);
         CREATE INDEX IF NOT EXISTS idx_baselines_repo_created
             ON baselines(repo_path, created_at DESC);
         CREATE INDEX IF NOT EXISTS idx_feedback_assessment
             ON feedback(assessment_id, created_at DESC);",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{
        FeedbackOutcome, Grade, MutantStatus, SentinelSignals,
    };

    fn temp_store() -> (tempfile::TempDir, AssessmentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AssessmentStore::open(dir.path().join(".gavel").join("gavel.db")).unwrap();
        (dir, store)
    }

    fn sample_report(files: Vec<String>) -> AssessmentReport {
        AssessmentReport {
            id: crate::core::models::new_id(),
            repo_path: "/tmp/repo".into(),
            ref_before: None,
            ref_after: None,
            files_changed: files,
            dimensions: vec![],
            overall_score: 85.0,
            overall_grade: Grade::B,
            mutation_score: 90.0,
            static_issues: 2,
            sentinel_warnings: 0,
            baseline_flaky: 0,
            gaps: vec![],
            mutations: vec![],
            static_findings: vec![],
            security_findings: vec![],
            baseline: None,
            sentinel_signals: SentinelSignals::default(),
            created_at: crate::core::models::utc_now(),
        }
    }

    #[test]
    fn open_creates_schema_at_current_version() {
        let (_dir, store) = temp_store();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);

        let mode: String = store
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert!(mode.eq_ignore_ascii_case("wal"));
    }

    #[test]
    fn v1_database_migrates_to_v2_with_indices() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("gavel.db");

        // Seed a v1 database: base tables, version 1, no indices.
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(BASE_SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO meta (key, value) VALUES ('schema_version', '1')",
            [],
        )
        .unwrap();
        drop(conn);

        let store = AssessmentStore::open(&db_path).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);

        let index_count: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'index' AND name LIKE 'idx_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index_count, 5);
    }

    #[test]
    fn save_and_fetch_assessment_round_trip() {
        let (_dir, mut store) = temp_store();
        let report = sample_report(vec!["foo.py".into(), "bar.py".into()]);
        store.save_assessment(&report).unwrap();

        let fetched = store.get_assessment(&report.id).unwrap().unwrap();
        assert_eq!(fetched.repo_path, "/tmp/repo");
        assert_eq!(fetched.grade, "B");
        assert_eq!(fetched.mutation_score, Some(90.0));
        assert_eq!(fetched.files_changed, vec!["foo.py", "bar.py"]);

        let parsed: serde_json::Value = serde_json::from_str(&fetched.report_json).unwrap();
        assert_eq!(parsed["overall_grade"], "B");
    }

    #[test]
    fn assessment_insert_includes_children_transactionally() {
        let (_dir, mut store) = temp_store();
        let mut report = sample_report(vec!["foo.py".into()]);
        report.mutations = vec![
            MutationResult::new("foo.py", "1", "negate", Some(3), MutantStatus::Killed),
            MutationResult::new("foo.py", "2", "remove", None, MutantStatus::Survived),
        ];
        report.baseline = Some(BaselineResult::new(
            "/tmp/repo",
            "pytest",
            3,
            vec!["t_flaky".into()],
            0.95,
        ));
        store.save_assessment(&report).unwrap();

        let mutations = store.get_mutations(&report.id).unwrap();
        assert_eq!(mutations.len(), 2);
        let statuses: Vec<&str> = mutations.iter().map(|m| m.status.as_str()).collect();
        assert!(statuses.contains(&"killed") && statuses.contains(&"survived"));

        let baseline = store.get_latest_baseline("/tmp/repo").unwrap().unwrap();
        assert_eq!(baseline.flaky_tests, vec!["t_flaky"]);
        assert_eq!(baseline.pass_rate, Some(0.95));
    }

    #[test]
    fn pagination_pages_through_history() {
        let (_dir, mut store) = temp_store();
        for i in 0..5 {
            let mut report = sample_report(vec![format!("file{i}.py")]);
            // Distinct timestamps so ordering is deterministic.
            report.created_at = format!("2026-07-0{} 12:00:00", i + 1);
            store.save_assessment(&report).unwrap();
        }

        assert_eq!(store.get_assessments(10, 0, None).unwrap().len(), 5);
        let first_page = store.get_assessments(2, 0, None).unwrap();
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].created_at, "2026-07-05 12:00:00");
        assert_eq!(store.get_assessments(2, 4, None).unwrap().len(), 1);

        let filtered = store
            .get_assessments(10, 0, Some("/other/repo"))
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn feedback_round_trip() {
        let (_dir, mut store) = temp_store();
        let report = sample_report(vec!["foo.py".into()]);
        store.save_assessment(&report).unwrap();

        let feedback = Feedback::new(&report.id, FeedbackOutcome::Accepted, "useful");
        store.save_feedback(&feedback).unwrap();

        let rows = store.get_feedback(&report.id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].outcome, "accepted");
        assert_eq!(rows[0].context, "useful");
    }

    #[test]
    fn feedback_requires_existing_assessment() {
        let (_dir, mut store) = temp_store();
        let feedback = Feedback::new("no-such-id", FeedbackOutcome::Rejected, "");
        assert!(store.save_feedback(&feedback).is_err());
    }

    #[test]
    fn prune_cascades_in_dependency_order() {
        let (_dir, mut store) = temp_store();

        let mut report = sample_report(vec!["foo.py".into()]);
        report.mutations = vec![MutationResult::new(
            "foo.py",
            "1",
            "negate",
            Some(3),
            MutantStatus::Killed,
        )];
        report.baseline = Some(BaselineResult::new("/tmp/repo", "pytest", 3, vec![], 1.0));
        store.save_assessment(&report).unwrap();
        store
            .save_feedback(&Feedback::new(&report.id, FeedbackOutcome::Accepted, ""))
            .unwrap();

        // Age everything by 200 days.
        let old = (chrono::Utc::now() - chrono::Duration::days(200))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        for table in ["assessments", "baselines", "mutation_cache", "feedback"] {
            store
                .conn
                .execute(&format!("UPDATE {table} SET created_at = ?1"), [&old])
                .unwrap();
        }

        let counts = store.prune(90).unwrap();
        assert_eq!(counts.feedback, 1);
        assert_eq!(counts.mutation_cache, 1);
        assert_eq!(counts.baselines, 1);
        assert_eq!(counts.assessments, 1);
        assert!(store.get_assessment(&report.id).unwrap().is_none());
    }

    #[test]
    fn prune_with_nothing_stale_is_a_no_op() {
        let (_dir, mut store) = temp_store();
        let report = sample_report(vec!["foo.py".into()]);
        store.save_assessment(&report).unwrap();

        let counts = store.prune(90).unwrap();
        assert_eq!(counts, PruneCounts::default());
        assert!(store.get_assessment(&report.id).unwrap().is_some());
    }

    #[test]
    fn stats_counts_rows() {
        let (_dir, mut store) = temp_store();
        let stats = store.stats().unwrap();
        assert_eq!(stats.assessments, 0);

        store
            .save_assessment(&sample_report(vec!["foo.py".into()]))
            .unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.assessments, 1);
    }
}
