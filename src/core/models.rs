//! Data model for gavel assessments.
//!
//! Value types shared across the pipeline: findings, mutation and baseline
//! results, Sentinel signals, dimension scores, the assessment report, and
//! the typed rows returned by the store. Persisted rows are immutable;
//! modifications are always expressed as new rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::GavelError;

/// Current UTC timestamp in the store's canonical `%Y-%m-%d %H:%M:%S` format.
pub fn utc_now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Fresh hex UUID for a new row.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Round to one decimal place (the canonical score precision).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ── Enums ───────────────────────────────────────────────────────

/// Letter grade for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    /// 90 and above (default thresholds)
    A,
    /// 75 and above
    B,
    /// 60 and above
    C,
    /// 40 and above
    D,
    /// Below 40
    F,
}

impl Grade {
    /// Map a score to a grade under the given `(a, b, c, d)` thresholds.
    pub fn from_score(score: f64, thresholds: (f64, f64, f64, f64)) -> Self {
        let (a, b, c, d) = thresholds;
        if score >= a {
            Self::A
        } else if score >= b {
            Self::B
        } else if score >= c {
            Self::C
        } else if score >= d {
            Self::D
        } else {
            Self::F
        }
    }

    /// Grade as a single-letter string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a static or security finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must-fix defects
    Critical,
    /// Likely bugs and security-relevant rules
    High,
    /// Default severity
    Medium,
    /// Convention and style
    Low,
    /// Informational notes
    Info,
}

/// Status of a single mutant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutantStatus {
    /// Test suite caught the mutant
    Killed,
    /// Mutant went undetected
    Survived,
    /// Test run exceeded its timeout
    Timeout,
    /// Runner error for this mutant
    Error,
    /// Mutant was not executed
    Skipped,
}

impl MutantStatus {
    /// Status as its stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Killed => "killed",
            Self::Survived => "survived",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

/// Which external analyzer produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyzerKind {
    /// ruff lint findings
    #[serde(rename = "ruff")]
    Ruff,
    /// mypy type-check findings
    #[serde(rename = "mypy")]
    Mypy,
    /// bandit security findings
    #[serde(rename = "bandit")]
    Bandit,
    /// semgrep rule-engine findings
    #[serde(rename = "semgrep")]
    Semgrep,
    /// detect-secrets findings
    #[serde(rename = "detect-secrets")]
    DetectSecrets,
}

impl AnalyzerKind {
    /// Analyzer tag as its stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ruff => "ruff",
            Self::Mypy => "mypy",
            Self::Bandit => "bandit",
            Self::Semgrep => "semgrep",
            Self::DetectSecrets => "detect-secrets",
        }
    }
}

/// What the user did with the assessed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackOutcome {
    /// The assessed change was taken as-is
    Accepted,
    /// The assessed change was discarded
    Rejected,
    /// The assessed change was reworked before landing
    Modified,
}

impl FeedbackOutcome {
    /// Outcome as its stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Modified => "modified",
        }
    }
}

impl FromStr for FeedbackOutcome {
    type Err = GavelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "modified" => Ok(Self::Modified),
            other => Err(GavelError::validation(format!(
                "Invalid outcome '{other}'. Must be: accepted, rejected, or modified"
            ))),
        }
    }
}

// ── Findings ────────────────────────────────────────────────────

/// A single finding from static analysis (ruff or mypy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticFinding {
    /// Path relative to the repository root
    pub file_path: String,
    /// 1-based line number
    pub line_number: u32,
    /// 0 when the tool does not report a column
    pub column: u32,
    /// Analyzer-specific rule code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Derived severity
    pub severity: Severity,
    /// Which tool emitted the finding
    pub analyzer: AnalyzerKind,
}

/// A single finding from a security scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityFinding {
    /// Path relative to the repository root
    pub file_path: String,
    /// 1-based line number
    pub line_number: u32,
    /// 0 when the tool does not report a column
    pub column: u32,
    /// Analyzer-specific rule code (or secret type)
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Translated severity
    pub severity: Severity,
    /// Which scanner emitted the finding
    pub analyzer: AnalyzerKind,
    /// CWE identifier, from the tool or the static mapping table
    #[serde(default)]
    pub cwe_id: String,
    /// Tool-reported confidence, when available
    #[serde(default)]
    pub confidence: String,
    /// Captured source line, used by the false-positive post-filter
    #[serde(default)]
    pub source_line: String,
}

// ── Mutation & baseline results ─────────────────────────────────

/// Result of a single mutation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    /// Row identifier
    pub id: String,
    /// Path of the mutated source file
    pub file_path: String,
    /// Runner-assigned mutant identifier
    pub mutant_id: String,
    /// Mutation operator, `"unknown"` when parsed from the bucket output
    pub operator: String,
    /// Line the mutant targets, when known
    pub line_number: Option<u32>,
    /// Outcome of running the suite against the mutant
    pub status: MutantStatus,
    /// Creation timestamp
    pub created_at: String,
}

impl MutationResult {
    /// New result with a fresh id and timestamp.
    pub fn new(
        file_path: impl Into<String>,
        mutant_id: impl Into<String>,
        operator: impl Into<String>,
        line_number: Option<u32>,
        status: MutantStatus,
    ) -> Self {
        Self {
            id: new_id(),
            file_path: file_path.into(),
            mutant_id: mutant_id.into(),
            operator: operator.into(),
            line_number,
            status,
            created_at: utc_now(),
        }
    }
}

/// Result of the flakiness baseline probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineResult {
    /// Row identifier
    pub id: String,
    /// Repository the probe ran in
    pub repo_path: String,
    /// Test command that was executed
    pub test_cmd: String,
    /// Number of repetitions
    pub run_count: u32,
    /// Tests failing in strictly between 1 and `run_count - 1` runs
    pub flaky_tests: Vec<String>,
    /// `max(0, 1 - avg_failures / unique_failing)`, 4 decimals
    pub pass_rate: f64,
    /// Creation timestamp
    pub created_at: String,
}

impl BaselineResult {
    /// New baseline result with a fresh id and timestamp.
    pub fn new(
        repo_path: impl Into<String>,
        test_cmd: impl Into<String>,
        run_count: u32,
        flaky_tests: Vec<String>,
        pass_rate: f64,
    ) -> Self {
        Self {
            id: new_id(),
            repo_path: repo_path.into(),
            test_cmd: test_cmd.into(),
            run_count,
            flaky_tests,
            pass_rate,
            created_at: utc_now(),
        }
    }
}

// ── Sentinel signal types ───────────────────────────────────────

/// How a pitfall was associated with a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitfallMatchKind {
    /// Equality match against the pitfall's file-path set
    FilePath,
    /// Regex match against the changed file's contents
    CodePattern,
}

/// A Sentinel pitfall matched against a changed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitfallMatch {
    /// Sentinel's pitfall identifier
    pub pitfall_id: String,
    /// What the pitfall is
    pub description: String,
    /// Sentinel-reported severity string
    pub severity: String,
    /// Recorded prevention guidance
    pub how_to_prevent: String,
    /// The changed file that triggered the match
    pub matched_file: String,
    /// Whether the match came from the path set or a code pattern
    pub match_type: PitfallMatchKind,
}

/// Churn metrics for a changed file that Sentinel tracks as hot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotFileInfo {
    /// Path relative to the repository root
    pub file_path: String,
    /// Sentinel churn score
    pub churn_score: f64,
    /// Historical change count
    pub change_count: u32,
    /// Historical bug-fix count
    pub bug_fix_count: u32,
    /// Historical revert count
    pub revert_count: u32,
}

/// A historical co-change partner absent from the current diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCoChange {
    /// Changed file with the co-change history
    pub source_file: String,
    /// Partner file that was not changed
    pub partner_file: String,
    /// Historical co-change count
    pub change_count: u32,
}

/// Risk signals from the Sentinel knowledge oracle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentinelSignals {
    /// Whether a Sentinel database was found and opened
    pub available: bool,
    /// Pitfalls matched against the changed files
    pub pitfall_matches: Vec<PitfallMatch>,
    /// Hot-file records for the changed files
    pub hot_files: Vec<HotFileInfo>,
    /// Co-change partners missing from the diff, by change count descending
    pub missing_co_changes: Vec<MissingCoChange>,
}

// ── Scoring ─────────────────────────────────────────────────────

/// Score for a single assessment dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    /// Display name, e.g. `"Mutation Score"`
    pub name: String,
    /// Raw score in `[0, 100]`, one decimal
    pub raw_score: f64,
    /// Weight in `[0, 1]`
    pub weight: f64,
    /// `raw_score * weight`, zero when not evaluated
    pub weighted_score: f64,
    /// Grade of the raw score
    pub grade: Grade,
    /// Human-readable summary, `"Not evaluated"` when skipped
    pub details: String,
    /// Whether this dimension contributes to the overall score
    pub evaluated: bool,
}

// ── Report ──────────────────────────────────────────────────────

/// Complete multi-metric assessment report.
///
/// Created by a single pipeline invocation, persisted exactly once, never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Report identifier
    pub id: String,
    /// Absolute path of the assessed repository
    pub repo_path: String,
    /// Change-set lower bound, when given
    pub ref_before: Option<String>,
    /// Change-set upper bound, when given
    pub ref_after: Option<String>,
    /// Changed file paths, in diff order
    pub files_changed: Vec<String>,
    /// Dimension scores in canonical order
    pub dimensions: Vec<DimensionScore>,
    /// Weighted average over the evaluated dimensions
    pub overall_score: f64,
    /// Grade of the overall score
    pub overall_grade: Grade,
    /// Raw mutation score (denormalized summary)
    pub mutation_score: f64,
    /// Static finding count (denormalized summary)
    pub static_issues: usize,
    /// Pitfall matches plus hot files (denormalized summary)
    pub sentinel_warnings: usize,
    /// Flaky test count (denormalized summary)
    pub baseline_flaky: usize,
    /// Evaluated dimensions graded C or below, rendered for humans
    pub gaps: Vec<String>,
    /// Raw mutation results for drill-down
    pub mutations: Vec<MutationResult>,
    /// Raw static findings for drill-down
    pub static_findings: Vec<StaticFinding>,
    /// Raw security findings for drill-down
    pub security_findings: Vec<SecurityFinding>,
    /// Baseline probe result, when the stage ran
    pub baseline: Option<BaselineResult>,
    /// Sentinel signals for drill-down
    pub sentinel_signals: SentinelSignals,
    /// Creation timestamp
    pub created_at: String,
}

impl AssessmentReport {
    /// Canonical archival shape: the summary fields without the raw
    /// drill-down payloads, scores rounded to one decimal.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "repo_path": self.repo_path,
            "ref_before": self.ref_before,
            "ref_after": self.ref_after,
            "files_changed": self.files_changed,
            "overall_score": round1(self.overall_score),
            "overall_grade": self.overall_grade.as_str(),
            "dimensions": self.dimensions.iter().map(|d| serde_json::json!({
                "name": d.name,
                "raw_score": round1(d.raw_score),
                "weight": d.weight,
                "weighted_score": round1(d.weighted_score),
                "grade": d.grade.as_str(),
                "details": d.details,
                "evaluated": d.evaluated,
            })).collect::<Vec<_>>(),
            "mutation_score": round1(self.mutation_score),
            "static_issues": self.static_issues,
            "sentinel_warnings": self.sentinel_warnings,
            "baseline_flaky": self.baseline_flaky,
            "gaps": self.gaps,
            "created_at": self.created_at,
        })
    }

    /// Pretty-printed canonical JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value())
            .unwrap_or_else(|_| "{}".to_string())
    }
}

/// User feedback on an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Row identifier
    pub id: String,
    /// Parent assessment
    pub assessment_id: String,
    /// What happened to the assessed change
    pub outcome: FeedbackOutcome,
    /// Optional free-form explanation
    pub context: String,
    /// Creation timestamp
    pub created_at: String,
}

impl Feedback {
    /// New feedback row with a fresh id and timestamp.
    pub fn new(
        assessment_id: impl Into<String>,
        outcome: FeedbackOutcome,
        context: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            assessment_id: assessment_id.into(),
            outcome,
            context: context.into(),
            created_at: utc_now(),
        }
    }
}

// ── Stored rows (returned by the store) ─────────────────────────

/// An assessment as persisted in SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAssessment {
    /// Report identifier
    pub id: String,
    /// Repository path
    pub repo_path: String,
    /// Change-set lower bound
    pub ref_before: Option<String>,
    /// Change-set upper bound
    pub ref_after: Option<String>,
    /// Changed files, deserialized from the JSON column
    pub files_changed: Vec<String>,
    /// Denormalized mutation score
    pub mutation_score: Option<f64>,
    /// Denormalized static issue count
    pub static_issues: Option<i64>,
    /// Denormalized sentinel warning count
    pub sentinel_warnings: Option<i64>,
    /// Denormalized flaky test count
    pub baseline_flaky: i64,
    /// Overall grade letter
    pub grade: String,
    /// Canonical archival JSON
    pub report_json: String,
    /// Creation timestamp
    pub created_at: String,
}

/// A mutation cache entry as persisted in SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMutation {
    /// Row identifier
    pub id: String,
    /// Parent assessment
    pub assessment_id: String,
    /// Mutated source file
    pub file_path: String,
    /// Runner-assigned mutant identifier
    pub mutant_id: String,
    /// Mutation operator
    pub operator: String,
    /// Targeted line, when known
    pub line_number: Option<i64>,
    /// Stored status string
    pub status: String,
    /// Creation timestamp
    pub created_at: String,
}

/// A baseline entry as persisted in SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBaseline {
    /// Row identifier
    pub id: String,
    /// Repository path
    pub repo_path: String,
    /// Test command
    pub test_cmd: String,
    /// Repetition count
    pub run_count: i64,
    /// Flaky tests, deserialized from the JSON column
    pub flaky_tests: Vec<String>,
    /// Pass rate
    pub pass_rate: Option<f64>,
    /// Creation timestamp
    pub created_at: String,
}

/// A feedback entry as persisted in SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFeedback {
    /// Row identifier
    pub id: String,
    /// Parent assessment
    pub assessment_id: String,
    /// Stored outcome string
    pub outcome: String,
    /// Free-form explanation
    pub context: String,
    /// Creation timestamp
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_thresholds_default() {
        let t = (90.0, 75.0, 60.0, 40.0);
        assert_eq!(Grade::from_score(100.0, t), Grade::A);
        assert_eq!(Grade::from_score(90.0, t), Grade::A);
        assert_eq!(Grade::from_score(89.9, t), Grade::B);
        assert_eq!(Grade::from_score(75.0, t), Grade::B);
        assert_eq!(Grade::from_score(60.0, t), Grade::C);
        assert_eq!(Grade::from_score(40.0, t), Grade::D);
        assert_eq!(Grade::from_score(39.9, t), Grade::F);
    }

    #[test]
    fn grade_is_monotone_in_score() {
        let t = (90.0, 75.0, 60.0, 40.0);
        let order = |g: Grade| match g {
            Grade::A => 4,
            Grade::B => 3,
            Grade::C => 2,
            Grade::D => 1,
            Grade::F => 0,
        };
        let mut last = order(Grade::from_score(0.0, t));
        for step in 1..=200 {
            let score = f64::from(step) * 0.5;
            let current = order(Grade::from_score(score, t));
            assert!(current >= last, "grade regressed at score {score}");
            last = current;
        }
    }

    #[test]
    fn feedback_outcome_parses() {
        assert_eq!(
            "accepted".parse::<FeedbackOutcome>().unwrap(),
            FeedbackOutcome::Accepted
        );
        assert!("shipped".parse::<FeedbackOutcome>().is_err());
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(
            serde_json::from_str::<Severity>("\"info\"").unwrap(),
            Severity::Info
        );
    }

    #[test]
    fn report_json_shape() {
        let report = AssessmentReport {
            id: "abc123".into(),
            repo_path: "/tmp/repo".into(),
            ref_before: None,
            ref_after: None,
            files_changed: vec!["a.py".into()],
            dimensions: vec![],
            overall_score: 87.654,
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
            created_at: utc_now(),
        };

        let value = report.to_json_value();
        assert_eq!(value["overall_score"], 87.7);
        assert_eq!(value["overall_grade"], "B");
        assert_eq!(value["files_changed"][0], "a.py");
        assert!(value.get("mutations").is_none());
    }

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
