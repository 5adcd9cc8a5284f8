//! Dimension scoring and fusion.
//!
//! All score functions return values in `[0, 100]` rounded to one decimal.
//! Fusion takes the evaluated subset of dimensions, re-normalizes their
//! weights, and maps the weighted average to a grade. Dimensions that were
//! not evaluated contribute zero weight and carry `"Not evaluated"` details.

use crate::core::config::{DimensionWeights, ScoringConfig};
use crate::core::models::{
    new_id, round1, utc_now, AssessmentReport, BaselineResult, DimensionScore, Grade,
    MutantStatus, MutationResult, SecurityFinding, SentinelSignals, StaticFinding,
};

// ── CWE tier weighting ──────────────────────────────────────────

// Tier 0 (0.1x): noise CWEs that are almost always false positives
const CWE_TIER_0: &[&str] = &["CWE-703", "CWE-390"];

// Tier 1 (3x): input validation, XSS, SQLi, log injection
const CWE_TIER_1: &[&str] = &["CWE-20", "CWE-79", "CWE-89", "CWE-117"];

// Tier 2 (2x): OS cmd injection, code injection, hardcoded creds, broken crypto
const CWE_TIER_2: &[&str] = &["CWE-78", "CWE-94", "CWE-259", "CWE-798", "CWE-327"];

/// Multiplier for a CWE ID based on its tier.
pub fn cwe_weight(cwe_id: &str) -> f64 {
    if CWE_TIER_0.contains(&cwe_id) {
        0.1
    } else if CWE_TIER_1.contains(&cwe_id) {
        3.0
    } else if CWE_TIER_2.contains(&cwe_id) {
        2.0
    } else {
        1.0
    }
}

// ── Score computation ───────────────────────────────────────────

/// Convert a baseline result to a 0-100 score.
pub fn compute_baseline_score(baseline: &BaselineResult, scoring: &ScoringConfig) -> f64 {
    let flaky_count = baseline.flaky_tests.len();
    if flaky_count == 0 {
        return 100.0;
    }
    (100.0 - flaky_count as f64 * scoring.baseline_deduction_per_flaky).max(0.0)
}

/// Mutation score as the percentage of killed mutants.
pub fn compute_mutation_score(results: &[MutationResult]) -> f64 {
    if results.is_empty() {
        return 100.0;
    }
    let total = results.len() as f64;
    let killed = results
        .iter()
        .filter(|r| r.status == MutantStatus::Killed)
        .count() as f64;
    round1(killed / total * 100.0)
}

/// Static cleanliness score: severity-weighted issues per file, scaled.
pub fn compute_static_score(
    findings: &[StaticFinding],
    file_count: usize,
    scoring: &ScoringConfig,
) -> f64 {
    if file_count == 0 {
        return 100.0;
    }
    let weighted: f64 = findings
        .iter()
        .map(|f| scoring.severity_weight(f.severity))
        .sum();
    let issues_per_file = weighted / file_count as f64;
    round1((100.0 - issues_per_file * scoring.static_issue_scale_factor).max(0.0))
}

/// Security hygiene score: severity weights with a CWE-tier multiplier
/// applied per finding before summing.
pub fn compute_security_score(
    findings: &[SecurityFinding],
    file_count: usize,
    scoring: &ScoringConfig,
) -> f64 {
    if file_count == 0 {
        return 100.0;
    }
    let weighted: f64 = findings
        .iter()
        .map(|f| scoring.severity_weight(f.severity) * cwe_weight(&f.cwe_id))
        .sum();
    let issues_per_file = weighted / file_count as f64;
    round1((100.0 - issues_per_file * scoring.security_issue_scale_factor).max(0.0))
}

/// Sentinel risk score (0-100, higher = safer).
pub fn compute_risk_score(signals: &SentinelSignals, scoring: &ScoringConfig) -> f64 {
    if !signals.available {
        return 100.0;
    }

    let mut deductions = 0.0;
    for hf in &signals.hot_files {
        deductions += (hf.churn_score / scoring.risk_hot_file_churn_divisor)
            .min(scoring.risk_hot_file_max_deduction);
    }
    deductions += signals.pitfall_matches.len() as f64 * scoring.risk_deduction_per_pitfall;
    deductions +=
        signals.missing_co_changes.len() as f64 * scoring.risk_deduction_per_missing_co_change;

    round1((100.0 - deductions).max(0.0))
}

/// Co-change coverage score: share of expected partners included in the diff.
pub fn compute_co_change_score(signals: &SentinelSignals, changed_files: &[String]) -> f64 {
    if !signals.available {
        return 100.0;
    }

    let missing = signals.missing_co_changes.len();
    let total_partners = changed_files.len() + missing;
    if total_partners == 0 {
        return 100.0;
    }

    round1(changed_files.len() as f64 / total_partners as f64 * 100.0)
}

// ── Fusion ──────────────────────────────────────────────────────

/// Which dimensions actually ran to a meaningful outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluatedDimensions {
    /// Mutation stage ran with the tool present and at least one mutant
    pub mutation: bool,
    /// Static stage ran over at least one source file
    pub static_analysis: bool,
    /// Baseline probe completed
    pub baseline: bool,
    /// Sentinel risk query attempted
    pub sentinel_risk: bool,
    /// Co-change query attempted
    pub co_change: bool,
    /// Security scan attempted with at least one scanner enabled
    pub security: bool,
}

/// Raw inputs for assembling a report.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    /// Absolute repository path
    pub repo_path: String,
    /// Change-set lower bound
    pub ref_before: Option<String>,
    /// Change-set upper bound
    pub ref_after: Option<String>,
    /// Changed files in diff order
    pub files_changed: Vec<String>,
    /// Mutation dimension raw score
    pub mutation_score: f64,
    /// Static dimension raw score
    pub static_score: f64,
    /// Baseline dimension raw score
    pub baseline_score: f64,
    /// Sentinel-risk dimension raw score
    pub sentinel_risk_score: f64,
    /// Co-change dimension raw score
    pub co_change_score: f64,
    /// Security dimension raw score
    pub security_score: f64,
    /// Raw mutation results
    pub mutations: Vec<MutationResult>,
    /// Raw static findings
    pub static_findings: Vec<StaticFinding>,
    /// Raw security findings
    pub security_findings: Vec<SecurityFinding>,
    /// Baseline result, when the probe ran
    pub baseline: Option<BaselineResult>,
    /// Sentinel signals
    pub sentinel_signals: SentinelSignals,
    /// Evaluation flags per dimension
    pub evaluated: EvaluatedDimensions,
}

/// Assemble a complete report from individual dimension scores.
///
/// The overall score only considers evaluated dimensions, re-weighted over
/// their weight sum; with nothing evaluated the overall is 100. The security
/// dimension row is present only when its weight is non-zero (security
/// enabled in configuration).
pub fn build_report(
    inputs: ReportInputs,
    weights: &DimensionWeights,
    scoring: &ScoringConfig,
) -> AssessmentReport {
    let thresholds = scoring.grade_thresholds();
    let ev = inputs.evaluated;

    let mut dimensions = vec![
        score_dimension(
            "Mutation Score",
            inputs.mutation_score,
            weights.mutation,
            mutation_details(&inputs.mutations),
            ev.mutation,
            thresholds,
        ),
        score_dimension(
            "Static Cleanliness",
            inputs.static_score,
            weights.static_analysis,
            static_details(&inputs.static_findings),
            ev.static_analysis,
            thresholds,
        ),
        score_dimension(
            "Test Baseline",
            inputs.baseline_score,
            weights.baseline,
            baseline_details(inputs.baseline.as_ref()),
            ev.baseline,
            thresholds,
        ),
        score_dimension(
            "Sentinel Risk",
            inputs.sentinel_risk_score,
            weights.sentinel_risk,
            sentinel_details(&inputs.sentinel_signals),
            ev.sentinel_risk,
            thresholds,
        ),
        score_dimension(
            "Co-change Coverage",
            inputs.co_change_score,
            weights.co_change,
            cochange_details(&inputs.sentinel_signals),
            ev.co_change,
            thresholds,
        ),
    ];

    if weights.security > 0.0 {
        dimensions.push(score_dimension(
            "Security Hygiene",
            inputs.security_score,
            weights.security,
            security_details(&inputs.security_findings),
            ev.security,
            thresholds,
        ));
    }

    let evaluated_dims: Vec<&DimensionScore> =
        dimensions.iter().filter(|d| d.evaluated).collect();
    let total_weight: f64 = evaluated_dims.iter().map(|d| d.weight).sum();
    let overall_score = if evaluated_dims.is_empty() || total_weight <= 0.0 {
        100.0
    } else {
        evaluated_dims
            .iter()
            .map(|d| d.raw_score * (d.weight / total_weight))
            .sum()
    };

    let overall_grade = Grade::from_score(overall_score, thresholds);
    let gaps = identify_gaps(&dimensions);

    let sentinel_warnings = inputs.sentinel_signals.pitfall_matches.len()
        + inputs.sentinel_signals.hot_files.len();
    let baseline_flaky = inputs
        .baseline
        .as_ref()
        .map_or(0, |b| b.flaky_tests.len());

    AssessmentReport {
        id: new_id(),
        repo_path: inputs.repo_path,
        ref_before: inputs.ref_before,
        ref_after: inputs.ref_after,
        files_changed: inputs.files_changed,
        dimensions,
        overall_score: round1(overall_score),
        overall_grade,
        mutation_score: inputs.mutation_score,
        static_issues: inputs.static_findings.len(),
        sentinel_warnings,
        baseline_flaky,
        gaps,
        mutations: inputs.mutations,
        static_findings: inputs.static_findings,
        security_findings: inputs.security_findings,
        baseline: inputs.baseline,
        sentinel_signals: inputs.sentinel_signals,
        created_at: utc_now(),
    }
}

fn score_dimension(
    name: &str,
    raw_score: f64,
    weight: f64,
    details: String,
    evaluated: bool,
    thresholds: (f64, f64, f64, f64),
) -> DimensionScore {
    if !evaluated {
        return DimensionScore {
            name: name.to_string(),
            raw_score,
            weight,
            weighted_score: 0.0,
            grade: Grade::from_score(raw_score, thresholds),
            details: "Not evaluated".to_string(),
            evaluated: false,
        };
    }
    DimensionScore {
        name: name.to_string(),
        raw_score: round1(raw_score),
        weight,
        weighted_score: round1(raw_score * weight),
        grade: Grade::from_score(raw_score, thresholds),
        details,
        evaluated: true,
    }
}

/// Evaluated dimensions that need attention (grade C or below).
fn identify_gaps(dimensions: &[DimensionScore]) -> Vec<String> {
    dimensions
        .iter()
        .filter(|d| d.evaluated)
        .filter(|d| matches!(d.grade, Grade::C | Grade::D | Grade::F))
        .map(|d| {
            format!(
                "{}: {} ({:.1}%) — {}",
                d.name, d.grade, d.raw_score, d.details
            )
        })
        .collect()
}

// ── Detail formatters ───────────────────────────────────────────

fn mutation_details(mutations: &[MutationResult]) -> String {
    if mutations.is_empty() {
        return "No mutations (skipped or no mutable code)".to_string();
    }
    let total = mutations.len();
    let killed = mutations
        .iter()
        .filter(|m| m.status == MutantStatus::Killed)
        .count();
    format!("{killed}/{total} killed, {} survived", total - killed)
}

fn static_details(findings: &[StaticFinding]) -> String {
    if findings.is_empty() {
        return "No issues found".to_string();
    }
    let mut by_analyzer: std::collections::BTreeMap<&str, usize> =
        std::collections::BTreeMap::new();
    for f in findings {
        *by_analyzer.entry(f.analyzer.as_str()).or_default() += 1;
    }
    by_analyzer
        .iter()
        .map(|(analyzer, count)| format!("{count} {analyzer}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn security_details(findings: &[SecurityFinding]) -> String {
    if findings.is_empty() {
        return "No security findings".to_string();
    }
    let mut by_analyzer: std::collections::BTreeMap<&str, usize> =
        std::collections::BTreeMap::new();
    for f in findings {
        *by_analyzer.entry(f.analyzer.as_str()).or_default() += 1;
    }
    by_analyzer
        .iter()
        .map(|(analyzer, count)| format!("{count} {analyzer}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn baseline_details(baseline: Option<&BaselineResult>) -> String {
    let Some(baseline) = baseline else {
        return "Baseline not run".to_string();
    };
    let flaky = baseline.flaky_tests.len();
    if flaky == 0 {
        format!("All stable across {} runs", baseline.run_count)
    } else {
        format!(
            "{flaky} flaky test(s) detected across {} runs",
            baseline.run_count
        )
    }
}

fn sentinel_details(signals: &SentinelSignals) -> String {
    if !signals.available {
        return "Sentinel data not available".to_string();
    }
    let mut parts = Vec::new();
    if !signals.pitfall_matches.is_empty() {
        parts.push(format!("{} pitfall match(es)", signals.pitfall_matches.len()));
    }
    if !signals.hot_files.is_empty() {
        parts.push(format!("{} hot file(s)", signals.hot_files.len()));
    }
    if parts.is_empty() {
        return "No risk signals".to_string();
    }
    parts.join(", ")
}

fn cochange_details(signals: &SentinelSignals) -> String {
    if !signals.available {
        return "Sentinel data not available".to_string();
    }
    let missing = &signals.missing_co_changes;
    if missing.is_empty() {
        return "All co-change partners included".to_string();
    }
    let files: Vec<&str> = missing
        .iter()
        .take(3)
        .map(|m| m.partner_file.as_str())
        .collect();
    let suffix = if missing.len() > 3 {
        format!(" (+{} more)", missing.len() - 3)
    } else {
        String::new()
    };
    format!("Missing: {}{suffix}", files.join(", "))
}
