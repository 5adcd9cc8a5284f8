//! Seven-stage assessment pipeline.
//!
//! Stage order: diff, baseline, mutation, static, security, sentinel,
//! score+persist. Stages 2-6 run inside error boundaries: a failing analyzer
//! logs at debug level, leaves its dimension unevaluated, and the pipeline
//! continues. Stage 1 degrades to a perfect-score report on an empty diff;
//! stage 7 errors surface to the caller. No single analyzer failure fails
//! the assessment.

use std::path::Path;

use tracing::{debug, info};

use crate::analyzers::baseline::run_baseline;
use crate::analyzers::diff::parse_diff;
use crate::analyzers::mutation::run_mutations;
use crate::analyzers::security::run_security_analysis;
use crate::analyzers::static_analysis::run_static_analysis;
use crate::core::config::GavelConfig;
use crate::core::errors::Result;
use crate::core::models::{
    AnalyzerKind, AssessmentReport, BaselineResult, MutationResult, SecurityFinding,
    SentinelSignals, StaticFinding,
};
use crate::core::scoring::{
    build_report, compute_baseline_score, compute_co_change_score, compute_mutation_score,
    compute_risk_score, compute_security_score, compute_static_score, EvaluatedDimensions,
    ReportInputs,
};
use crate::io::store::AssessmentStore;
use crate::oracle::SentinelOracle;

/// Main assessment engine implementing the seven-stage pipeline.
///
/// 1. Diff     - parse git diff into changed files + line ranges
/// 2. Baseline - run the test suite N times unmutated, flag flaky tests
/// 3. Mutate   - run mutmut scoped to changed files only
/// 4. Static   - run ruff + mypy on changed files
/// 5. Security - run bandit + semgrep + detect-secrets on changed files
/// 6. Sentinel - query pitfalls, hot files, co-change history
/// 7. Report   - fuse dimension scores and persist the assessment
pub struct AssessmentEngine {
    config: GavelConfig,
    test_cmd: String,
    skip_baseline: bool,
    skip_mutations: bool,
}

impl AssessmentEngine {
    /// New engine over a loaded configuration.
    pub fn new(config: GavelConfig) -> Self {
        Self {
            config,
            test_cmd: "pytest".to_string(),
            skip_baseline: false,
            skip_mutations: false,
        }
    }

    /// Override the baseline test command.
    #[must_use]
    pub fn with_test_cmd(mut self, test_cmd: impl Into<String>) -> Self {
        self.test_cmd = test_cmd.into();
        self
    }

    /// Skip the flakiness baseline stage.
    #[must_use]
    pub fn with_skip_baseline(mut self, skip: bool) -> Self {
        self.skip_baseline = skip;
        self
    }

    /// Skip the mutation testing stage.
    #[must_use]
    pub fn with_skip_mutations(mut self, skip: bool) -> Self {
        self.skip_mutations = skip;
        self
    }

    /// Run the full seven-stage assessment pipeline.
    ///
    /// On success the returned report has been persisted exactly once.
    pub async fn assess(
        &self,
        store: &mut AssessmentStore,
        repo_path: &Path,
        ref_before: Option<&str>,
        ref_after: Option<&str>,
    ) -> Result<AssessmentReport> {
        let repo = repo_path
            .canonicalize()
            .unwrap_or_else(|_| repo_path.to_path_buf());
        let scoring = &self.config.scoring;
        let timeouts = &self.config.timeouts;

        // Stage 1: Diff
        let diff = parse_diff(&repo, ref_before, ref_after, timeouts.diff).await;
        let py_files = diff.python_files();
        let all_files = diff.file_paths();
        info!(
            "Assessing {} changed file(s) ({} Python) in {}",
            all_files.len(),
            py_files.len(),
            repo.display()
        );

        if all_files.is_empty() {
            let report = self.perfect_report(&repo, ref_before, ref_after);
            store.save_assessment(&report)?;
            return Ok(report);
        }

        let mut evaluated = EvaluatedDimensions {
            sentinel_risk: true,
            co_change: true,
            static_analysis: !py_files.is_empty(),
            ..Default::default()
        };

        // Stage 2: Baseline
        let mut baseline: Option<BaselineResult> = None;
        let mut baseline_score = 100.0;
        if !self.skip_baseline && !py_files.is_empty() {
            match run_baseline(
                &repo,
                &self.test_cmd,
                self.config.pipeline.baseline_runs,
                timeouts.baseline_per_run,
            )
            .await
            {
                Ok(result) => {
                    baseline_score = compute_baseline_score(&result, scoring);
                    baseline = Some(result);
                    evaluated.baseline = true;
                }
                Err(err) => debug!("Stage 2 (Baseline) failed: {err}"),
            }
        }

        // Stage 3: Mutate
        let mut mutations: Vec<MutationResult> = Vec::new();
        let mut mutation_score = 100.0;
        if !self.skip_mutations && !py_files.is_empty() {
            let run = run_mutations(&repo, &py_files, timeouts).await;
            evaluated.mutation = run.tool_available && !run.results.is_empty();
            mutations = run.results;
            mutation_score = compute_mutation_score(&mutations);
        }

        // Stage 4: Static analysis
        let mut static_findings: Vec<StaticFinding> = Vec::new();
        let mut static_score = 100.0;
        if !py_files.is_empty() {
            let run = run_static_analysis(&repo, &py_files, timeouts.static_analysis).await;
            // Findings from unconfigured tools are persisted for drill-down
            // but excluded from the score.
            let scored: Vec<StaticFinding> = run
                .findings
                .iter()
                .filter(|f| match f.analyzer {
                    AnalyzerKind::Ruff => run.tool_config.ruff_configured,
                    AnalyzerKind::Mypy => run.tool_config.mypy_configured,
                    _ => true,
                })
                .cloned()
                .collect();
            static_score = compute_static_score(&scored, py_files.len(), scoring);
            static_findings = run.findings;
        }

        // Stage 5: Security
        let mut security_findings: Vec<SecurityFinding> = Vec::new();
        let mut security_score = 100.0;
        if self.config.security.enabled && !py_files.is_empty() {
            let sec = &self.config.security;
            let any_scanner =
                sec.bandit_enabled || sec.semgrep_enabled || sec.detect_secrets_enabled;
            if any_scanner {
                let run =
                    run_security_analysis(&repo, &py_files, sec, timeouts.security).await;
                security_score =
                    compute_security_score(&run.findings, py_files.len(), scoring);
                security_findings = run.findings;
                evaluated.security = true;
            }
        }

        // Stage 6: Sentinel
        let sentinel_signals = {
            let oracle = SentinelOracle::open(&repo);
            oracle.risk_signals(&all_files)
        };
        let sentinel_risk_score = compute_risk_score(&sentinel_signals, scoring);
        let co_change_score = compute_co_change_score(&sentinel_signals, &all_files);

        // Stage 7: Report + persist
        let report = build_report(
            ReportInputs {
                repo_path: repo.to_string_lossy().into_owned(),
                ref_before: ref_before.map(ToOwned::to_owned),
                ref_after: ref_after.map(ToOwned::to_owned),
                files_changed: all_files,
                mutation_score,
                static_score,
                baseline_score,
                sentinel_risk_score,
                co_change_score,
                security_score,
                mutations,
                static_findings,
                security_findings,
                baseline,
                sentinel_signals,
                evaluated,
            },
            &self.config.dimension_weights(),
            scoring,
        );

        store.save_assessment(&report)?;
        Ok(report)
    }

    /// Run only mutation testing (subset of the full assessment).
    ///
    /// Only the mutation dimension can be evaluated; all others are excluded
    /// from the overall score.
    pub async fn mutate_only(
        &self,
        store: &mut AssessmentStore,
        repo_path: &Path,
        ref_before: Option<&str>,
        ref_after: Option<&str>,
    ) -> Result<AssessmentReport> {
        let repo = repo_path
            .canonicalize()
            .unwrap_or_else(|_| repo_path.to_path_buf());
        let timeouts = &self.config.timeouts;

        let diff = parse_diff(&repo, ref_before, ref_after, timeouts.diff).await;
        let py_files = diff.python_files();

        let mut evaluated = EvaluatedDimensions::default();
        let mut mutations = Vec::new();
        if !py_files.is_empty() {
            let run = run_mutations(&repo, &py_files, timeouts).await;
            evaluated.mutation = run.tool_available && !run.results.is_empty();
            mutations = run.results;
        }
        let mutation_score = compute_mutation_score(&mutations);

        let report = build_report(
            ReportInputs {
                repo_path: repo.to_string_lossy().into_owned(),
                ref_before: ref_before.map(ToOwned::to_owned),
                ref_after: ref_after.map(ToOwned::to_owned),
                files_changed: diff.file_paths(),
                mutation_score,
                static_score: 100.0,
                baseline_score: 100.0,
                sentinel_risk_score: 100.0,
                co_change_score: 100.0,
                security_score: 100.0,
                mutations,
                static_findings: Vec::new(),
                security_findings: Vec::new(),
                baseline: None,
                sentinel_signals: SentinelSignals::default(),
                evaluated,
            },
            &self.config.dimension_weights(),
            &self.config.scoring,
        );

        store.save_assessment(&report)?;
        Ok(report)
    }

    /// Perfect-score report for an empty change set. No stage beyond the
    /// diff ran, so no dimension is evaluated and the overall defaults to
    /// 100.
    fn perfect_report(
        &self,
        repo: &Path,
        ref_before: Option<&str>,
        ref_after: Option<&str>,
    ) -> AssessmentReport {
        build_report(
            ReportInputs {
                repo_path: repo.to_string_lossy().into_owned(),
                ref_before: ref_before.map(ToOwned::to_owned),
                ref_after: ref_after.map(ToOwned::to_owned),
                files_changed: Vec::new(),
                mutation_score: 100.0,
                static_score: 100.0,
                baseline_score: 100.0,
                sentinel_risk_score: 100.0,
                co_change_score: 100.0,
                security_score: 100.0,
                mutations: Vec::new(),
                static_findings: Vec::new(),
                security_findings: Vec::new(),
                baseline: None,
                sentinel_signals: SentinelSignals::default(),
                evaluated: EvaluatedDimensions::default(),
            },
            &self.config.dimension_weights(),
            &self.config.scoring,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Grade;

    fn temp_store(dir: &Path) -> AssessmentStore {
        AssessmentStore::open(dir.join(".gavel").join("gavel.db")).unwrap()
    }

    #[tokio::test]
    async fn empty_diff_produces_perfect_persisted_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = temp_store(dir.path());
        let engine = AssessmentEngine::new(GavelConfig::default());

        // Not a git repository: the diff adapter degrades to an empty list.
        let report = engine
            .assess(&mut store, dir.path(), None, None)
            .await
            .unwrap();

        assert!(report.files_changed.is_empty());
        assert_eq!(report.overall_score, 100.0);
        assert_eq!(report.overall_grade, Grade::A);
        assert!(report.dimensions.iter().all(|d| !d.evaluated));
        assert!(report.gaps.is_empty());

        // Persisted exactly once.
        assert_eq!(store.stats().unwrap().assessments, 1);
        let stored = store.get_assessment(&report.id).unwrap().unwrap();
        assert_eq!(stored.grade, "A");
    }

    #[tokio::test]
    async fn mutate_only_marks_single_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = temp_store(dir.path());
        let engine = AssessmentEngine::new(GavelConfig::default());

        let report = engine
            .mutate_only(&mut store, dir.path(), None, None)
            .await
            .unwrap();

        // Nothing changed, nothing mutated: the mutation dimension stays
        // unevaluated and the overall degrades to the perfect default.
        assert_eq!(report.overall_score, 100.0);
        assert!(report.dimensions.iter().all(|d| !d.evaluated));
        assert_eq!(store.stats().unwrap().assessments, 1);
    }

    #[tokio::test]
    async fn refs_are_recorded_on_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = temp_store(dir.path());
        let engine = AssessmentEngine::new(GavelConfig::default());

        let report = engine
            .assess(&mut store, dir.path(), Some("abc123"), Some("def456"))
            .await
            .unwrap();
        assert_eq!(report.ref_before.as_deref(), Some("abc123"));
        assert_eq!(report.ref_after.as_deref(), Some("def456"));
    }
}
