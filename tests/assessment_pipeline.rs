//! End-to-end pipeline and persistence scenarios.

use std::path::Path;

use gavel_rs::core::config::GavelConfig;
use gavel_rs::core::models::{
    BaselineResult, Feedback, FeedbackOutcome, Grade, MutantStatus, MutationResult,
    SentinelSignals,
};
use gavel_rs::core::pipeline::AssessmentEngine;
use gavel_rs::core::scoring::{build_report, EvaluatedDimensions, ReportInputs};
use gavel_rs::io::store::AssessmentStore;

fn open_store(repo: &Path) -> AssessmentStore {
    let config = GavelConfig::default();
    AssessmentStore::open(config.db_path(repo)).unwrap()
}

fn inputs_for(repo: &Path, files: Vec<String>) -> ReportInputs {
    ReportInputs {
        repo_path: repo.to_string_lossy().into_owned(),
        ref_before: None,
        ref_after: None,
        files_changed: files,
        mutation_score: 100.0,
        static_score: 100.0,
        baseline_score: 100.0,
        sentinel_risk_score: 100.0,
        co_change_score: 100.0,
        security_score: 100.0,
        mutations: vec![],
        static_findings: vec![],
        security_findings: vec![],
        baseline: None,
        sentinel_signals: SentinelSignals::default(),
        evaluated: EvaluatedDimensions::default(),
    }
}

#[tokio::test]
async fn perfect_score_on_empty_diff() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    let engine = AssessmentEngine::new(GavelConfig::default());

    let report = engine
        .assess(&mut store, dir.path(), None, None)
        .await
        .unwrap();

    assert!(report.files_changed.is_empty());
    assert_eq!(report.overall_score, 100.0);
    assert_eq!(report.overall_grade, Grade::A);

    // Exactly one row appears in assessments.
    let stats = store.stats().unwrap();
    assert_eq!(stats.assessments, 1);

    // Running again adds exactly one more.
    engine
        .assess(&mut store, dir.path(), None, None)
        .await
        .unwrap();
    assert_eq!(store.stats().unwrap().assessments, 2);
}

#[tokio::test]
async fn partial_evaluation_reweights_remaining_dimensions() {
    let config = GavelConfig::default();

    // One source file changed; baseline failed; a single killed mutant;
    // clean static run; oracle unavailable.
    let dir = tempfile::tempdir().unwrap();
    let mut inputs = inputs_for(dir.path(), vec!["src/app.py".into()]);
    inputs.mutations = vec![MutationResult::new(
        "src/app.py",
        "1",
        "negate",
        Some(3),
        MutantStatus::Killed,
    )];
    inputs.evaluated = EvaluatedDimensions {
        mutation: true,
        static_analysis: true,
        baseline: false,
        sentinel_risk: true,
        co_change: true,
        security: false,
    };

    let report = build_report(inputs, &config.dimension_weights(), &config.scoring);

    let evaluated_count = report.dimensions.iter().filter(|d| d.evaluated).count();
    assert_eq!(evaluated_count, 4);
    assert_eq!(report.overall_score, 100.0);
    assert_eq!(report.overall_grade, Grade::A);
    assert!(report.gaps.is_empty());
}

#[test]
fn report_json_round_trip_preserves_primitives() {
    let config = GavelConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let mut inputs = inputs_for(dir.path(), vec!["a.py".into(), "b.py".into()]);
    inputs.mutation_score = 66.7;
    inputs.static_score = 80.0;
    inputs.baseline_score = 90.0;
    inputs.sentinel_risk_score = 70.0;
    inputs.co_change_score = 50.0;
    inputs.evaluated = EvaluatedDimensions {
        mutation: true,
        static_analysis: true,
        baseline: true,
        sentinel_risk: true,
        co_change: true,
        security: false,
    };

    let report = build_report(inputs, &config.dimension_weights(), &config.scoring);
    let parsed: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();

    assert_eq!(parsed["id"], report.id.as_str());
    assert_eq!(
        parsed["files_changed"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect::<Vec<_>>(),
        vec!["a.py", "b.py"]
    );
    let overall = parsed["overall_score"].as_f64().unwrap();
    assert!((overall - report.overall_score).abs() < 0.1);
    assert_eq!(parsed["overall_grade"], report.overall_grade.as_str());
    assert_eq!(parsed["dimensions"].as_array().unwrap().len(), 5);
    for dim in parsed["dimensions"].as_array().unwrap() {
        assert!(dim["raw_score"].as_f64().unwrap() <= 100.0);
    }
}

#[test]
fn store_round_trip_matches_denormalized_columns() {
    let config = GavelConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());

    let mut inputs = inputs_for(dir.path(), vec!["src/app.py".into()]);
    inputs.mutation_score = 75.0;
    inputs.evaluated.mutation = true;
    inputs.mutations = vec![MutationResult::new(
        "src/app.py",
        "9",
        "swap",
        Some(11),
        MutantStatus::Survived,
    )];
    let report = build_report(inputs, &config.dimension_weights(), &config.scoring);
    store.save_assessment(&report).unwrap();

    let stored = store.get_assessment(&report.id).unwrap().unwrap();
    assert_eq!(stored.repo_path, report.repo_path);
    assert_eq!(stored.mutation_score, Some(report.mutation_score));
    assert_eq!(stored.static_issues, Some(report.static_issues as i64));
    assert_eq!(stored.grade, report.overall_grade.as_str());
    assert_eq!(stored.files_changed, report.files_changed);
}

#[test]
fn retention_prune_cascade() {
    let config = GavelConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());

    let mut inputs = inputs_for(dir.path(), vec!["src/app.py".into()]);
    inputs.mutations = vec![MutationResult::new(
        "src/app.py",
        "1",
        "negate",
        Some(2),
        MutantStatus::Killed,
    )];
    inputs.baseline = Some(BaselineResult::new(
        dir.path().to_string_lossy(),
        "pytest",
        3,
        vec![],
        1.0,
    ));
    let report = build_report(inputs, &config.dimension_weights(), &config.scoring);
    store.save_assessment(&report).unwrap();
    store
        .save_feedback(&Feedback::new(&report.id, FeedbackOutcome::Accepted, "kept"))
        .unwrap();

    // Age every row by 200 days, then prune with 90-day retention.
    let aged = (chrono::Utc::now() - chrono::Duration::days(200))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    {
        let raw = rusqlite::Connection::open(store.path()).unwrap();
        for table in ["assessments", "baselines", "mutation_cache", "feedback"] {
            raw.execute(&format!("UPDATE {table} SET created_at = ?1"), [&aged])
                .unwrap();
        }
    }

    let counts = store.prune(90).unwrap();
    assert_eq!(counts.feedback, 1);
    assert_eq!(counts.mutation_cache, 1);
    assert_eq!(counts.baselines, 1);
    assert_eq!(counts.assessments, 1);
    assert!(store.get_assessment(&report.id).unwrap().is_none());

    // A second prune finds nothing.
    assert_eq!(store.prune(90).unwrap().total(), 0);
}

#[tokio::test]
async fn skip_flags_do_not_affect_empty_change_sets() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    let engine = AssessmentEngine::new(GavelConfig::default())
        .with_skip_baseline(true)
        .with_skip_mutations(true)
        .with_test_cmd("pytest -x");

    let report = engine
        .assess(&mut store, dir.path(), None, None)
        .await
        .unwrap();
    assert_eq!(report.overall_grade, Grade::A);
}
