//! Plain-text response formatting for MCP tools, capped at a character
//! budget so responses stay inside an LLM-friendly window.

use std::collections::BTreeMap;

use gavel_rs::core::models::{AssessmentReport, MutationResult, StoredAssessment};

/// Format an assessment report for LLM consumption.
pub fn format_assessment(report: &AssessmentReport, max_chars: usize) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("## Gavel Assessment: {}", report.overall_grade));
    lines.push(format!("Score: {:.1}/100", report.overall_score));
    lines.push(format!("Files: {}", report.files_changed.len()));
    lines.push(String::new());

    lines.push("### Dimensions".to_string());
    for dim in &report.dimensions {
        lines.push(format!(
            "- **{}**: {} ({:.1}%) — {}",
            dim.name, dim.grade, dim.raw_score, dim.details
        ));
    }
    lines.push(String::new());

    if !report.gaps.is_empty() {
        lines.push("### Gaps (Need Attention)".to_string());
        for gap in &report.gaps {
            lines.push(format!("- {gap}"));
        }
        lines.push(String::new());
    }

    if !report.files_changed.is_empty() {
        lines.push("### Changed Files".to_string());
        for file in report.files_changed.iter().take(20) {
            lines.push(format!("- {file}"));
        }
        if report.files_changed.len() > 20 {
            lines.push(format!("- ... and {} more", report.files_changed.len() - 20));
        }
        lines.push(String::new());
    }

    lines.push(format!("ID: {}", report.id));
    lines.push(format!("Created: {}", report.created_at));

    truncate(lines.join("\n"), max_chars)
}

/// Format assessment history for LLM consumption.
pub fn format_history(assessments: &[StoredAssessment], max_chars: usize) -> String {
    if assessments.is_empty() {
        return "No assessments found.".to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("## Assessment History ({} results)", assessments.len()));
    lines.push(String::new());

    for a in assessments {
        let short_id: String = a.id.chars().take(8).collect();
        let mutation = a
            .mutation_score
            .map_or("?".to_string(), |score| score.to_string());
        let static_issues = a
            .static_issues
            .map_or("?".to_string(), |count| count.to_string());
        lines.push(format!(
            "- **{}** | mutation={mutation}% | static={static_issues} issues | {} files | {} | id={short_id}",
            a.grade,
            a.files_changed.len(),
            a.created_at,
        ));
    }

    truncate(lines.join("\n"), max_chars)
}

/// Format mutation results for LLM consumption.
pub fn format_mutations(mutations: &[MutationResult], score: f64, max_chars: usize) -> String {
    if mutations.is_empty() {
        return "No mutation results. Score: 100%".to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    lines.push("## Mutation Testing Results".to_string());
    lines.push(format!("Score: {score}%"));
    lines.push(format!("Total mutants: {}", mutations.len()));
    lines.push(String::new());

    let mut by_status: BTreeMap<&str, Vec<&MutationResult>> = BTreeMap::new();
    for mutation in mutations {
        by_status
            .entry(mutation.status.as_str())
            .or_default()
            .push(mutation);
    }

    for (status, group) in by_status {
        lines.push(format!("### {} ({})", title_case(status), group.len()));
        for mutation in group.iter().take(10) {
            let line = mutation
                .line_number
                .map_or("?".to_string(), |n| n.to_string());
            lines.push(format!(
                "- {}:{line} [{}]",
                mutation.file_path, mutation.operator
            ));
        }
        if group.len() > 10 {
            lines.push(format!("- ... and {} more", group.len() - 10));
        }
        lines.push(String::new());
    }

    truncate(lines.join("\n"), max_chars)
}

/// Format feedback confirmation.
pub fn format_feedback_response(assessment_id: &str, outcome: &str) -> String {
    let short_id: String = assessment_id.chars().take(8).collect();
    format!("Feedback recorded: {outcome} for assessment {short_id}")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

/// Truncate to the configured character budget.
fn truncate(text: String, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text;
    }
    let cut = max_chars.saturating_sub(50);
    let mut end = cut;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n\n... (output truncated)", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_rs::core::models::{
        new_id, utc_now, Grade, MutantStatus, SentinelSignals,
    };

    fn sample_report() -> AssessmentReport {
        AssessmentReport {
            id: "deadbeefcafe".into(),
            repo_path: "/tmp/repo".into(),
            ref_before: None,
            ref_after: None,
            files_changed: vec!["a.py".into(), "b.py".into()],
            dimensions: vec![],
            overall_score: 85.0,
            overall_grade: Grade::B,
            mutation_score: 90.0,
            static_issues: 1,
            sentinel_warnings: 0,
            baseline_flaky: 0,
            gaps: vec!["Mutation Score: D (50.0%) — 1/2 killed, 1 survived".into()],
            mutations: vec![],
            static_findings: vec![],
            security_findings: vec![],
            baseline: None,
            sentinel_signals: SentinelSignals::default(),
            created_at: utc_now(),
        }
    }

    #[test]
    fn assessment_format_includes_grade_and_gaps() {
        let text = format_assessment(&sample_report(), 16_000);
        assert!(text.contains("## Gavel Assessment: B"));
        assert!(text.contains("Score: 85.0/100"));
        assert!(text.contains("### Gaps (Need Attention)"));
        assert!(text.contains("ID: deadbeefcafe"));
    }

    #[test]
    fn truncation_appends_marker() {
        let long_files: Vec<String> = (0..50).map(|i| format!("pkg/module_{i}.py")).collect();
        let mut report = sample_report();
        report.files_changed = long_files;

        let text = format_assessment(&report, 300);
        assert!(text.len() <= 300);
        assert!(text.ends_with("... (output truncated)"));
    }

    #[test]
    fn mutations_grouped_by_status() {
        let mutations = vec![
            MutationResult {
                id: new_id(),
                file_path: "a.py".into(),
                mutant_id: "1".into(),
                operator: "negate".into(),
                line_number: Some(3),
                status: MutantStatus::Killed,
                created_at: utc_now(),
            },
            MutationResult {
                id: new_id(),
                file_path: "a.py".into(),
                mutant_id: "2".into(),
                operator: "unknown".into(),
                line_number: None,
                status: MutantStatus::Survived,
                created_at: utc_now(),
            },
        ];

        let text = format_mutations(&mutations, 50.0, 16_000);
        assert!(text.contains("### Killed (1)"));
        assert!(text.contains("### Survived (1)"));
        assert!(text.contains("a.py:? [unknown]"));
    }

    #[test]
    fn empty_mutations_short_circuit() {
        assert_eq!(
            format_mutations(&[], 100.0, 16_000),
            "No mutation results. Score: 100%"
        );
    }

    #[test]
    fn history_format_lists_rows() {
        let rows = vec![StoredAssessment {
            id: "0123456789ab".into(),
            repo_path: "/tmp/repo".into(),
            ref_before: None,
            ref_after: None,
            files_changed: vec!["a.py".into()],
            mutation_score: Some(88.0),
            static_issues: Some(3),
            sentinel_warnings: Some(0),
            baseline_flaky: 0,
            grade: "B".into(),
            report_json: "{}".into(),
            created_at: "2026-07-01 12:00:00".into(),
        }];

        let text = format_history(&rows, 16_000);
        assert!(text.contains("## Assessment History (1 results)"));
        assert!(text.contains("mutation=88%"));
        assert!(text.contains("id=01234567"));
    }

    #[test]
    fn empty_history_message() {
        assert_eq!(format_history(&[], 16_000), "No assessments found.");
    }
}
