//! Terminal rendering for assessment reports and history.

use owo_colors::OwoColorize;
use tabled::settings::Style as TableStyle;
use tabled::{Table, Tabled};

use gavel_rs::core::models::{AssessmentReport, StoredAssessment};

#[derive(Tabled)]
struct DimensionRow {
    #[tabled(rename = "Dimension")]
    name: String,
    #[tabled(rename = "Grade")]
    grade: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Details")]
    details: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Grade")]
    grade: String,
    #[tabled(rename = "Mutation")]
    mutation: String,
    #[tabled(rename = "Static")]
    static_issues: String,
    #[tabled(rename = "Files")]
    files: String,
    #[tabled(rename = "Created")]
    created: String,
}

/// Render the full assessment panel, dimensions table, and gap list.
pub fn display_report(report: &AssessmentReport) {
    println!();
    println!("{}", "Gavel Assessment".bold());
    println!(
        "  {} ({:.1}/100) | {} file(s) changed",
        colored_grade(report.overall_grade.as_str()),
        report.overall_score,
        report.files_changed.len()
    );
    println!();

    let rows: Vec<DimensionRow> = report
        .dimensions
        .iter()
        .map(|d| {
            if d.evaluated {
                DimensionRow {
                    name: d.name.clone(),
                    grade: colored_grade(d.grade.as_str()),
                    score: format!("{:.1}%", d.raw_score),
                    weight: format!("{}%", (d.weight * 100.0).round() as i64),
                    details: d.details.clone(),
                }
            } else {
                DimensionRow {
                    name: d.name.clone(),
                    grade: "N/A".dimmed().to_string(),
                    score: "-".to_string(),
                    weight: format!("{}%", (d.weight * 100.0).round() as i64),
                    details: "Not evaluated".dimmed().to_string(),
                }
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");

    if !report.gaps.is_empty() {
        println!();
        println!("{}", "Gaps (Need Attention):".yellow().bold());
        for gap in &report.gaps {
            println!("  - {gap}");
        }
    }

    println!();
    println!("{}", format!("ID: {}", report.id).dimmed());
}

/// Render the stored-assessment history table.
pub fn display_history(assessments: &[StoredAssessment]) {
    let rows: Vec<HistoryRow> = assessments
        .iter()
        .map(|a| HistoryRow {
            id: a.id.chars().take(8).collect(),
            grade: colored_grade(&a.grade),
            mutation: a
                .mutation_score
                .map_or("?%".to_string(), |score| format!("{score}%")),
            static_issues: a
                .static_issues
                .map_or("?".to_string(), |count| count.to_string()),
            files: a.files_changed.len().to_string(),
            created: a.created_at.clone(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");
}

/// Color a grade letter by how good it is.
pub fn colored_grade(grade: &str) -> String {
    match grade {
        "A" => grade.green().to_string(),
        "B" => grade.blue().to_string(),
        "C" => grade.yellow().to_string(),
        "D" => grade.red().to_string(),
        "F" => grade.red().bold().to_string(),
        other => other.to_string(),
    }
}
