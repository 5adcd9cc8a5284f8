//! CLI command implementations.
//!
//! Each command loads the layered configuration for the target repository,
//! opens the store as a scoped resource, and drives the library. The assess
//! command wraps the pipeline in a single outer handler that logs the
//! failure at debug level and prints a one-line cause.

use std::str::FromStr;

use owo_colors::OwoColorize;
use tracing::debug;

use gavel_rs::core::config::GavelConfig;
use gavel_rs::core::models::{Feedback, FeedbackOutcome};
use gavel_rs::core::pipeline::AssessmentEngine;
use gavel_rs::io::store::AssessmentStore;

use crate::cli::args::{AssessArgs, FeedbackArgs, HistoryArgs, PruneArgs};
use crate::cli::output::{display_history, display_report};

/// Run a full assessment and render or print the report.
pub async fn assess_command(args: AssessArgs, verbose: bool) -> anyhow::Result<()> {
    let repo = args.repo.canonicalize().unwrap_or(args.repo);

    let outcome = async {
        let config = GavelConfig::load(&repo)?;
        let mut store = AssessmentStore::open(config.db_path(&repo))?;
        let engine = AssessmentEngine::new(config)
            .with_test_cmd(&args.test_cmd)
            .with_skip_baseline(args.skip_baseline)
            .with_skip_mutations(args.skip_mutations);
        engine
            .assess(
                &mut store,
                &repo,
                args.ref_before.as_deref(),
                args.ref_after.as_deref(),
            )
            .await
    }
    .await;

    match outcome {
        Ok(report) => {
            if args.json {
                println!("{}", report.to_json());
            } else {
                display_report(&report);
            }
            Ok(())
        }
        Err(err) => {
            debug!("Assessment failed: {err:?}");
            eprintln!("{}", format!("Assessment failed: {err}").red());
            if !verbose {
                eprintln!("{}", "Run with --verbose for details".dimmed());
            }
            std::process::exit(1);
        }
    }
}

/// Tabulate stored assessments.
pub async fn history_command(args: HistoryArgs) -> anyhow::Result<()> {
    let repo = args.repo.canonicalize().unwrap_or(args.repo);
    let config = GavelConfig::load(&repo)?;
    let store = AssessmentStore::open(config.db_path(&repo))?;

    let assessments = store.get_assessments(args.limit, args.offset, None)?;
    if assessments.is_empty() {
        println!("{}", "No assessments found.".dimmed());
        return Ok(());
    }

    display_history(&assessments);
    Ok(())
}

/// Record user feedback on a stored assessment.
pub async fn feedback_command(args: FeedbackArgs) -> anyhow::Result<()> {
    let repo = args.repo.canonicalize().unwrap_or(args.repo);

    let Ok(outcome) = FeedbackOutcome::from_str(&args.outcome) else {
        eprintln!(
            "{}",
            format!(
                "Invalid outcome '{}'. Must be: accepted, rejected, or modified",
                args.outcome
            )
            .red()
        );
        std::process::exit(1);
    };

    let config = GavelConfig::load(&repo)?;
    let mut store = AssessmentStore::open(config.db_path(&repo))?;

    if store.get_assessment(&args.assessment_id)?.is_none() {
        eprintln!(
            "{}",
            format!("Assessment '{}' not found", args.assessment_id).red()
        );
        std::process::exit(1);
    }

    let feedback = Feedback::new(&args.assessment_id, outcome, &args.context);
    store.save_feedback(&feedback)?;

    let short_id: String = args.assessment_id.chars().take(8).collect();
    println!(
        "{}",
        format!("Feedback recorded: {} for {short_id}", args.outcome).green()
    );
    Ok(())
}

/// Delete data older than the retention period, with confirmation.
pub async fn prune_command(args: PruneArgs) -> anyhow::Result<()> {
    let repo = args.repo.canonicalize().unwrap_or(args.repo);
    let config = GavelConfig::load(&repo)?;
    let retention_days = args.days.unwrap_or(config.retention.retention_days);

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete data older than {retention_days} days?"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", "Aborted.".dimmed());
            return Ok(());
        }
    }

    let mut store = AssessmentStore::open(config.db_path(&repo))?;
    let counts = store.prune(retention_days)?;

    if counts.total() == 0 {
        println!("{}", "No data to prune.".dimmed());
    } else {
        println!("{}", format!("Pruned {} rows:", counts.total()).green());
        for (table, count) in [
            ("assessments", counts.assessments),
            ("baselines", counts.baselines),
            ("mutation_cache", counts.mutation_cache),
            ("feedback", counts.feedback),
        ] {
            if count > 0 {
                println!("  {table}: {count}");
            }
        }
    }
    Ok(())
}

/// Start the MCP stdio server.
pub async fn mcp_stdio_command() -> anyhow::Result<()> {
    let server = crate::mcp::server::McpServer::new(env!("CARGO_PKG_VERSION"));
    server.run().await
}
