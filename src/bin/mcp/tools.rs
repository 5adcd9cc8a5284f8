//! MCP tool implementations over the assessment library.

use std::path::PathBuf;

use tracing::{error, info};

use gavel_rs::core::config::GavelConfig;
use gavel_rs::core::models::{Feedback, FeedbackOutcome};
use gavel_rs::core::pipeline::AssessmentEngine;
use gavel_rs::io::store::AssessmentStore;

use crate::mcp::formatters::{
    format_assessment, format_feedback_response, format_history, format_mutations,
};
use crate::mcp::protocol::{error_codes, ToolResult};

/// Parameters for the gavel_assess tool
#[derive(serde::Deserialize)]
pub struct AssessParams {
    #[serde(default)]
    pub ref_before: String,
    #[serde(default)]
    pub ref_after: String,
    #[serde(default)]
    pub skip_baseline: bool,
    #[serde(default)]
    pub skip_mutations: bool,
}

/// Parameters for the gavel_mutate tool
#[derive(serde::Deserialize)]
pub struct MutateParams {
    #[serde(default)]
    pub ref_before: String,
    #[serde(default)]
    pub ref_after: String,
}

/// Parameters for the gavel_history tool
#[derive(serde::Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

/// Parameters for the gavel_feedback tool
#[derive(serde::Deserialize)]
pub struct FeedbackParams {
    pub assessment_id: String,
    pub outcome: String,
    #[serde(default)]
    pub context: String,
}

fn default_limit() -> u32 {
    10
}

/// Repository targeted by the server: `GAVEL_REPO_PATH` or the cwd.
fn repo_path() -> PathBuf {
    std::env::var("GAVEL_REPO_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn opt(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn open_store(config: &GavelConfig, repo: &PathBuf) -> Result<AssessmentStore, (i32, String)> {
    AssessmentStore::open(config.db_path(repo)).map_err(|err| {
        error!("Failed to open store: {err}");
        (
            error_codes::INTERNAL_ERROR,
            format!("Failed to open store: {err}"),
        )
    })
}

fn load_config(repo: &PathBuf) -> Result<GavelConfig, (i32, String)> {
    GavelConfig::load(repo).map_err(|err| {
        error!("Failed to load configuration: {err}");
        (
            error_codes::INTERNAL_ERROR,
            format!("Failed to load configuration: {err}"),
        )
    })
}

/// Execute the gavel_assess tool: full pipeline on the current diff.
pub async fn execute_assess(params: AssessParams) -> Result<ToolResult, (i32, String)> {
    let repo = repo_path();
    info!("Executing gavel_assess for {}", repo.display());

    let config = load_config(&repo)?;
    let mut store = open_store(&config, &repo)?;
    let max_chars = config.pipeline.max_output_chars;

    let engine = AssessmentEngine::new(config)
        .with_skip_baseline(params.skip_baseline)
        .with_skip_mutations(params.skip_mutations);

    match engine
        .assess(
            &mut store,
            &repo,
            opt(&params.ref_before),
            opt(&params.ref_after),
        )
        .await
    {
        Ok(report) => Ok(ToolResult::text(format_assessment(&report, max_chars))),
        Err(err) => {
            error!("Assessment failed: {err}");
            Err((
                error_codes::ASSESSMENT_ERROR,
                format!("Assessment failed: {err}"),
            ))
        }
    }
}

/// Execute the gavel_mutate tool: mutation testing only.
pub async fn execute_mutate(params: MutateParams) -> Result<ToolResult, (i32, String)> {
    let repo = repo_path();
    info!("Executing gavel_mutate for {}", repo.display());

    let config = load_config(&repo)?;
    let mut store = open_store(&config, &repo)?;
    let max_chars = config.pipeline.max_output_chars;

    let engine = AssessmentEngine::new(config);
    match engine
        .mutate_only(
            &mut store,
            &repo,
            opt(&params.ref_before),
            opt(&params.ref_after),
        )
        .await
    {
        Ok(report) => Ok(ToolResult::text(format_mutations(
            &report.mutations,
            report.mutation_score,
            max_chars,
        ))),
        Err(err) => {
            error!("Mutation testing failed: {err}");
            Err((
                error_codes::ASSESSMENT_ERROR,
                format!("Mutation testing failed: {err}"),
            ))
        }
    }
}

/// Execute the gavel_history tool: paged past assessments.
pub async fn execute_history(params: HistoryParams) -> Result<ToolResult, (i32, String)> {
    let repo = repo_path();
    let config = load_config(&repo)?;
    let store = open_store(&config, &repo)?;

    let assessments = store
        .get_assessments(params.limit, params.offset, None)
        .map_err(|err| {
            (
                error_codes::INTERNAL_ERROR,
                format!("History query failed: {err}"),
            )
        })?;

    Ok(ToolResult::text(format_history(
        &assessments,
        config.pipeline.max_output_chars,
    )))
}

/// Execute the gavel_feedback tool: record an outcome for an assessment.
pub async fn execute_feedback(params: FeedbackParams) -> Result<ToolResult, (i32, String)> {
    let repo = repo_path();
    let config = load_config(&repo)?;
    let mut store = open_store(&config, &repo)?;

    let outcome: FeedbackOutcome = params.outcome.parse().map_err(|_| {
        (
            error_codes::INVALID_PARAMS,
            format!(
                "Invalid outcome '{}'. Must be: accepted, rejected, or modified",
                params.outcome
            ),
        )
    })?;

    let exists = store
        .get_assessment(&params.assessment_id)
        .map_err(|err| {
            (
                error_codes::INTERNAL_ERROR,
                format!("Lookup failed: {err}"),
            )
        })?
        .is_some();
    if !exists {
        return Err((
            error_codes::INVALID_PARAMS,
            format!("Assessment '{}' not found", params.assessment_id),
        ));
    }

    let feedback = Feedback::new(&params.assessment_id, outcome, &params.context);
    store.save_feedback(&feedback).map_err(|err| {
        (
            error_codes::INTERNAL_ERROR,
            format!("Failed to save feedback: {err}"),
        )
    })?;

    Ok(ToolResult::text(format_feedback_response(
        &params.assessment_id,
        &params.outcome,
    )))
}
