//! CLI argument structures for the gavel binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multi-metric assessment for AI-generated code changes
#[derive(Parser)]
#[command(name = "gavel")]
#[command(version = VERSION)]
#[command(about = "Gavel - Multi-Metric Assessment for AI-Generated Code Changes")]
#[command(long_about = "
Grade incremental code changes through mutation testing, static analysis,
security scanning, a flakiness baseline, and Sentinel project intelligence.

Common Usage:

  # Assess the working tree against HEAD
  gavel assess

  # Assess a specific revision range, skipping the slow stages
  gavel assess --ref-before main --ref-after feature --skip-mutations

  # Review past assessments
  gavel history --limit 20

  # Record whether an assessed change was kept
  gavel feedback <assessment-id> accepted

  # Start the MCP server for agent integration
  gavel mcp-stdio
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full assessment on code changes
    Assess(AssessArgs),

    /// Show past assessment history
    History(HistoryArgs),

    /// Submit feedback on an assessment
    Feedback(FeedbackArgs),

    /// Delete assessment data beyond the retention period
    Prune(PruneArgs),

    /// Run the MCP server over stdio (for agent integration)
    #[command(name = "mcp-stdio")]
    McpStdio,
}

#[derive(Args)]
pub struct AssessArgs {
    /// Path to the repository
    #[arg(default_value = ".")]
    pub repo: PathBuf,

    /// Git ref before changes
    #[arg(short = 'b', long = "ref-before")]
    pub ref_before: Option<String>,

    /// Git ref after changes
    #[arg(short = 'a', long = "ref-after")]
    pub ref_after: Option<String>,

    /// Test command for the flakiness baseline
    #[arg(short = 't', long = "test-cmd", default_value = "pytest")]
    pub test_cmd: String,

    /// Skip the flakiness baseline (faster)
    #[arg(long)]
    pub skip_baseline: bool,

    /// Skip mutation testing (much faster)
    #[arg(long)]
    pub skip_mutations: bool,

    /// Output the raw report JSON instead of the rendered panel
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Path to the repository
    #[arg(default_value = ".")]
    pub repo: PathBuf,

    /// Maximum number of results
    #[arg(short, long, default_value = "10")]
    pub limit: u32,

    /// Number of results to skip
    #[arg(short, long, default_value = "0")]
    pub offset: u32,
}

#[derive(Args)]
pub struct FeedbackArgs {
    /// Assessment ID
    pub assessment_id: String,

    /// Outcome: accepted, rejected, or modified
    pub outcome: String,

    /// Optional explanation
    #[arg(short, long, default_value = "")]
    pub context: String,

    /// Repository path
    #[arg(short, long, default_value = ".")]
    pub repo: PathBuf,
}

#[derive(Args)]
pub struct PruneArgs {
    /// Path to the repository
    #[arg(default_value = ".")]
    pub repo: PathBuf,

    /// Retention days (default from configuration)
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}
