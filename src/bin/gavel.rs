//! Gavel CLI - Multi-Metric Assessment for AI-Generated Code Changes
//!
//! Grades incremental code changes through mutation testing, static
//! analysis, security scanning, a flakiness baseline, and Sentinel project
//! intelligence, persisting every assessment in an embedded store.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gavel_rs::core::config::GavelConfig;

mod cli;
mod mcp;

use cli::{Cli, Commands};

/// Repository the invocation targets, used to pick up `[logging]` settings
/// before anything else runs.
fn target_repo(command: &Commands) -> PathBuf {
    match command {
        Commands::Assess(args) => args.repo.clone(),
        Commands::History(args) => args.repo.clone(),
        Commands::Feedback(args) => args.repo.clone(),
        Commands::Prune(args) => args.repo.clone(),
        Commands::McpStdio => std::env::var("GAVEL_REPO_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // All logs go to stderr so stdout stays usable for the MCP protocol.
    // --verbose overrides the configured level; RUST_LOG overrides both.
    let configured_level = GavelConfig::load(target_repo(&cli.command))
        .map(|config| config.logging.level)
        .unwrap_or_else(|_| "warn".to_string());
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        configured_level
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Assess(args) => cli::assess_command(args, cli.verbose).await?,
        Commands::History(args) => cli::history_command(args).await?,
        Commands::Feedback(args) => cli::feedback_command(args).await?,
        Commands::Prune(args) => cli::prune_command(args).await?,
        Commands::McpStdio => cli::mcp_stdio_command().await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_parsing_assess_defaults() {
        let cli = Cli::parse_from(["gavel", "assess"]);
        assert!(!cli.verbose);
        match cli.command {
            Commands::Assess(args) => {
                assert_eq!(args.repo, PathBuf::from("."));
                assert_eq!(args.test_cmd, "pytest");
                assert!(args.ref_before.is_none());
                assert!(!args.skip_baseline);
                assert!(!args.skip_mutations);
                assert!(!args.json);
            }
            _ => panic!("Expected Assess command"),
        }
    }

    #[test]
    fn cli_parsing_assess_with_options() {
        let cli = Cli::parse_from([
            "gavel",
            "--verbose",
            "assess",
            "repo-dir",
            "--ref-before",
            "abc",
            "--ref-after",
            "def",
            "--test-cmd",
            "pytest -x",
            "--skip-baseline",
            "--skip-mutations",
            "--json",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Assess(args) => {
                assert_eq!(args.repo, PathBuf::from("repo-dir"));
                assert_eq!(args.ref_before.as_deref(), Some("abc"));
                assert_eq!(args.ref_after.as_deref(), Some("def"));
                assert_eq!(args.test_cmd, "pytest -x");
                assert!(args.skip_baseline);
                assert!(args.skip_mutations);
                assert!(args.json);
            }
            _ => panic!("Expected Assess command"),
        }
    }

    #[test]
    fn cli_parsing_history_pagination() {
        let cli = Cli::parse_from(["gavel", "history", "--limit", "5", "--offset", "10"]);
        match cli.command {
            Commands::History(args) => {
                assert_eq!(args.limit, 5);
                assert_eq!(args.offset, 10);
            }
            _ => panic!("Expected History command"),
        }
    }

    #[test]
    fn cli_parsing_feedback() {
        let cli = Cli::parse_from([
            "gavel", "feedback", "abc123", "accepted", "--context", "useful",
        ]);
        match cli.command {
            Commands::Feedback(args) => {
                assert_eq!(args.assessment_id, "abc123");
                assert_eq!(args.outcome, "accepted");
                assert_eq!(args.context, "useful");
            }
            _ => panic!("Expected Feedback command"),
        }
    }

    #[test]
    fn cli_parsing_prune() {
        let cli = Cli::parse_from(["gavel", "prune", "--days", "30", "--yes"]);
        match cli.command {
            Commands::Prune(args) => {
                assert_eq!(args.days, Some(30));
                assert!(args.yes);
            }
            _ => panic!("Expected Prune command"),
        }
    }

    #[test]
    fn cli_parsing_mcp_stdio() {
        let cli = Cli::parse_from(["gavel", "mcp-stdio"]);
        assert!(matches!(cli.command, Commands::McpStdio));
    }
}
