//! # Gavel-RS: Multi-Metric Assessment Engine for AI-Generated Code
//!
//! Gavel grades incremental code changes by orchestrating a panel of external
//! analyzers and fusing their signals into a single letter grade:
//!
//! - **Mutation Testing**: mutmut scoped to the changed files
//! - **Static Cleanliness**: ruff + mypy findings, severity weighted
//! - **Test Baseline**: repeated test runs to flag flaky tests
//! - **Sentinel Risk**: pitfalls, hot files, and co-change history from a
//!   sibling Sentinel knowledge database
//! - **Security Hygiene**: bandit + semgrep + detect-secrets with CWE-tier
//!   weighting and false-positive suppression
//!
//! Every assessment is persisted in an embedded SQLite store and surfaced
//! through both a CLI and an MCP stdio server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   CLI / MCP Surfaces                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Core Engine   │  Analyzers    │  Oracle    │  I/O & Store  │
//! │                │               │            │               │
//! │ • Pipeline     │ • Diff        │ • Pitfalls │ • SQLite      │
//! │ • Scoring      │ • Mutation    │ • Hot files│ • Migrations  │
//! │ • Config       │ • Static      │ • Co-change│ • Retention   │
//! │ • Models       │ • Security    │            │               │
//! │                │ • Baseline    │            │               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gavel_rs::core::config::GavelConfig;
//! use gavel_rs::core::pipeline::AssessmentEngine;
//! use gavel_rs::io::store::AssessmentStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = std::path::Path::new(".");
//!     let config = GavelConfig::load(repo)?;
//!     let mut store = AssessmentStore::open(config.db_path(repo))?;
//!
//!     let engine = AssessmentEngine::new(config);
//!     let report = engine.assess(&mut store, repo, None, None).await?;
//!
//!     println!("Grade: {} ({}/100)", report.overall_grade, report.overall_score);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

// Core assessment engine modules
pub mod core {
    //! Core pipeline, scoring, configuration, and data model.

    pub mod config;
    pub mod errors;
    pub mod models;
    pub mod pipeline;
    pub mod scoring;
}

// External analyzer adapters
pub mod analyzers {
    //! Adapters over external analysis tools.
    //!
    //! Each adapter shells out to one tool under a timeout, normalizes its
    //! output into the internal finding types, and reports whether the tool
    //! was available at all. Tool failures degrade; they never propagate out
    //! of the owning pipeline stage.

    pub mod baseline;
    pub mod diff;
    pub mod mutation;
    pub mod security;
    pub mod static_analysis;

    pub(crate) mod process;
}

// Sentinel knowledge oracle
pub mod oracle;

// I/O and persistence
pub mod io {
    //! Persistence for assessments, mutation cache, baselines, and feedback.

    pub mod store;
}

// Re-export primary types for convenience
pub use crate::core::config::GavelConfig;
pub use crate::core::errors::{GavelError, Result};
pub use crate::core::models::AssessmentReport;
pub use crate::core::pipeline::AssessmentEngine;
pub use crate::io::store::AssessmentStore;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
