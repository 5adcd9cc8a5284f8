//! CLI Module Organization
//!
//! - args: CLI argument structures
//! - commands: command implementations (assess, history, feedback, prune, mcp)
//! - output: report rendering and table formatting

pub mod args;
pub mod commands;
pub mod output;

pub use args::*;
pub use commands::*;
