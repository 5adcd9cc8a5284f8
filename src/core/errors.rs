//! Error types for the gavel-rs library.
//!
//! Structured error types covering every layer of the assessment pipeline,
//! with constructor helpers that keep call sites terse. Stage-level failures
//! are caught and logged by the pipeline; only diff, store, and invariant
//! errors ever reach a caller.

use std::io;

use thiserror::Error;

/// Main result type for gavel operations.
pub type Result<T> = std::result::Result<T, GavelError>;

/// Comprehensive error type for all gavel operations.
#[derive(Error, Debug)]
pub enum GavelError {
    /// I/O related errors (file operations, subprocess plumbing)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// External tool invocation errors
    #[error("Tool error ({tool}): {message}")]
    Tool {
        /// Name of the external tool
        tool: String,
        /// Error description
        message: String,
    },

    /// External tool exceeded its timeout
    #[error("Tool '{tool}' timed out after {seconds}s")]
    ToolTimeout {
        /// Name of the external tool
        tool: String,
        /// Timeout that was exceeded
        seconds: u64,
    },

    /// External tool binary not found on PATH
    #[error("Tool '{tool}' not found on PATH")]
    ToolNotFound {
        /// Name of the external tool
        tool: String,
    },

    /// Parse errors for tool output
    #[error("Parse error in {source_kind} output: {message}")]
    Parse {
        /// What was being parsed (tool name or format)
        source_kind: String,
        /// Error description
        message: String,
    },

    /// Database and persistence errors
    #[error("Store error: {message}")]
    Store {
        /// Error description
        message: String,
        /// Store operation that failed
        operation: Option<String>,
        /// Underlying database error
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Assessment pipeline errors
    #[error("Pipeline error at stage '{stage}': {message}")]
    Pipeline {
        /// Pipeline stage where the error occurred
        stage: String,
        /// Error description
        message: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors for user input
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
    },

    /// Generic internal errors (programmer errors; propagate)
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
    },
}

impl GavelError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new external tool error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse(source_kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_kind: source_kind.into(),
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            operation: None,
            source: None,
        }
    }

    /// Create a new store error with operation context
    pub fn store_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            operation: Some(operation.into()),
            source: None,
        }
    }

    /// Create a new pipeline error
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Implement From traits for common error types
impl From<io::Error> for GavelError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for GavelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for GavelError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: format!("TOML parse failed: {err}"),
            field: None,
        }
    }
}

impl From<rusqlite::Error> for GavelError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store {
            message: format!("Database operation failed: {err}"),
            operation: None,
            source: Some(err),
        }
    }
}
