//! Error types shared across the workspace.

use serde::Serialize;
use thiserror::Error;

/// Configuration loading/validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read lexicon file {path}: {source}")]
    LexiconFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lexicon file: {0}")]
    LexiconFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}

/// Fatal pipeline errors, returned to the caller as structured data.
///
/// External-service failures never appear here: the orchestrator absorbs them
/// and falls back to the rule engine. Only input faults (nothing to analyze)
/// and internal faults during normalization abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No column in the dataset qualifies as a comment column.
    #[error("no comment column found among: {}", columns.join(", "))]
    NoCommentColumn { columns: Vec<String> },

    /// The dataset produced zero usable comments.
    #[error("dataset contains no usable comments")]
    EmptyDataset,

    /// Internal fault while building the aggregate (malformed engine output).
    #[error("normalization failed: {0}")]
    Normalization(String),
}

impl PipelineError {
    /// Stable machine-readable code for the caller.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::NoCommentColumn { .. } => "NO_COMMENT_COLUMN",
            PipelineError::EmptyDataset => "EMPTY_DATASET",
            PipelineError::Normalization(_) => "NORMALIZATION_FAILED",
        }
    }

    /// Serializable error object handed across the orchestrator boundary.
    #[must_use]
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// The structured error shape callers receive instead of an exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}
