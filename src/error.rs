use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy for the pipeline. Every variant is fatal to the run
/// that hits it: the stages are deterministic, so retrying with the same
/// input would fail the same way. Row numbers count data rows from zero.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Nulls or unparseable rows in the raw input.
    #[error("input integrity: {0}")]
    Integrity(String),

    #[error("row {row}: availability token {token:?} is not \"yes\"/\"no\"")]
    UnrecognizedValue { row: usize, token: String },

    /// The id generator handed out the same id twice. Not retried.
    #[error("duplicate generated id {id:?}")]
    IdentityConflict { id: String },

    #[error("row {row}: {column} value {value} is outside {expected}")]
    Domain {
        row: usize,
        column: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("row {row} failed schema validation: {reason}")]
    SchemaViolation { row: usize, reason: String },

    #[error("processed table not found at {}; run the cleaning stage first", .0.display())]
    MissingInput(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration: {0}")]
    Config(#[from] config::ConfigError),
}
