use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Matrix error: {0}")]
    MatrixError(#[from] triage_matrix::MatrixError),

    #[error("Filter error: {0}")]
    AggregatorError(#[from] triage_aggregator::AggregatorError),

    #[error("Illegal state transition for {finding_id}: {from} -> {to}")]
    InvalidTransition {
        finding_id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("{0}")]
    Other(String),
}
