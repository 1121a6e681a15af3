use std::path::PathBuf;
use thiserror::Error;

pub use crate::runner::error::TaskError;
pub use crate::store::error::StoreError;

#[derive(Error, Debug)]
pub enum VerdictError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("Execution of job {job_id} aborted: {reason}")]
    Aborted { job_id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid model '{name}': {reason}")]
    InvalidModel { name: String, reason: String },
}

/// Rejected job submission. No job is created when this is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid content kind: {0}")]
    InvalidContentKind(String),
}

pub type Result<T> = std::result::Result<T, VerdictError>;
