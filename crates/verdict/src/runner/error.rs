use std::time::Duration;

use thiserror::Error;

/// Failure of a single detection unit invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("Model '{model}' is unreachable: {reason}")]
    Unreachable { model: String, reason: String },

    #[error("Malformed content '{content_ref}': {reason}")]
    MalformedContent { content_ref: String, reason: String },

    #[error("Model '{model}' returned invalid output: {reason}")]
    InvalidOutput { model: String, reason: String },

    #[error("Model '{model}' timed out after {after:?}")]
    TimedOut { model: String, after: Duration },

    #[error("Model '{model}' failed: {reason}")]
    Failed { model: String, reason: String },
}
