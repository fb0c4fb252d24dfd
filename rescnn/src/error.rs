use thiserror::Error;

/// Errors returned by ResCNN operations.
#[derive(Debug, Error)]
pub enum RescnnError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("checkpoint {path}: {reason}")]
    Checkpoint { path: String, reason: String },

    #[error("tensor data: {0}")]
    Data(String),
}
