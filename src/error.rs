//! Error types for the signal allocation engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// Required fields absent from every input record.
    #[error("Missing required fields: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Computation error: {0}")]
    Computation(String),

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stable machine-readable kind, used by the API and audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Schema { .. } => "schema_error",
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::Computation(_) => "computation_error",
            PipelineError::Model(_) => "model_error",
            PipelineError::Config(_) => "config_error",
            PipelineError::Serialization(_) => "serialization_error",
            PipelineError::Io(_) => "io_error",
        }
    }
}
