use thiserror::Error;

/// Comprehensive error types for the ingestion and orchestration pipeline
///
/// Validation errors are never downgraded to warnings: every variant here
/// aborts the run when it reaches the orchestrator.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Data integrity error: {message}")]
    DataIntegrity { message: String },

    #[error("Schema violation: required column '{column}' is missing")]
    SchemaViolation { column: String },

    #[error("Value domain error in column '{column}': {message}")]
    ValueDomain { column: String, message: String },

    #[error("Configuration error: {field} - {message}")]
    Configuration { field: String, message: String },

    #[error("Mode execution failed in '{mode}' mode")]
    ModeExecution {
        mode: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create a data integrity error with context
    pub fn integrity<S: Into<String>>(message: S) -> Self {
        PipelineError::DataIntegrity {
            message: message.into(),
        }
    }

    /// Create a value domain error with column context
    pub fn domain<S: Into<String>>(column: S, message: S) -> Self {
        PipelineError::ValueDomain {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error naming the offending field
    pub fn config<S: Into<String>>(field: S, message: S) -> Self {
        PipelineError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if the error originated in data validation rather than setup or dispatch
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PipelineError::DataIntegrity { .. }
                | PipelineError::SchemaViolation { .. }
                | PipelineError::ValueDomain { .. }
        )
    }
}
