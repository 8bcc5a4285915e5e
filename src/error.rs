// src/error.rs
use thiserror::Error;

/// Errors that stop a batch before a result is produced.
///
/// Malformed cells are not represented here: they become
/// [`ParseOutcome::Missing`](crate::models::ParseOutcome) and are imputed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Required identity columns are absent from every record in the batch.
    #[error("Missing columns: {}", missing.join(", "))]
    Schema {
        /// Column names that were required but not found
        missing: Vec<String>,
    },

    /// The batch contained no records at all.
    #[error("No data provided")]
    EmptyBatch,

    /// Too few records to build a linkage tree.
    #[error("Insufficient records: required {required}, actual {actual}")]
    InsufficientRecords { required: usize, actual: usize },

    /// Caller-supplied parameter is out of range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Batch exceeds the configured size limit.
    #[error("Batch too large: maximum {max}, actual {actual}")]
    BatchTooLarge { max: usize, actual: usize },
}

impl PipelineError {
    pub fn schema(missing: Vec<String>) -> Self {
        Self::Schema { missing }
    }

    pub fn insufficient_records(required: usize, actual: usize) -> Self {
        Self::InsufficientRecords { required, actual }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Machine-readable error kind for the response layer
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Schema { .. } => "schema_error",
            PipelineError::EmptyBatch | PipelineError::InsufficientRecords { .. } => "empty_batch",
            PipelineError::InvalidParameter { .. } => "invalid_parameter",
            PipelineError::BatchTooLarge { .. } => "batch_too_large",
        }
    }

    /// Fields the caller has to fix, empty for non-schema errors
    pub fn offending_fields(&self) -> &[String] {
        match self {
            PipelineError::Schema { missing } => missing,
            _ => &[],
        }
    }
}
