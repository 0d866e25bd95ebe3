use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointsError {
    #[error("Invalid JSON input: {0}")]
    InputMalformed(#[from] serde_json::Error),

    #[error("Invalid JSON input: {0}")]
    InputNotUtf8(#[from] std::string::FromUtf8Error),

    #[error("Missing key in input data: {0}")]
    MissingKey(String),

    #[error("Filter ID {filter_id} not found in CourseFilters.")]
    FilterNotFound { filter_id: i32 },

    #[error("No overall records found for filter ID {filter_id}.")]
    NoData { filter_id: i32 },

    #[error("An unexpected error occurred: distribution fit diverged: {0}")]
    FitDivergence(String),

    #[error("An unexpected error occurred: invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    UpstreamUnavailable(#[from] tokio_postgres::Error)
}

impl PointsError {
    /// Whether the failure is worth retrying later without changing the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PointsError::UpstreamUnavailable(_))
    }

    /// The structured record emitted on the error stream for this failure.
    pub fn to_record(&self) -> Value {
        match self {
            PointsError::FilterNotFound { .. } => json!({ "warning": self.to_string() }),
            _ => json!({ "error": self.to_string() })
        }
    }
}

pub type PointsResult<T> = Result<T, PointsError>;
