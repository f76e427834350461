use dbpilot_core::id::QueryId;
use thiserror::Error;

/// Result type local to dbpilot-forecast.
pub type Result<T> = std::result::Result<T, ForecastError>;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("query {0} is not present in the trace")]
    NotFound(QueryId),

    #[error("query {0} registered twice with different metadata")]
    Duplicate(QueryId),

    #[error("query {query_id}: expected {expected} parameters, got {got}")]
    ParamCount {
        query_id: QueryId,
        expected: usize,
        got: usize,
    },

    #[error("forecast interval must be positive")]
    ZeroInterval,

    #[error("planning window [{start}, {end}) is invalid for {num_segments} segments")]
    InvalidWindow {
        start: usize,
        end: usize,
        num_segments: usize,
    },

    #[error("trace file error: {0}")]
    Csv(String),

    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] dbpilot_core::Error),
}

impl From<csv::Error> for ForecastError {
    fn from(e: csv::Error) -> Self {
        ForecastError::Csv(e.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(e: serde_json::Error) -> Self {
        ForecastError::Csv(e.to_string())
    }
}
