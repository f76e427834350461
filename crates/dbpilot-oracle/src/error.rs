use dbpilot_core::id::QueryId;
use dbpilot_forecast::ForecastError;
use thiserror::Error;

use crate::engine::EngineError;

/// Result type local to dbpilot-oracle.
pub type Result<T> = std::result::Result<T, OracleError>;

#[derive(Debug, Error)]
pub enum OracleError {
    /// Bind or optimize failed: the trace references something the current
    /// catalog no longer has.
    #[error("stale trace reference in {query_id}: {source}")]
    StaleTraceReference {
        query_id: QueryId,
        #[source]
        source: EngineError,
    },

    /// The engine failed while executing a replay (already rolled back).
    #[error("replay of {query_id} failed: {source}")]
    ReplayExecutionFailure {
        query_id: QueryId,
        #[source]
        source: EngineError,
    },

    /// A query replayed cleanly but reported no pipeline features, so its
    /// cost is unknown.
    #[error("replay of {query_id} produced no pipeline features")]
    MissingFeatures { query_id: QueryId },

    #[error("cost model error: {0}")]
    Model(String),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}
