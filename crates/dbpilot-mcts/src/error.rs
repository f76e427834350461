use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("node {0} has no children to average over")]
    EmptyChildSet(NodeId),

    #[error("node {0} is already expanded")]
    NotALeaf(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("search finished without expanding the root")]
    NoExpansion,

    #[error(transparent)]
    Oracle(#[from] dbpilot_oracle::OracleError),

    #[error(transparent)]
    Forecast(#[from] dbpilot_forecast::ForecastError),

    #[error(transparent)]
    Core(#[from] dbpilot_core::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
