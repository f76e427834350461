use thiserror::Error;

#[derive(Debug, Error)]
pub enum PilotError {
    #[error("forecast: {0}")]
    Forecast(#[from] dbpilot_forecast::ForecastError),

    #[error("search: {0}")]
    Search(#[from] dbpilot_mcts::SearchError),

    #[error("{0}")]
    Core(#[from] dbpilot_core::Error),
}

pub type Result<T> = std::result::Result<T, PilotError>;
