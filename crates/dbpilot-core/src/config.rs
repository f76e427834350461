//! Planner configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Width of one forecast segment, in trace timestamp units (microseconds).
    pub forecast_interval_us: u64,

    /// Parameter bindings retained per query per segment.
    pub num_samples: usize,

    /// Optimizer timeout handed to the engine for each replayed statement.
    pub optimizer_timeout_us: u64,

    /// Maximum number of expansions per planning cycle.
    pub rollout_budget: usize,

    /// Optional wall-clock cap on the rollout loop.
    pub rollout_time_limit_ms: Option<u64>,

    /// Upper bound on tree depth; the planning window length also bounds it.
    pub max_search_depth: usize,

    /// Number of segments considered from the start of the forecast
    /// (`None` = all of them).
    pub planning_horizon_segments: Option<usize>,

    /// Weight of the exploration term when sampling children.
    pub exploration_weight: f64,

    /// Optional seed for deterministic child sampling.
    pub seed: Option<u64>,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            forecast_interval_us: 10_000_000, // 10s default
            num_samples: 5,
            optimizer_timeout_us: 10_000_000,
            rollout_budget: 16,
            rollout_time_limit_ms: None,
            max_search_depth: 3,
            planning_horizon_segments: None,
            exploration_weight: 1.0,
            seed: None,
        }
    }
}

impl PilotConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Supported variables:
    /// - `DBPILOT_FORECAST_INTERVAL_US`: segment width
    /// - `DBPILOT_NUM_SAMPLES`: bindings per query per segment
    /// - `DBPILOT_OPTIMIZER_TIMEOUT_US`: optimizer timeout
    /// - `DBPILOT_ROLLOUT_BUDGET`: expansions per cycle
    /// - `DBPILOT_ROLLOUT_TIME_LIMIT_MS`: wall-clock cap on the rollout loop
    /// - `DBPILOT_MAX_SEARCH_DEPTH`: tree depth bound
    /// - `DBPILOT_PLANNING_HORIZON`: segments considered
    /// - `DBPILOT_EXPLORATION_WEIGHT`: exploration term weight
    /// - `DBPILOT_SEED`: random seed
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("DBPILOT_FORECAST_INTERVAL_US") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.forecast_interval_us = v;
            }
        }

        if let Ok(s) = std::env::var("DBPILOT_NUM_SAMPLES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.num_samples = v;
            }
        }

        if let Ok(s) = std::env::var("DBPILOT_OPTIMIZER_TIMEOUT_US") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.optimizer_timeout_us = v;
            }
        }

        if let Ok(s) = std::env::var("DBPILOT_ROLLOUT_BUDGET") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.rollout_budget = v;
            }
        }

        if let Ok(s) = std::env::var("DBPILOT_ROLLOUT_TIME_LIMIT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.rollout_time_limit_ms = Some(v);
            }
        }

        if let Ok(s) = std::env::var("DBPILOT_MAX_SEARCH_DEPTH") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_search_depth = v;
            }
        }

        if let Ok(s) = std::env::var("DBPILOT_PLANNING_HORIZON") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.planning_horizon_segments = Some(v);
            }
        }

        if let Ok(s) = std::env::var("DBPILOT_EXPLORATION_WEIGHT") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.exploration_weight = v;
            }
        }

        if let Ok(s) = std::env::var("DBPILOT_SEED") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.seed = Some(v);
            }
        }

        cfg
    }

    /// Reject values that would make a planning cycle meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.forecast_interval_us == 0 {
            return Err(Error::Config("forecast_interval_us must be positive".into()));
        }
        if self.num_samples == 0 {
            return Err(Error::Config("num_samples must be positive".into()));
        }
        if self.rollout_budget == 0 {
            return Err(Error::Config("rollout_budget must be positive".into()));
        }
        if self.max_search_depth == 0 {
            return Err(Error::Config("max_search_depth must be positive".into()));
        }
        if self.planning_horizon_segments == Some(0) {
            return Err(Error::Config(
                "planning_horizon_segments must be positive when set".into(),
            ));
        }
        if !self.exploration_weight.is_finite() || self.exploration_weight < 0.0 {
            return Err(Error::Config(
                "exploration_weight must be a non-negative finite number".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PilotConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.num_samples, 5);
    }

    #[test]
    fn rejects_zero_interval_and_budget() {
        let cfg = PilotConfig {
            forecast_interval_us: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));

        let cfg = PilotConfig {
            rollout_budget: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PilotConfig = serde_json::from_str(r#"{"num_samples": 2}"#).unwrap();
        assert_eq!(cfg.num_samples, 2);
        assert_eq!(cfg.rollout_budget, PilotConfig::default().rollout_budget);
    }
}
