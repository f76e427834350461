#![forbid(unsafe_code)]
//! dbpilot: a self-driving configuration planner.
//!
//! Each planning cycle segments a recorded query trace into a workload
//! forecast, costs hypothetical knob changes by replaying sampled queries in
//! always-aborted transactions, searches action sequences with Monte Carlo
//! tree search, and applies the best next action once.
//!
//! The member crates are re-exported here; `prelude` gathers the types most
//! callers need.

pub use dbpilot_core;
pub use dbpilot_forecast;
pub use dbpilot_mcts;
pub use dbpilot_oracle;
pub use dbpilot_planner;
pub use dbpilot_sim;

pub mod prelude {
    pub use dbpilot_core::prelude::*;
    pub use dbpilot_forecast::{PlanningWindow, QueryRecord, QueryTrace, WorkloadForecast};
    pub use dbpilot_mcts::{MonteCarloTreeSearch, SearchConfig, SearchResult, SearchTree};
    pub use dbpilot_oracle::{CostModel, CostOracle, LinearCostModel, QueryEngine, ReplayOracle};
    pub use dbpilot_planner::{
        generate_actions, KnobSpace, Pilot, PilotError, PlanningOutcome, SkipReason, TraceSource,
    };
}
