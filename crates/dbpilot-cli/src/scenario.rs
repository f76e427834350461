//! YAML scenario: the simulated database, live knob values, the tunable knob
//! space and an optional planner config overlay.
//!
//! ```yaml
//! config:
//!   forecast_interval_us: 50
//!   rollout_budget: 4
//! tables:
//!   items:
//!     columns: [id, v]
//!     rows: [[1, 10], [2, 20]]
//! functions:
//!   - { name: greatest, oid: 1, args: [bigint, variadic], returns: bigint }
//! knobs:
//!   enable_index_scan: false
//!   output_batch_size: 1
//! actions:
//!   bool_knobs: [enable_index_scan]
//!   int_knobs: { output_batch_size: [8] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dbpilot_core::id::ProcOid;
use dbpilot_core::types::ParamType;
use dbpilot_core::{KnobSettings, PilotConfig};
use dbpilot_planner::KnobSpace;
use dbpilot_sim::{FunctionSignature, SimDatabase, Table};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: ScenarioConfig,
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub knobs: KnobSettings,
    #[serde(default)]
    pub actions: KnobSpace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub oid: u64,
    #[serde(default)]
    pub args: Vec<String>,
    pub returns: String,
}

/// Planner settings a scenario may pin; unset fields keep env/default values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub forecast_interval_us: Option<u64>,
    pub num_samples: Option<usize>,
    pub optimizer_timeout_us: Option<u64>,
    pub rollout_budget: Option<usize>,
    pub rollout_time_limit_ms: Option<u64>,
    pub max_search_depth: Option<usize>,
    pub planning_horizon_segments: Option<usize>,
    pub exploration_weight: Option<f64>,
    pub seed: Option<u64>,
}

pub fn parse_scenario(yaml_src: &str) -> Result<Scenario, serde_yaml::Error> {
    serde_yaml::from_str(yaml_src)
}

impl Scenario {
    pub fn database(&self) -> Result<SimDatabase, Box<dyn std::error::Error>> {
        let mut db = SimDatabase::new();
        for (name, table) in &self.tables {
            db.create_table(name.clone(), table.clone())?;
        }
        for f in &self.functions {
            let args = f
                .args
                .iter()
                .map(|a| a.parse::<ParamType>())
                .collect::<Result<Vec<_>, _>>()?;
            db.register_function(
                f.name.clone(),
                FunctionSignature {
                    oid: ProcOid::new(f.oid),
                    args,
                    returns: f.returns.parse()?,
                },
            );
        }
        Ok(db)
    }
}

pub fn apply_scenario_config(cfg: &mut PilotConfig, doc: &ScenarioConfig) {
    if let Some(v) = doc.forecast_interval_us {
        cfg.forecast_interval_us = v;
    }
    if let Some(v) = doc.num_samples {
        cfg.num_samples = v;
    }
    if let Some(v) = doc.optimizer_timeout_us {
        cfg.optimizer_timeout_us = v;
    }
    if let Some(v) = doc.rollout_budget {
        cfg.rollout_budget = v;
    }
    if let Some(v) = doc.rollout_time_limit_ms {
        cfg.rollout_time_limit_ms = Some(v);
    }
    if let Some(v) = doc.max_search_depth {
        cfg.max_search_depth = v;
    }
    if let Some(v) = doc.planning_horizon_segments {
        cfg.planning_horizon_segments = Some(v);
    }
    if let Some(v) = doc.exploration_weight {
        cfg.exploration_weight = v;
    }
    if let Some(v) = doc.seed {
        cfg.seed = Some(v);
    }
}
