//! Candidate actions derived from the tunable knobs.
//!
//! Each boolean knob yields one toggle (its own inverse). Each delta `d`
//! configured for an integer knob yields the pair `+|d|`, `-|d|`. Ids are
//! assigned in generation order starting at 0: booleans first in the given
//! order, then integer knobs by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dbpilot_core::{Action, ActionCatalog, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnobSpace {
    #[serde(default)]
    pub bool_knobs: Vec<String>,
    /// Integer knob name -> step sizes.
    #[serde(default)]
    pub int_knobs: BTreeMap<String, Vec<i64>>,
}

pub fn generate_actions(space: &KnobSpace) -> Result<ActionCatalog> {
    let mut actions = Vec::new();
    let mut next_id = 0u64;
    for knob in &space.bool_knobs {
        actions.push(Action::toggle(next_id, knob.clone()));
        next_id += 1;
    }

    for (knob, deltas) in &space.int_knobs {
        for d in deltas {
            let step = d.saturating_abs();
            actions.push(Action::delta(next_id, knob.clone(), step));
            actions.push(Action::delta(next_id + 1, knob.clone(), -step));
            next_id += 2;
        }
    }

    debug!(actions = actions.len(), "generated knob actions");
    ActionCatalog::new(actions)
}
