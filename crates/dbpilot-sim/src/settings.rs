//! Settings store that keeps live values in memory.

use dbpilot_core::id::ActionId;
use dbpilot_core::{Action, KnobSettings, Result, SettingsStore};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct SimSettings {
    values: KnobSettings,
    applied: Vec<ActionId>,
}

impl SimSettings {
    pub fn new(values: KnobSettings) -> Self {
        Self {
            values,
            applied: Vec::new(),
        }
    }

    pub fn values(&self) -> &KnobSettings {
        &self.values
    }

    /// Actions applied so far, oldest first.
    pub fn applied(&self) -> &[ActionId] {
        &self.applied
    }
}

impl SettingsStore for SimSettings {
    fn snapshot(&self) -> KnobSettings {
        self.values.clone()
    }

    fn apply(&mut self, action: &Action) -> Result<()> {
        action.apply(&mut self.values)?;
        self.applied.push(action.id);
        info!(action = %action, "applied configuration change");
        Ok(())
    }
}
