//! Provenance record for one applied planning cycle.
//!
//! The planner emits a manifest after it applies the chosen action; it names
//! the forecast it planned against and how much search went into the choice.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;
use crate::id::ActionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningManifest {
    pub id: ManifestId,

    /// Stable hash of the forecast segments the search was evaluated on.
    pub forecast_hash: Hash256,

    pub num_segments: usize,
    pub num_candidate_actions: usize,

    /// Action applied to live configuration.
    pub applied_action: ActionId,

    /// Command rendered for the applied action (for audit logs).
    pub applied_command: String,

    /// Estimated cost of the chosen child and of the unchanged configuration.
    pub chosen_cost: f64,
    pub baseline_cost: f64,

    pub rollouts: usize,
    pub tree_size: usize,

    /// Planner version string for provenance.
    pub pilot_version: String,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl PlanningManifest {
    pub fn new(forecast_hash: Hash256, applied_action: ActionId, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            forecast_hash,
            num_segments: 0,
            num_candidate_actions: 0,
            applied_action,
            applied_command: String::new(),
            chosen_cost: 0.0,
            baseline_cost: 0.0,
            rollouts: 0,
            tree_size: 0,
            pilot_version: crate::VERSION.to_string(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms;
        self
    }
}
