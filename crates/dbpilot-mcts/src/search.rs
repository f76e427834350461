//! The rollout loop: select a leaf, expand it by every admissible action,
//! cost each child through the oracle, propagate.
//!
//! Along one path an action is used at most once, and never after the action
//! that undoes it. A child at depth `d` is costed over the planning window
//! with its first `d - 1` segments dropped.

use std::collections::BTreeSet;
use std::iter;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use dbpilot_core::id::ActionId;
use dbpilot_core::{Action, ActionCatalog, KnobSettings, PilotConfig};
use dbpilot_forecast::{PlanningWindow, WorkloadForecast};
use dbpilot_oracle::CostOracle;

use crate::error::{Result, SearchError};
use crate::node::NodeId;
use crate::tree::SearchTree;
use crate::verify;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub rollout_budget: usize,
    pub time_limit: Option<Duration>,
    pub max_depth: usize,
    pub exploration_weight: f64,
    pub seed: Option<u64>,
}

impl From<&PilotConfig> for SearchConfig {
    fn from(cfg: &PilotConfig) -> Self {
        Self {
            rollout_budget: cfg.rollout_budget,
            time_limit: cfg.rollout_time_limit_ms.map(Duration::from_millis),
            max_depth: cfg.max_search_depth,
            exploration_weight: cfg.exploration_weight,
            seed: cfg.seed,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::from(&PilotConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_action: ActionId,
    pub best_cost: f64,
    /// Cost of the window under the unchanged settings.
    pub baseline_cost: f64,
    pub rollouts: usize,
    pub tree_size: usize,
}

pub struct MonteCarloTreeSearch<'a, O: CostOracle + ?Sized> {
    forecast: &'a WorkloadForecast,
    catalog: &'a ActionCatalog,
    oracle: &'a O,
    window: PlanningWindow,
    settings: KnobSettings,
    config: SearchConfig,
    baseline_cost: f64,
    tree: SearchTree,
}

impl<'a, O: CostOracle + ?Sized> MonteCarloTreeSearch<'a, O> {
    /// Evaluate the unchanged `settings` over `window` and plant the root.
    pub fn new(
        forecast: &'a WorkloadForecast,
        catalog: &'a ActionCatalog,
        oracle: &'a O,
        window: PlanningWindow,
        settings: KnobSettings,
        config: SearchConfig,
    ) -> Result<Self> {
        forecast.window(window)?;
        let baseline_cost = oracle.evaluate(forecast, window, &settings)?;
        let tree = SearchTree::new(baseline_cost, config.seed, config.exploration_weight);
        debug!(
            start = window.start,
            end = window.end,
            actions = catalog.len(),
            baseline_cost,
            "search tree planted"
        );
        Ok(Self {
            forecast,
            catalog,
            oracle,
            window,
            settings,
            config,
            baseline_cost,
            tree,
        })
    }

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    /// Effective depth bound: the configured one, capped by the window length.
    pub fn max_depth(&self) -> usize {
        self.config.max_depth.min(self.window.len())
    }

    /// Expand until the rollout budget or time limit is spent or the tree is
    /// exhausted, then pick the root's cheapest child.
    pub fn run(&mut self) -> Result<SearchResult> {
        let started = Instant::now();
        let mut rollouts = 0;

        while rollouts < self.config.rollout_budget {
            if let Some(limit) = self.config.time_limit {
                // the root is always expanded once
                if rollouts > 0 && started.elapsed() >= limit {
                    debug!(rollouts, ?limit, "rollout time limit reached");
                    break;
                }
            }
            let Some(leaf) = self.tree.select_leaf()? else {
                debug!(rollouts, "search tree exhausted");
                break;
            };
            if self.expand(leaf)? {
                rollouts += 1;
                if cfg!(debug_assertions) {
                    verify::assert_consistent(&self.tree);
                }
            }
        }

        let root = self.tree.root();
        let best = self
            .tree
            .best_child(root)?
            .ok_or(SearchError::NoExpansion)?;
        let node = self.tree.node(best)?;
        let best_action = node.action().ok_or(SearchError::NoExpansion)?;

        let result = SearchResult {
            best_action,
            best_cost: node.cost(),
            baseline_cost: self.baseline_cost,
            rollouts,
            tree_size: self.tree.len(),
        };
        debug!(
            action = %result.best_action,
            cost = result.best_cost,
            baseline = result.baseline_cost,
            rollouts,
            nodes = result.tree_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(result)
    }

    /// Expand `leaf` by every admissible action. Returns `false` (and marks
    /// the leaf exhausted) when the depth bound is hit or no action is left.
    pub fn expand(&mut self, leaf: NodeId) -> Result<bool> {
        let catalog = self.catalog;
        let node = self.tree.node(leaf)?;
        if !node.is_leaf() {
            return Err(SearchError::NotALeaf(leaf));
        }
        let depth = node.depth();
        if depth >= self.max_depth() {
            trace!(node = %leaf, depth, "depth bound reached");
            self.tree.mark_exhausted(leaf)?;
            return Ok(false);
        }

        let path = self.tree.path_actions(leaf)?;
        let blocked: BTreeSet<ActionId> = path
            .iter()
            .flat_map(|&id| iter::once(id).chain(catalog.inverse_of(id)))
            .collect();
        let candidates: Vec<&Action> = catalog
            .iter()
            .filter(|a| !blocked.contains(&a.id))
            .collect();
        if candidates.is_empty() {
            trace!(node = %leaf, depth, "no admissible action left");
            self.tree.mark_exhausted(leaf)?;
            return Ok(false);
        }

        let mut base = self.settings.clone();
        for id in &path {
            catalog.lookup(*id)?.apply(&mut base)?;
        }
        let child_window = PlanningWindow::new(self.window.start + depth, self.window.end)?;

        let mut children = Vec::with_capacity(candidates.len());
        for action in candidates {
            let mut hypothetical = base.clone();
            action.apply(&mut hypothetical)?;
            let cost = self
                .oracle
                .evaluate(self.forecast, child_window, &hypothetical)?;
            trace!(node = %leaf, action = %action, cost, "costed child");
            children.push((action.id, cost));
        }

        let num_children = children.len();
        self.tree.attach_children(leaf, children)?;
        debug!(node = %leaf, depth, num_children, "expanded");
        Ok(true)
    }
}
