//! The planning cycle.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dbpilot_core::manifest::PlanningManifest;
use dbpilot_core::{ActionCatalog, PilotConfig, SettingsStore};
use dbpilot_forecast::{PlanningWindow, WorkloadForecast};
use dbpilot_mcts::{MonteCarloTreeSearch, SearchConfig};
use dbpilot_oracle::{CostModel, QueryEngine, ReplayOracle};

use crate::error::Result;
use crate::source::TraceSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    EmptyForecast,
    NoCandidateActions,
}

#[derive(Debug, Clone)]
pub enum PlanningOutcome {
    Applied(PlanningManifest),
    Skipped(SkipReason),
}

impl PlanningOutcome {
    pub fn manifest(&self) -> Option<&PlanningManifest> {
        match self {
            PlanningOutcome::Applied(m) => Some(m),
            PlanningOutcome::Skipped(_) => None,
        }
    }
}

/// Self-driving planner over one engine, one settings store and a fixed
/// action catalog.
pub struct Pilot<T, E, S, M> {
    config: PilotConfig,
    source: T,
    engine: E,
    settings: S,
    catalog: ActionCatalog,
    model: M,
    forecast: Option<WorkloadForecast>,
}

impl<T, E, S, M> Pilot<T, E, S, M>
where
    T: TraceSource,
    E: QueryEngine,
    S: SettingsStore,
    M: CostModel,
{
    pub fn new(
        config: PilotConfig,
        source: T,
        engine: E,
        settings: S,
        catalog: ActionCatalog,
        model: M,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            engine,
            settings,
            catalog,
            model,
            forecast: None,
        })
    }

    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// Forecast built by the last cycle.
    pub fn forecast(&self) -> Option<&WorkloadForecast> {
        self.forecast.as_ref()
    }

    /// Segment count of the last refreshed forecast (0 before the first cycle).
    pub fn num_segments(&self) -> usize {
        self.forecast.as_ref().map_or(0, |f| f.num_segments())
    }

    /// Run one cycle: forecast, search, apply the best action once.
    ///
    /// On error nothing has been applied.
    pub fn perform_planning(&mut self) -> Result<PlanningOutcome> {
        let started_ms = now_ms();

        let trace = self.source.load()?;
        let forecast = WorkloadForecast::build(
            &trace,
            self.config.forecast_interval_us,
            self.config.num_samples,
        )?;
        let forecast = &*self.forecast.insert(forecast);

        let Some(full) = forecast.full_window() else {
            info!("forecast is empty, skipping planning");
            return Ok(PlanningOutcome::Skipped(SkipReason::EmptyForecast));
        };
        if self.catalog.is_empty() {
            info!("no candidate actions, skipping planning");
            return Ok(PlanningOutcome::Skipped(SkipReason::NoCandidateActions));
        }

        let end = match self.config.planning_horizon_segments {
            Some(h) => full.end.min(full.start + h),
            None => full.end,
        };
        let window = PlanningWindow::new(full.start, end)?;
        info!(
            segments = forecast.num_segments(),
            window = window.len(),
            actions = self.catalog.len(),
            "planning cycle started"
        );

        let oracle = ReplayOracle::new(
            &self.engine,
            &self.model,
            Duration::from_micros(self.config.optimizer_timeout_us),
        );
        let snapshot = self.settings.snapshot();
        let result = {
            let mut search = MonteCarloTreeSearch::new(
                forecast,
                &self.catalog,
                &oracle,
                window,
                snapshot.clone(),
                SearchConfig::from(&self.config),
            )?;
            search.run()?
        };
        debug!(replays = oracle.replay_count(), "search tree discarded");

        let action = self.catalog.lookup(result.best_action)?;
        let command = action.to_command(&snapshot)?;
        let forecast_hash = forecast.fingerprint()?;
        self.settings.apply(action)?;
        info!(
            action = %action,
            command = %command,
            cost = result.best_cost,
            baseline = result.baseline_cost,
            "applied best action"
        );

        let mut manifest = PlanningManifest::new(forecast_hash, action.id, started_ms);
        manifest.num_segments = forecast.num_segments();
        manifest.num_candidate_actions = self.catalog.len();
        manifest.applied_command = command;
        manifest.chosen_cost = result.best_cost;
        manifest.baseline_cost = result.baseline_cost;
        manifest.rollouts = result.rollouts;
        manifest.tree_size = result.tree_size;
        Ok(PlanningOutcome::Applied(manifest.finish(now_ms())))
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
