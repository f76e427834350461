//! Replay sampled queries in disposable transactions and turn the collected
//! pipeline features into a scalar cost.
//!
//! Safety rule: every transaction opened here is aborted, whether the replay
//! succeeded or not. Bind/optimize failures mean the trace is stale and fail
//! the whole evaluation; so do execution failures. Nothing is skipped.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, trace, warn};

use dbpilot_core::features::PipelineFeatures;
use dbpilot_core::id::QueryId;
use dbpilot_core::knob::KnobSettings;
use dbpilot_core::types::ParamValue;
use dbpilot_forecast::{PlanningWindow, QueryRecord, WorkloadForecast};

use crate::cost::{predict_pipeline_costs, query_costs, CostModel, LinearCostModel};
use crate::engine::QueryEngine;
use crate::error::{OracleError, Result};
use crate::features::group_features_by_ou;
use crate::metrics::{MetricsComponent, MetricsContext, PipelineMetricsStore};

/// Cost of running the forecast segments in `window` under `settings`.
pub trait CostOracle {
    fn evaluate(
        &self,
        forecast: &WorkloadForecast,
        window: PlanningWindow,
        settings: &KnobSettings,
    ) -> Result<f64>;
}

pub struct ReplayOracle<'e, E: QueryEngine, M: CostModel = LinearCostModel> {
    engine: &'e E,
    model: M,
    optimizer_timeout: Duration,
    replays: Cell<u64>,
}

impl<'e, E: QueryEngine, M: CostModel> ReplayOracle<'e, E, M> {
    pub fn new(engine: &'e E, model: M, optimizer_timeout: Duration) -> Self {
        Self {
            engine,
            model,
            optimizer_timeout,
            replays: Cell::new(0),
        }
    }

    /// Replays attempted so far (successful or not).
    pub fn replay_count(&self) -> u64 {
        self.replays.get()
    }

    /// Replay every distinct sampled binding of every query in `window` and
    /// return the aggregated per-pipeline features.
    pub fn collect_features(
        &self,
        forecast: &WorkloadForecast,
        window: PlanningWindow,
        settings: &KnobSettings,
    ) -> Result<Vec<PipelineFeatures>> {
        let segments = forecast.window(window)?;

        let mut bindings: BTreeMap<QueryId, Vec<&[ParamValue]>> = BTreeMap::new();
        for segment in segments {
            for qid in segment.query_ids() {
                let seen = bindings.entry(qid).or_default();
                for params in segment.samples(qid) {
                    if !seen.iter().any(|p| *p == params.as_slice()) {
                        seen.push(params.as_slice());
                    }
                }
            }
        }

        let mut store = PipelineMetricsStore::new();
        for (qid, samples) in &bindings {
            let record = forecast.query(*qid)?;
            for params in samples {
                store.submit(self.replay(record, params, settings)?);
            }
        }

        store.aggregate();
        let data = store.aggregated(MetricsComponent::ExecutionPipeline);
        for qid in bindings.keys() {
            if !data.iter().any(|p| p.query_id == *qid) {
                warn!(query = %qid, "replayed query produced no pipeline records");
            }
        }
        debug!(
            start = window.start,
            end = window.end,
            queries = bindings.len(),
            pipelines = data.len(),
            "collected pipeline features"
        );
        Ok(data)
    }

    fn replay(
        &self,
        record: &QueryRecord,
        params: &[ParamValue],
        settings: &KnobSettings,
    ) -> Result<MetricsContext> {
        let mut txn = self.engine.begin();
        let outcome = self.run_in(&mut txn, record, params, settings);
        self.engine.abort(txn);
        self.replays.set(self.replays.get() + 1);
        trace!(query = %record.query_id, ok = outcome.is_ok(), "replayed and aborted");
        outcome
    }

    fn run_in(
        &self,
        txn: &mut E::Txn,
        record: &QueryRecord,
        params: &[ParamValue],
        settings: &KnobSettings,
    ) -> Result<MetricsContext> {
        let stale = |source| OracleError::StaleTraceReference {
            query_id: record.query_id,
            source,
        };
        let bound = self
            .engine
            .bind(txn, record.db_oid, &record.text, params, &record.param_types)
            .map_err(stale)?;
        let plan = self
            .engine
            .optimize(txn, bound, self.optimizer_timeout)
            .map_err(stale)?;

        let mut ctx = MetricsContext::new(record.query_id);
        self.engine
            .compile_and_run(txn, &plan, params, settings, &mut ctx)
            .map_err(|source| OracleError::ReplayExecutionFailure {
                query_id: record.query_id,
                source,
            })?;
        Ok(ctx)
    }
}

impl<'e, E: QueryEngine, M: CostModel> CostOracle for ReplayOracle<'e, E, M> {
    fn evaluate(
        &self,
        forecast: &WorkloadForecast,
        window: PlanningWindow,
        settings: &KnobSettings,
    ) -> Result<f64> {
        let features = self.collect_features(forecast, window, settings)?;
        let grouped = group_features_by_ou(&features);
        let per_query = query_costs(&predict_pipeline_costs(&self.model, &grouped)?);

        let mut total = 0.0;
        for segment in forecast.window(window)? {
            for qid in segment.query_ids() {
                let cost = per_query
                    .get(&qid)
                    .copied()
                    .ok_or(OracleError::MissingFeatures { query_id: qid })?;
                total += segment.arrivals(qid) as f64 * cost;
            }
        }
        debug!(start = window.start, end = window.end, total, "evaluated window cost");
        Ok(total)
    }
}
