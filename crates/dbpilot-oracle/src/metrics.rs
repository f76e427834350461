//! Per-replay metrics contexts and the pipeline metrics store.
//!
//! Each replay gets its own `MetricsContext`, tagged with the query id being
//! replayed. Contexts are submitted to a `PipelineMetricsStore`; `aggregate()`
//! folds raw samples into running means keyed by
//! `(query_id, pipeline_id, ordinal, ou_type)`, which makes the merge
//! independent of submission order.

use std::collections::BTreeMap;

use dbpilot_core::features::{OperatingUnitType, OuFeature, PipelineFeatures};
use dbpilot_core::id::{PipelineId, QueryId};

/// Metrics components the store can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsComponent {
    ExecutionPipeline,
}

/// Isolated collection context for one replayed execution.
#[derive(Debug)]
pub struct MetricsContext {
    query_id: QueryId,
    pipelines: Vec<PipelineFeatures>,
}

impl MetricsContext {
    pub fn new(query_id: QueryId) -> Self {
        Self {
            query_id,
            pipelines: Vec::new(),
        }
    }

    /// Query this context is attributed to.
    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    /// Record the OU features of one executed pipeline.
    pub fn record_pipeline(&mut self, pipeline_id: PipelineId, features: Vec<OuFeature>) {
        self.pipelines.push(PipelineFeatures {
            query_id: self.query_id,
            pipeline_id,
            features,
        });
    }

    pub fn pipelines(&self) -> &[PipelineFeatures] {
        &self.pipelines
    }
}

type AggKey = (QueryId, PipelineId, usize, OperatingUnitType);

#[derive(Debug, Default, Clone)]
struct RunningMean {
    sum: Vec<f64>,
    count: u64,
}

impl RunningMean {
    fn add(&mut self, attrs: &[f64]) {
        if self.sum.len() < attrs.len() {
            self.sum.resize(attrs.len(), 0.0);
        }
        for (acc, v) in self.sum.iter_mut().zip(attrs) {
            *acc += v;
        }
        self.count += 1;
    }

    fn mean(&self) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        self.sum.iter().map(|s| s / n).collect()
    }
}

#[derive(Debug, Default)]
pub struct PipelineMetricsStore {
    raw: Vec<PipelineFeatures>,
    aggregated: BTreeMap<AggKey, RunningMean>,
}

impl PipelineMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a finished context's raw samples.
    pub fn submit(&mut self, ctx: MetricsContext) {
        self.raw.extend(ctx.pipelines);
    }

    /// Number of raw samples not yet aggregated.
    pub fn pending(&self) -> usize {
        self.raw.len()
    }

    /// Fold every raw sample submitted since the last call into the aggregate.
    pub fn aggregate(&mut self) {
        for pipeline in self.raw.drain(..) {
            for (ordinal, ou) in pipeline.features.iter().enumerate() {
                self.aggregated
                    .entry((pipeline.query_id, pipeline.pipeline_id, ordinal, ou.ou_type))
                    .or_default()
                    .add(&ou.attributes);
            }
        }
    }

    /// Aggregated feature records, ordered by `(query_id, pipeline_id)`.
    pub fn aggregated(&self, component: MetricsComponent) -> Vec<PipelineFeatures> {
        match component {
            MetricsComponent::ExecutionPipeline => {
                let mut out: Vec<PipelineFeatures> = Vec::new();
                for ((qid, pid, _ordinal, ou_type), acc) in &self.aggregated {
                    let feature = OuFeature::new(*ou_type, acc.mean());
                    match out.last_mut() {
                        Some(last) if last.query_id == *qid && last.pipeline_id == *pid => {
                            last.features.push(feature)
                        }
                        _ => out.push(PipelineFeatures {
                            query_id: *qid,
                            pipeline_id: *pid,
                            features: vec![feature],
                        }),
                    }
                }
                out
            }
        }
    }
}
