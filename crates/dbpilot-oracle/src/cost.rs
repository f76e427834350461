//! Cost-model seam and recombination of per-OU predictions.
//!
//! The learned model lives outside this workspace; `CostModel` is its
//! interface. `LinearCostModel` is a transparent stand-in (per-type weight
//! vectors, dot product with the attribute vector).

use std::collections::BTreeMap;

use dbpilot_core::features::OperatingUnitType;
use dbpilot_core::id::{PipelineId, QueryId};

use crate::error::{OracleError, Result};
use crate::features::OuBatches;

/// Predicts one cost per feature vector of a homogeneous batch.
pub trait CostModel {
    fn predict(&self, ou_type: OperatingUnitType, batch: &[Vec<f64>]) -> Result<Vec<f64>>;
}

impl<M: CostModel + ?Sized> CostModel for &M {
    fn predict(&self, ou_type: OperatingUnitType, batch: &[Vec<f64>]) -> Result<Vec<f64>> {
        (**self).predict(ou_type, batch)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinearCostModel {
    weights: BTreeMap<OperatingUnitType, Vec<f64>>,
}

impl LinearCostModel {
    /// Every attribute weighted 1.0 for every OU type.
    pub fn uniform() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, ou_type: OperatingUnitType, weights: Vec<f64>) -> Self {
        self.weights.insert(ou_type, weights);
        self
    }
}

impl CostModel for LinearCostModel {
    fn predict(&self, ou_type: OperatingUnitType, batch: &[Vec<f64>]) -> Result<Vec<f64>> {
        let weights = self.weights.get(&ou_type);
        Ok(batch
            .iter()
            .map(|attrs| match weights {
                Some(w) => attrs.iter().zip(w).map(|(a, w)| a * w).sum(),
                None => attrs.iter().sum(),
            })
            .collect())
    }
}

/// Predict every batch and sum the predictions back per pipeline.
pub fn predict_pipeline_costs<M: CostModel + ?Sized>(
    model: &M,
    grouped: &OuBatches,
) -> Result<BTreeMap<(QueryId, PipelineId), f64>> {
    let mut predictions = BTreeMap::new();
    for (ou_type, batch) in &grouped.batches {
        let predicted = model.predict(*ou_type, batch)?;
        if predicted.len() != batch.len() {
            return Err(OracleError::Model(format!(
                "{ou_type}: {} predictions for {} vectors",
                predicted.len(),
                batch.len()
            )));
        }
        predictions.insert(*ou_type, predicted);
    }
    recombine(grouped, &predictions)
}

/// Map per-OU predictions back to `(query_id, pipeline_id)` totals.
pub fn recombine(
    grouped: &OuBatches,
    predictions: &BTreeMap<OperatingUnitType, Vec<f64>>,
) -> Result<BTreeMap<(QueryId, PipelineId), f64>> {
    let mut totals = BTreeMap::new();
    for pos in &grouped.positions {
        let value = predictions
            .get(&pos.ou_type)
            .and_then(|p| p.get(pos.index))
            .ok_or_else(|| {
                OracleError::Model(format!("no prediction for {} #{}", pos.ou_type, pos.index))
            })?;
        *totals.entry((pos.query_id, pos.pipeline_id)).or_insert(0.0) += value;
    }
    Ok(totals)
}

/// Sum pipeline totals per query.
pub fn query_costs(pipeline_costs: &BTreeMap<(QueryId, PipelineId), f64>) -> BTreeMap<QueryId, f64> {
    let mut out = BTreeMap::new();
    for ((qid, _), cost) in pipeline_costs {
        *out.entry(*qid).or_insert(0.0) += cost;
    }
    out
}
