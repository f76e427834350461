//! Regroup per-pipeline feature records into per-OU-type batches.
//!
//! A cost model predicts one OU type at a time, but a pipeline mixes several
//! OU types. Alongside the batches we keep, for every OU entry, where its
//! vector landed inside its type's batch so predictions can be summed back per
//! `(query_id, pipeline_id)`.
//!
//! Both types serialize, so a batch set can be handed to a model served out of
//! process and the predictions mapped back with the positions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dbpilot_core::features::{OperatingUnitType, PipelineFeatures};
use dbpilot_core::id::{PipelineId, QueryId};

/// Location of one OU's feature vector inside its type's batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuPosition {
    pub query_id: QueryId,
    pub pipeline_id: PipelineId,
    pub ou_type: OperatingUnitType,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OuBatches {
    pub batches: BTreeMap<OperatingUnitType, Vec<Vec<f64>>>,
    pub positions: Vec<OuPosition>,
}

impl OuBatches {
    /// Total number of OU vectors across all batches.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub fn group_features_by_ou(pipeline_data: &[PipelineFeatures]) -> OuBatches {
    let mut out = OuBatches::default();
    for pipeline in pipeline_data {
        for ou in &pipeline.features {
            let batch = out.batches.entry(ou.ou_type).or_default();
            out.positions.push(OuPosition {
                query_id: pipeline.query_id,
                pipeline_id: pipeline.pipeline_id,
                ou_type: ou.ou_type,
                index: batch.len(),
            });
            batch.push(ou.attributes.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbpilot_core::features::OuFeature;
    use OperatingUnitType::*;

    fn pipeline(q: u64, p: u64, ous: &[(OperatingUnitType, f64)]) -> PipelineFeatures {
        PipelineFeatures {
            query_id: QueryId::new(q),
            pipeline_id: PipelineId::new(p),
            features: ous
                .iter()
                .map(|(t, v)| OuFeature::new(*t, vec![*v]))
                .collect(),
        }
    }

    #[test]
    fn batches_by_type_and_records_positions() {
        let data = vec![
            pipeline(1, 0, &[(SeqScan, 1.0), (HashJoinBuild, 2.0)]),
            pipeline(1, 1, &[(SeqScan, 3.0), (HashJoinProbe, 4.0), (Output, 5.0)]),
            pipeline(2, 0, &[(SeqScan, 6.0), (Output, 7.0)]),
        ];
        let grouped = group_features_by_ou(&data);

        assert_eq!(grouped.batches[&SeqScan], vec![vec![1.0], vec![3.0], vec![6.0]]);
        assert_eq!(grouped.batches[&Output], vec![vec![5.0], vec![7.0]]);
        assert_eq!(grouped.batches[&HashJoinBuild].len(), 1);
        assert_eq!(grouped.len(), 7);

        // every position points back at the vector it came from
        for (pos, value) in grouped
            .positions
            .iter()
            .zip([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])
        {
            assert_eq!(grouped.batches[&pos.ou_type][pos.index], vec![value]);
        }
        let q2_out = grouped.positions[6];
        assert_eq!((q2_out.query_id, q2_out.pipeline_id), (QueryId::new(2), PipelineId::new(0)));
        assert_eq!((q2_out.ou_type, q2_out.index), (Output, 1));
    }

    #[test]
    fn batches_serialize_keyed_by_ou_type() {
        let grouped = group_features_by_ou(&[
            pipeline(4, 0, &[(IdxScan, 2.0), (Output, 1.0)]),
            pipeline(5, 1, &[(IdxScan, 3.0)]),
        ]);
        let json = serde_json::to_value(&grouped).unwrap();
        assert_eq!(json["batches"]["IdxScan"], serde_json::json!([[2.0], [3.0]]));
        assert_eq!(json["positions"][2]["query_id"], 5);
        assert_eq!(json["positions"][2]["index"], 1);

        let back: OuBatches = serde_json::from_value(json).unwrap();
        assert_eq!(back, grouped);
    }

    #[test]
    fn first_vector_of_a_type_sits_at_zero() {
        let grouped = group_features_by_ou(&[pipeline(9, 3, &[(Insert, 1.0)])]);
        assert_eq!(grouped.positions[0].index, 0);
        assert!(group_features_by_ou(&[]).is_empty());
    }
}
