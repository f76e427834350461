//! Execution features recorded per pipeline.
//!
//! A pipeline is a compiled unit of a query plan; it is made of several
//! operating units (OUs), each described by a numeric attribute vector. The
//! downstream cost model consumes homogeneous batches per OU type, so these
//! records are later regrouped by `OperatingUnitType`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{PipelineId, QueryId};

/// Fine-grained execution sub-step at which cost features are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperatingUnitType {
    SeqScan,
    IdxScan,
    HashJoinBuild,
    HashJoinProbe,
    AggBuild,
    AggIterate,
    SortBuild,
    SortIterate,
    Projection,
    Insert,
    Update,
    Delete,
    Output,
}

impl fmt::Display for OperatingUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One OU inside a pipeline with its attribute vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuFeature {
    pub ou_type: OperatingUnitType,
    pub attributes: Vec<f64>,
}

impl OuFeature {
    pub fn new(ou_type: OperatingUnitType, attributes: Vec<f64>) -> Self {
        Self {
            ou_type,
            attributes,
        }
    }
}

/// Feature record keyed by `(query_id, pipeline_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFeatures {
    pub query_id: QueryId,
    pub pipeline_id: PipelineId,
    pub features: Vec<OuFeature>,
}

impl PipelineFeatures {
    pub fn key(&self) -> (QueryId, PipelineId) {
        (self.query_id, self.pipeline_id)
    }
}
