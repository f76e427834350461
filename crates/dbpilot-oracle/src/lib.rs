#![forbid(unsafe_code)]
//! dbpilot-oracle: what would this workload cost under that configuration?
//!
//! Pipeline:
//! 1. `replay`: bind/optimize/run every sampled (query, binding) pair of a
//!    planning window inside its own transaction, always aborted afterwards.
//! 2. `metrics`: per-replay metrics contexts are merged into per-pipeline
//!    feature records (order-independent).
//! 3. `features`: records are regrouped into per-OU-type batches with the
//!    positions needed to map predictions back to pipelines.
//! 4. `cost`: a `CostModel` predicts per-OU costs; they are recombined into
//!    per-query costs and weighted by forecast arrivals.
//!
//! The engine is reached only through the `QueryEngine` trait (`engine`).

pub mod cost;
pub mod engine;
pub mod error;
pub mod features;
pub mod metrics;
pub mod replay;

pub use cost::{CostModel, LinearCostModel};
pub use engine::{EngineError, QueryEngine};
pub use error::{OracleError, Result};
pub use features::{group_features_by_ou, OuBatches, OuPosition};
pub use metrics::{MetricsComponent, MetricsContext, PipelineMetricsStore};
pub use replay::{CostOracle, ReplayOracle};
