//! Query engine collaborator interface.
//!
//! The oracle never parses, plans or executes anything itself; it drives an
//! engine through this trait. Transactions are opaque handles that the oracle
//! only ever aborts.

use std::time::Duration;

use thiserror::Error;

use dbpilot_core::id::DbOid;
use dbpilot_core::knob::KnobSettings;
use dbpilot_core::types::{ParamType, ParamValue};

use crate::metrics::MetricsContext;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bind error: {0}")]
    Bind(String),

    #[error("optimizer timed out after {0:?}")]
    OptimizeTimeout(Duration),

    #[error("execution error: {0}")]
    Execution(String),
}

/// Operations the replay oracle needs from the engine.
///
/// Invariants:
/// - `bind`/`optimize` read the catalog as seen by `txn`.
/// - `compile_and_run` must honour `settings` for this execution only; it must
///   not write them back to live configuration.
/// - Everything written through `txn` disappears on `abort`.
pub trait QueryEngine {
    type Txn;
    type Bound;
    type Plan;

    fn begin(&self) -> Self::Txn;

    fn abort(&self, txn: Self::Txn);

    fn bind(
        &self,
        txn: &mut Self::Txn,
        db_oid: DbOid,
        text: &str,
        params: &[ParamValue],
        param_types: &[ParamType],
    ) -> Result<Self::Bound, EngineError>;

    fn optimize(
        &self,
        txn: &mut Self::Txn,
        bound: Self::Bound,
        timeout: Duration,
    ) -> Result<Self::Plan, EngineError>;

    /// Execute `plan`, recording one feature record per pipeline into `metrics`.
    fn compile_and_run(
        &self,
        txn: &mut Self::Txn,
        plan: &Self::Plan,
        params: &[ParamValue],
        settings: &KnobSettings,
        metrics: &mut MetricsContext,
    ) -> Result<(), EngineError>;
}
