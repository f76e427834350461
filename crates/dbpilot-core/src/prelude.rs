//! Convenient re-exports for downstream crates.

pub use crate::action::{Action, ActionCatalog, ActionKind};
pub use crate::config::PilotConfig;
pub use crate::error::{Error, Result};
pub use crate::features::{OperatingUnitType, OuFeature, PipelineFeatures};
pub use crate::id::{ActionId, DbOid, PipelineId, ProcOid, QueryId, TxnId};
pub use crate::knob::{KnobSettings, KnobValue, SettingsStore};
pub use crate::manifest::{ManifestId, PlanningManifest};
pub use crate::types::{ParamType, ParamValue};
