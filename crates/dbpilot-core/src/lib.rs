#![forbid(unsafe_code)]
//! dbpilot-core: shared vocabulary for the self-driving planner.
//!
//! Everything here is plain data plus validation:
//! - strongly-typed ids (`QueryId`, `PipelineId`, `DbOid`, `ActionId`, ...)
//! - knob snapshots and the `SettingsStore` seam to live configuration
//! - reversible `Action`s and the validated `ActionCatalog`
//! - parameter values/types and per-pipeline operating-unit features
//! - `PilotConfig`, stable hashing, and `PlanningManifest`
//!
//! No I/O and no query execution live here.

pub mod action;
pub mod config;
pub mod error;
pub mod features;
pub mod hash;
pub mod id;
pub mod knob;
pub mod manifest;
pub mod prelude;
pub mod types;

pub use action::{Action, ActionCatalog, ActionKind};
pub use config::PilotConfig;
pub use error::{Error, Result};
pub use knob::{KnobSettings, KnobValue, SettingsStore};

/// Version string recorded in planning manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
