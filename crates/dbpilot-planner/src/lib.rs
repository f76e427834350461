#![forbid(unsafe_code)]
//! dbpilot-planner: one planning cycle, end to end.
//!
//! `Pilot::perform_planning` refreshes the forecast from a `TraceSource`,
//! searches for the best next action with a fresh tree, applies it through the
//! `SettingsStore` exactly once, and returns a `PlanningManifest`. An empty
//! forecast or an empty action catalog skips the cycle instead.
//!
//! `actions` builds the candidate catalog from a description of the tunable
//! knobs.

pub mod actions;
pub mod error;
pub mod pilot;
pub mod source;

pub use actions::{generate_actions, KnobSpace};
pub use error::{PilotError, Result};
pub use pilot::{Pilot, PlanningOutcome, SkipReason};
pub use source::{CsvTraceSource, TraceSource};
