#![forbid(unsafe_code)]
//! dbpilot-sim: in-memory collaborators for the planner.
//!
//! - `SimEngine` implements `QueryEngine` over a few integer tables, with a
//!   tiny statement grammar (`statement`) and per-transaction write overlays
//!   that vanish on abort.
//! - `FunctionCatalog` resolves function calls by argument types and reports
//!   ambiguous matches as a typed error.
//! - `SimSettings` is a `SettingsStore` that records every applied action.
//!
//! Emitted pipeline features react to knob settings so that different
//! configurations have different replay costs.

pub mod catalog;
pub mod database;
pub mod engine;
pub mod error;
pub mod settings;
pub mod statement;

pub use catalog::{FunctionCatalog, FunctionSignature};
pub use database::{SimDatabase, Table};
pub use engine::{SimEngine, SimPlan, SimTxn};
pub use error::{LookupError, SimError};
pub use settings::SimSettings;
pub use statement::{Operand, Statement};

/// Knob switching predicate scans from sequential to index scans.
pub const KNOB_INDEX_SCAN: &str = "enable_index_scan";
/// Knob giving the number of rows emitted per output batch.
pub const KNOB_OUTPUT_BATCH: &str = "output_batch_size";
