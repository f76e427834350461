#![forbid(unsafe_code)]
//! dbpilot-forecast: query trace → forecast segments.
//!
//! Responsibilities:
//! - Ingest time-stamped query arrivals and per-query metadata (`trace`).
//! - Partition the trace into contiguous fixed-width segments, keeping a
//!   bounded, deterministic sample of parameter bindings per query (`forecast`).
//! - Describe sub-ranges of segments used for cost evaluation (`window`).
//!
//! Segments are immutable once built; a new forecast is built every cycle.

pub mod error;
pub mod forecast;
pub mod segment;
pub mod trace;
pub mod window;

pub use error::{ForecastError, Result};
pub use forecast::WorkloadForecast;
pub use segment::WorkloadSegment;
pub use trace::{QueryRecord, QueryTrace, TraceEvent};
pub use window::PlanningWindow;
