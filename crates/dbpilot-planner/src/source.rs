//! Where a planning cycle gets its trace from.

use std::path::PathBuf;

use dbpilot_forecast::{QueryTrace, Result};

/// Produces the current query trace at the start of every cycle.
pub trait TraceSource {
    fn load(&mut self) -> Result<QueryTrace>;
}

/// A fixed, in-memory trace.
impl TraceSource for QueryTrace {
    fn load(&mut self) -> Result<QueryTrace> {
        Ok(self.clone())
    }
}

/// Re-reads `query_text.csv` and `query_trace.csv` every cycle.
#[derive(Debug, Clone)]
pub struct CsvTraceSource {
    pub query_text: PathBuf,
    pub query_trace: PathBuf,
}

impl CsvTraceSource {
    pub fn new(query_text: impl Into<PathBuf>, query_trace: impl Into<PathBuf>) -> Self {
        Self {
            query_text: query_text.into(),
            query_trace: query_trace.into(),
        }
    }
}

impl TraceSource for CsvTraceSource {
    fn load(&mut self) -> Result<QueryTrace> {
        QueryTrace::from_csv_files(&self.query_text, &self.query_trace)
    }
}
