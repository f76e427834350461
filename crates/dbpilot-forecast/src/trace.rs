//! Recorded query trace: arrivals in time order plus per-query metadata.
//!
//! Two CSV inputs are supported:
//! ```text
//! query_text.csv:  query_id,db_oid,query_text,parameter_types
//!                  1,1,"SELECT * FROM orders WHERE id = $1","[""integer""]"
//! query_trace.csv: query_id,timestamp,parameters
//!                  1,1000,"[42]"
//! ```
//! Query metadata must be registered before arrivals that reference it.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dbpilot_core::id::{DbOid, QueryId};
use dbpilot_core::types::{ParamType, ParamValue};

use crate::error::{ForecastError, Result};

/// Static description of one traced statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query_id: QueryId,
    pub db_oid: DbOid,
    pub text: String,
    pub param_types: Vec<ParamType>,
}

/// One arrival of a query with the parameters it was executed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub query_id: QueryId,
    pub timestamp_us: u64,
    pub params: Vec<ParamValue>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryTrace {
    // timestamp -> arrivals at that instant, in ingestion order
    events: BTreeMap<u64, Vec<TraceEvent>>,
    queries: BTreeMap<QueryId, QueryRecord>,
    num_events: usize,
}

#[derive(Debug, Deserialize)]
struct QueryTextRow {
    query_id: u64,
    db_oid: u64,
    query_text: String,
    #[serde(default)]
    parameter_types: String,
}

#[derive(Debug, Deserialize)]
struct TraceRow {
    query_id: u64,
    timestamp: u64,
    #[serde(default)]
    parameters: String,
}

impl QueryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata for a query. Re-registering identical metadata is a
    /// no-op; conflicting metadata is rejected.
    pub fn register(&mut self, record: QueryRecord) -> Result<()> {
        if let Some(existing) = self.queries.get(&record.query_id) {
            if *existing != record {
                return Err(ForecastError::Duplicate(record.query_id));
            }
            return Ok(());
        }
        self.queries.insert(record.query_id, record);
        Ok(())
    }

    /// Record one arrival. The query must already be registered and the
    /// binding must match its declared parameter list.
    pub fn record(
        &mut self,
        query_id: QueryId,
        timestamp_us: u64,
        params: Vec<ParamValue>,
    ) -> Result<()> {
        let record = self.query(query_id)?;
        if record.param_types.len() != params.len() {
            return Err(ForecastError::ParamCount {
                query_id,
                expected: record.param_types.len(),
                got: params.len(),
            });
        }
        self.events.entry(timestamp_us).or_default().push(TraceEvent {
            query_id,
            timestamp_us,
            params,
        });
        self.num_events += 1;
        Ok(())
    }

    pub fn query(&self, query_id: QueryId) -> Result<&QueryRecord> {
        self.queries
            .get(&query_id)
            .ok_or(ForecastError::NotFound(query_id))
    }

    pub fn queries(&self) -> impl Iterator<Item = &QueryRecord> {
        self.queries.values()
    }

    /// Arrivals in timestamp order (ties in ingestion order).
    pub fn events(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.num_events
    }

    pub fn is_empty(&self) -> bool {
        self.num_events == 0
    }

    pub fn min_timestamp(&self) -> Option<u64> {
        self.events.keys().next().copied()
    }

    pub fn max_timestamp(&self) -> Option<u64> {
        self.events.keys().next_back().copied()
    }

    /// Load query metadata rows (`query_id,db_oid,query_text,parameter_types`).
    pub fn load_query_text_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
        let mut loaded = 0;
        for row in rdr.deserialize() {
            let row: QueryTextRow = row?;
            let param_types = parse_param_types(&row.parameter_types)?;
            self.register(QueryRecord {
                query_id: QueryId::new(row.query_id),
                db_oid: DbOid::new(row.db_oid),
                text: row.query_text,
                param_types,
            })?;
            loaded += 1;
        }
        tracing::debug!(loaded, "loaded query text");
        Ok(loaded)
    }

    /// Load arrival rows (`query_id,timestamp,parameters`).
    pub fn load_trace_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
        let mut loaded = 0;
        for row in rdr.deserialize() {
            let row: TraceRow = row?;
            let params = parse_params(&row.parameters)?;
            self.record(QueryId::new(row.query_id), row.timestamp, params)?;
            loaded += 1;
        }
        tracing::debug!(loaded, "loaded query trace");
        Ok(loaded)
    }

    /// Build a trace from the two CSV files on disk.
    pub fn from_csv_files(query_text: &Path, query_trace: &Path) -> Result<Self> {
        let mut trace = Self::new();
        trace.load_query_text_csv(File::open(query_text)?)?;
        trace.load_trace_csv(File::open(query_trace)?)?;
        Ok(trace)
    }
}

fn parse_param_types(field: &str) -> Result<Vec<ParamType>> {
    if field.trim().is_empty() {
        return Ok(Vec::new());
    }
    let names: Vec<String> = serde_json::from_str(field)?;
    names
        .iter()
        .map(|n| n.parse::<ParamType>().map_err(ForecastError::from))
        .collect()
}

fn parse_params(field: &str) -> Result<Vec<ParamValue>> {
    if field.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(field)?)
}
