//! Fixed-width segmentation of a query trace.
//!
//! An event at timestamp `t` lands in segment `floor((t - min_ts) / interval)`.
//! With horizon `h = max_ts - min_ts` the forecast holds `floor(h / interval) + 1`
//! segments: `ceil(h / interval)` half-open windows, plus one more when the
//! last event sits exactly on a boundary (or the trace spans a single instant),
//! so every event is covered.

use std::collections::BTreeMap;

use dbpilot_core::hash::{hash_serde, Hash256};
use dbpilot_core::id::QueryId;

use crate::error::{ForecastError, Result};
use crate::segment::WorkloadSegment;
use crate::trace::{QueryRecord, QueryTrace};
use crate::window::PlanningWindow;

#[derive(Debug, Clone)]
pub struct WorkloadForecast {
    interval_us: u64,
    num_samples: usize,
    segments: Vec<WorkloadSegment>,
    queries: BTreeMap<QueryId, QueryRecord>,
}

impl WorkloadForecast {
    /// Segment `trace` into windows of `interval_us`, keeping at most
    /// `num_samples` bindings per query per segment.
    pub fn build(trace: &QueryTrace, interval_us: u64, num_samples: usize) -> Result<Self> {
        if interval_us == 0 {
            return Err(ForecastError::ZeroInterval);
        }

        let mut forecast = Self {
            interval_us,
            num_samples,
            segments: Vec::new(),
            queries: BTreeMap::new(),
        };

        let (min_ts, max_ts) = match (trace.min_timestamp(), trace.max_timestamp()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Ok(forecast),
        };

        let num_segments = ((max_ts - min_ts) / interval_us) as usize + 1;
        forecast.segments = (0..num_segments)
            .map(|i| {
                let start = min_ts.saturating_add(i as u64 * interval_us);
                WorkloadSegment::new(i, start, start.saturating_add(interval_us))
            })
            .collect();

        for event in trace.events() {
            let idx = ((event.timestamp_us - min_ts) / interval_us) as usize;
            forecast.segments[idx].observe(event.query_id, &event.params, num_samples);
            if !forecast.queries.contains_key(&event.query_id) {
                let record = trace.query(event.query_id)?;
                forecast.queries.insert(event.query_id, record.clone());
            }
        }

        tracing::debug!(
            events = trace.len(),
            segments = num_segments,
            interval_us,
            "built workload forecast"
        );
        Ok(forecast)
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn interval_us(&self) -> u64 {
        self.interval_us
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn segments(&self) -> &[WorkloadSegment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&WorkloadSegment> {
        self.segments.get(index)
    }

    /// Text, parameter types and database of a traced query.
    pub fn query(&self, query_id: QueryId) -> Result<&QueryRecord> {
        self.queries
            .get(&query_id)
            .ok_or(ForecastError::NotFound(query_id))
    }

    pub fn queries(&self) -> impl Iterator<Item = &QueryRecord> {
        self.queries.values()
    }

    /// Every segment, or `None` when the forecast is empty.
    pub fn full_window(&self) -> Option<PlanningWindow> {
        PlanningWindow::new(0, self.segments.len()).ok()
    }

    /// The segments covered by `window`.
    pub fn window(&self, window: PlanningWindow) -> Result<&[WorkloadSegment]> {
        if window.is_empty() || window.end > self.segments.len() {
            return Err(ForecastError::InvalidWindow {
                start: window.start,
                end: window.end,
                num_segments: self.segments.len(),
            });
        }
        Ok(&self.segments[window.start..window.end])
    }

    /// Stable digest of the segment contents.
    pub fn fingerprint(&self) -> Result<Hash256> {
        Ok(hash_serde(&self.segments)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbpilot_core::id::DbOid;
    use dbpilot_core::types::{ParamType, ParamValue};

    fn trace_with(timestamps: &[u64]) -> QueryTrace {
        let mut trace = QueryTrace::new();
        trace
            .register(QueryRecord {
                query_id: QueryId::new(1),
                db_oid: DbOid::new(1),
                text: "SELECT * FROM t WHERE a = $1".into(),
                param_types: vec![ParamType::Integer],
            })
            .unwrap();
        for (i, ts) in timestamps.iter().enumerate() {
            trace
                .record(QueryId::new(1), *ts, vec![ParamValue::Int(i as i64)])
                .unwrap();
        }
        trace
    }

    #[test]
    fn ten_arrivals_split_into_two_halves() {
        let ts: Vec<u64> = (0..10).map(|i| i * 11).collect(); // 0..=99
        let forecast = WorkloadForecast::build(&trace_with(&ts), 50, 5).unwrap();
        assert_eq!(forecast.num_segments(), 2);

        let q1 = QueryId::new(1);
        let first = forecast.segment(0).unwrap();
        let second = forecast.segment(1).unwrap();
        assert_eq!((first.start_us, first.end_us), (0, 50));
        assert_eq!((second.start_us, second.end_us), (50, 100));
        assert_eq!(first.arrivals(q1), 5); // 0,11,22,33,44
        assert_eq!(second.arrivals(q1), 5); // 55..99
        assert_eq!(first.samples(q1).len(), 5);
    }

    #[test]
    fn sample_cap_applies_per_segment() {
        let ts: Vec<u64> = (0..8).collect();
        let forecast = WorkloadForecast::build(&trace_with(&ts), 100, 3).unwrap();
        assert_eq!(forecast.num_segments(), 1);
        let seg = forecast.segment(0).unwrap();
        assert_eq!(seg.arrivals(QueryId::new(1)), 8);
        assert_eq!(
            seg.samples(QueryId::new(1)),
            &[
                vec![ParamValue::Int(0)],
                vec![ParamValue::Int(1)],
                vec![ParamValue::Int(2)]
            ]
        );
    }

    #[test]
    fn boundary_event_gets_its_own_segment() {
        let forecast = WorkloadForecast::build(&trace_with(&[0, 100]), 50, 5).unwrap();
        assert_eq!(forecast.num_segments(), 3);
        assert!(forecast.segment(1).unwrap().is_empty());
        assert_eq!(forecast.segment(2).unwrap().arrivals(QueryId::new(1)), 1);
    }

    #[test]
    fn offsets_from_first_arrival() {
        let forecast = WorkloadForecast::build(&trace_with(&[1000, 1049, 1050]), 50, 5).unwrap();
        assert_eq!(forecast.num_segments(), 2);
        assert_eq!(forecast.segment(0).unwrap().start_us, 1000);
        assert_eq!(forecast.segment(1).unwrap().arrivals(QueryId::new(1)), 1);
    }

    #[test]
    fn empty_trace_has_no_segments() {
        let forecast = WorkloadForecast::build(&QueryTrace::new(), 50, 5).unwrap();
        assert_eq!(forecast.num_segments(), 0);
        assert!(forecast.full_window().is_none());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = WorkloadForecast::build(&trace_with(&[0]), 0, 5).unwrap_err();
        assert!(matches!(err, ForecastError::ZeroInterval));
    }

    #[test]
    fn lookups_validate_inputs() {
        let forecast = WorkloadForecast::build(&trace_with(&[0, 60]), 50, 5).unwrap();
        assert!(matches!(
            forecast.query(QueryId::new(42)),
            Err(ForecastError::NotFound(_))
        ));
        let too_wide = PlanningWindow::new(0, 3).unwrap();
        assert!(matches!(
            forecast.window(too_wide),
            Err(ForecastError::InvalidWindow { .. })
        ));
        assert_eq!(forecast.window(PlanningWindow::new(1, 2).unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn fingerprint_tracks_contents() {
        let a = WorkloadForecast::build(&trace_with(&[0, 60]), 50, 5).unwrap();
        let b = WorkloadForecast::build(&trace_with(&[0, 60]), 50, 5).unwrap();
        let c = WorkloadForecast::build(&trace_with(&[0, 10]), 50, 5).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }
}
