//! One fixed-width window of the forecast.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dbpilot_core::id::QueryId;
use dbpilot_core::types::ParamValue;

/// Arrivals in `[start_us, end_us)`: how often each query ran, plus a bounded
/// sample of the bindings it ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSegment {
    pub index: usize,
    pub start_us: u64,
    pub end_us: u64,
    samples: BTreeMap<QueryId, Vec<Vec<ParamValue>>>,
    arrivals: BTreeMap<QueryId, u64>,
}

impl WorkloadSegment {
    pub(crate) fn new(index: usize, start_us: u64, end_us: u64) -> Self {
        Self {
            index,
            start_us,
            end_us,
            samples: BTreeMap::new(),
            arrivals: BTreeMap::new(),
        }
    }

    /// Count an arrival; keep its binding only while the sample has room
    /// (first-N policy).
    pub(crate) fn observe(&mut self, query_id: QueryId, params: &[ParamValue], max_samples: usize) {
        *self.arrivals.entry(query_id).or_default() += 1;
        let sample = self.samples.entry(query_id).or_default();
        if sample.len() < max_samples {
            sample.push(params.to_vec());
        }
    }

    pub fn contains(&self, timestamp_us: u64) -> bool {
        self.start_us <= timestamp_us && timestamp_us < self.end_us
    }

    /// Distinct queries observed in this segment, ascending by id.
    pub fn query_ids(&self) -> impl Iterator<Item = QueryId> + '_ {
        self.arrivals.keys().copied()
    }

    pub fn arrivals(&self, query_id: QueryId) -> u64 {
        self.arrivals.get(&query_id).copied().unwrap_or(0)
    }

    pub fn total_arrivals(&self) -> u64 {
        self.arrivals.values().sum()
    }

    /// Sampled bindings for `query_id` (empty if it did not arrive here).
    pub fn samples(&self, query_id: QueryId) -> &[Vec<ParamValue>] {
        self.samples
            .get(&query_id)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_n_bindings_but_counts_all() {
        let q = QueryId::new(1);
        let mut seg = WorkloadSegment::new(0, 0, 10);
        for i in 0..4 {
            seg.observe(q, &[ParamValue::Int(i)], 2);
        }
        assert_eq!(seg.arrivals(q), 4);
        assert_eq!(
            seg.samples(q),
            &[vec![ParamValue::Int(0)], vec![ParamValue::Int(1)]]
        );
        assert!(seg.samples(QueryId::new(2)).is_empty());
    }

    #[test]
    fn window_is_half_open() {
        let seg = WorkloadSegment::new(1, 50, 100);
        assert!(seg.contains(50));
        assert!(seg.contains(99));
        assert!(!seg.contains(100));
    }
}
