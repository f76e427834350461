//! Half-open ranges of forecast segments.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Segments `[start, end)` over which a hypothetical configuration is costed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningWindow {
    pub start: usize,
    pub end: usize,
}

impl PlanningWindow {
    /// A non-empty window; `start < end` is required.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start >= end {
            return Err(ForecastError::InvalidWindow {
                start,
                end,
                num_segments: end,
            });
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The window with its first `by` segments dropped, if any remain.
    pub fn advance(&self, by: usize) -> Option<PlanningWindow> {
        let start = self.start.checked_add(by)?;
        (start < self.end).then_some(PlanningWindow {
            start,
            end: self.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_windows() {
        assert!(PlanningWindow::new(2, 2).is_err());
        assert!(PlanningWindow::new(3, 1).is_err());
        assert_eq!(PlanningWindow::new(0, 4).unwrap().len(), 4);
    }

    #[test]
    fn advance_stops_at_end() {
        let w = PlanningWindow::new(1, 3).unwrap();
        assert_eq!(w.advance(0), Some(w));
        assert_eq!(w.advance(1), Some(PlanningWindow { start: 2, end: 3 }));
        assert_eq!(w.advance(2), None);
    }
}
