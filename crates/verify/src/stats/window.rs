use serde::{Deserialize, Serialize};

/// Counts accumulated over one elapsed local window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowSample {
    /// Window midpoint relative to the first event of the run, ns.
    pub midpoint_ns: i64,
    pub total: u64,
    pub matched: u64,
}

impl TimeWindowSample {
    /// Undefined for an empty window.
    pub fn efficiency(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.matched as f64 / self.total as f64)
        }
    }
}

/// Sliding-window efficiency sampler.
///
/// Events must arrive in non-decreasing timestamp order. A sample is
/// emitted on the first event at least `size_ns` after the window start;
/// that event's counts belong to the closing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyWindowTracker {
    size_ns: i64,
    first_ns: Option<i64>,
    start_ns: i64,
    end_ns: i64,
    total: u64,
    matched: u64,
    samples: Vec<TimeWindowSample>,
}

impl EfficiencyWindowTracker {
    pub fn new(size_ns: i64) -> Self {
        Self {
            size_ns,
            first_ns: None,
            start_ns: 0,
            end_ns: 0,
            total: 0,
            matched: 0,
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, timestamp: i64, total: u64, matched: u64) -> Option<TimeWindowSample> {
        self.end_ns = timestamp;
        let first = match self.first_ns {
            Some(first) => first,
            None => {
                self.first_ns = Some(timestamp);
                self.start_ns = timestamp;
                timestamp
            }
        };

        self.total += total;
        self.matched += matched;

        // Widened so timestamps anywhere in the i64 range cannot overflow.
        let elapsed = i128::from(self.end_ns) - i128::from(self.start_ns);
        if elapsed < i128::from(self.size_ns) {
            return None;
        }
        let midpoint = i128::from(self.end_ns) - i128::from(first) - elapsed / 2;

        let sample = TimeWindowSample {
            midpoint_ns: i64::try_from(midpoint).unwrap_or(i64::MAX),
            total: self.total,
            matched: self.matched,
        };
        self.samples.push(sample);
        self.total = 0;
        self.matched = 0;
        self.start_ns = timestamp;
        Some(sample)
    }

    pub fn samples(&self) -> &[TimeWindowSample] {
        &self.samples
    }

    /// Counts in the still-open window.
    pub fn pending(&self) -> (u64, u64) {
        (self.total, self.matched)
    }

    pub fn size_ns(&self) -> i64 {
        self.size_ns
    }
}
