/// Running min/max/sum of a sampled quantity.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl Histogram {
    pub fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Counters kept by the request scheduler for logs and tests.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SchedulerStats {
    pub requests_sent: u64,
    pub responses_applied: u64,
    /// Ticks that left a view change unsent because a request was in flight.
    pub deferred_ticks: u64,
    /// Viewport mutations replaced by a newer one before being sent.
    pub superseded_viewports: u64,
    pub decode_failures: u64,
    pub worker_restarts: u64,
    /// Request round-trip in milliseconds.
    pub latency_ms: Histogram,
}
